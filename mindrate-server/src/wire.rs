//! Value shapes shared by the download document and the answer payloads

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use mindrate_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Date and time split into fields, as the mobile client expects them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl From<NaiveDateTime> for DateParts {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }
}

impl TryFrom<DateParts> for NaiveDateTime {
    type Error = Error;

    fn try_from(parts: DateParts) -> Result<Self> {
        NaiveDate::from_ymd_opt(parts.year, parts.month, parts.day)
            .and_then(|date| date.and_hms_opt(parts.hour, parts.minute, parts.second))
            .ok_or_else(|| Error::InvalidInput(format!("Invalid date: {:?}", parts)))
    }
}

/// Identifier as sent by the client: decimal string or plain number
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    pub fn value(&self) -> Result<i64> {
        match self {
            WireId::Number(n) => Ok(*n),
            WireId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid id: {:?}", s))),
        }
    }
}

/// Ids leave the server as decimal strings
pub fn id_string(id: i64) -> String {
    id.to_string()
}

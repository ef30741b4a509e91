//! Domain models for the survey schema and collected answers
//!
//! Identifiers are SQLite row ids (`i64`). Timestamps are naive wall-clock
//! values, exactly as entered by the study director or reported by the client.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    pub id: i64,
    /// Study director owning the study
    pub owner: String,
    pub name: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    /// Number of questionnaire submissions received so far
    pub answer_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudy {
    pub owner: String,
    pub name: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
}

/// Per-study questionnaire asked once, right after download
///
/// The three flags tell the client which bare proband-info fields to collect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbandInfoQuestionnaire {
    pub id: i64,
    pub study_id: i64,
    pub birthday: bool,
    pub gender: bool,
    pub occupation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: i64,
    pub study_id: i64,
    pub name: String,
    /// Seconds a triggered questionnaire stays answerable (None = unlimited)
    pub due_after: Option<i64>,
    pub max_trigger_times_per_day: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestionnaire {
    pub study_id: i64,
    pub name: String,
    pub due_after: Option<i64>,
    pub max_trigger_times_per_day: i64,
}

/// Coarse sensor threshold chosen by the study director
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorLevel {
    #[serde(rename = "VL")]
    VeryLow,
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "H")]
    High,
    #[serde(rename = "VH")]
    VeryHigh,
}

impl SensorLevel {
    pub const ALL: [SensorLevel; 5] = [
        SensorLevel::VeryLow,
        SensorLevel::Low,
        SensorLevel::Medium,
        SensorLevel::High,
        SensorLevel::VeryHigh,
    ];

    /// Short code stored in the database
    pub fn code(self) -> &'static str {
        match self {
            SensorLevel::VeryLow => "VL",
            SensorLevel::Low => "L",
            SensorLevel::Medium => "M",
            SensorLevel::High => "H",
            SensorLevel::VeryHigh => "VH",
        }
    }
}

impl FromStr for SensorLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorLevel::ALL
            .into_iter()
            .find(|level| level.code() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown sensor level: {}", s)))
    }
}

/// Environment sensors a trigger event can watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sensor {
    Light,
    RelativeHumidity,
    AmbientTemperature,
    Pressure,
    Proximity,
}

impl Sensor {
    pub const ALL: [Sensor; 5] = [
        Sensor::Light,
        Sensor::RelativeHumidity,
        Sensor::AmbientTemperature,
        Sensor::Pressure,
        Sensor::Proximity,
    ];

    /// Key used by the mobile client, both in downloads and sensor snapshots
    pub fn wire_name(self) -> &'static str {
        match self {
            Sensor::Light => "light",
            Sensor::RelativeHumidity => "relativeHumidity",
            Sensor::AmbientTemperature => "ambientTemperature",
            Sensor::Pressure => "pressure",
            Sensor::Proximity => "proximity",
        }
    }
}

/// Physical activity reported by the client's activity recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Still,
    Walking,
    Running,
    OnBicycle,
    InVehicle,
}

impl Activity {
    pub const ALL: [Activity; 5] = [
        Activity::Still,
        Activity::Walking,
        Activity::Running,
        Activity::OnBicycle,
        Activity::InVehicle,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Activity::Still => "still",
            Activity::Walking => "walking",
            Activity::Running => "running",
            Activity::OnBicycle => "on_bicycle",
            Activity::InVehicle => "in_vehicle",
        }
    }
}

impl FromStr for Activity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Activity::ALL
            .into_iter()
            .find(|activity| activity.code() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown activity: {}", s)))
    }
}

/// Conditions deciding when a questionnaire is shown to a proband
///
/// Time, sensor and activity conditions are combinable; every `None`
/// condition is simply not checked by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerConditions {
    /// Minimum seconds between two showings
    pub min_time_space: i64,
    pub datetime: Option<NaiveDateTime>,
    pub time: Option<NaiveTime>,
    pub light: Option<SensorLevel>,
    pub relative_humidity: Option<SensorLevel>,
    pub temperature: Option<SensorLevel>,
    pub air_pressure: Option<SensorLevel>,
    pub proximity: Option<SensorLevel>,
    pub activity: Option<Activity>,
}

impl TriggerConditions {
    pub fn sensor_level(&self, sensor: Sensor) -> Option<SensorLevel> {
        match sensor {
            Sensor::Light => self.light,
            Sensor::RelativeHumidity => self.relative_humidity,
            Sensor::AmbientTemperature => self.temperature,
            Sensor::Pressure => self.air_pressure,
            Sensor::Proximity => self.proximity,
        }
    }
}

/// Stored trigger event, one per questionnaire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub id: i64,
    pub questionnaire_id: i64,
    #[serde(flatten)]
    pub conditions: TriggerConditions,
}

/// Discriminant of the four question variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    Text,
    SingleChoice,
    MultiChoice,
    DragScale,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 4] = [
        QuestionKind::Text,
        QuestionKind::SingleChoice,
        QuestionKind::MultiChoice,
        QuestionKind::DragScale,
    ];

    /// Value of the `kind` column
    pub fn code(self) -> &'static str {
        match self {
            QuestionKind::Text => "text",
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::MultiChoice => "multi_choice",
            QuestionKind::DragScale => "drag_scale",
        }
    }

    /// `questionType` tag exchanged with the mobile client
    pub fn wire_tag(self) -> &'static str {
        match self {
            QuestionKind::Text => "TextAnswer",
            QuestionKind::SingleChoice => "SingleChoice",
            QuestionKind::MultiChoice => "MultipleChoice",
            QuestionKind::DragScale => "DragScale",
        }
    }

    pub fn from_wire_tag(tag: &str) -> Option<Self> {
        QuestionKind::ALL.into_iter().find(|kind| kind.wire_tag() == tag)
    }

    /// Table holding answers to questions of this kind
    pub fn answer_table(self) -> &'static str {
        match self {
            QuestionKind::Text => "text_answers",
            QuestionKind::SingleChoice => "single_choice_answers",
            QuestionKind::MultiChoice => "multi_choice_answers",
            QuestionKind::DragScale => "drag_scale_answers",
        }
    }

    pub fn has_options(self) -> bool {
        matches!(self, QuestionKind::SingleChoice | QuestionKind::MultiChoice)
    }
}

impl FromStr for QuestionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionKind::ALL
            .into_iter()
            .find(|kind| kind.code() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown question kind: {}", s)))
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_tag())
    }
}

/// Variant-specific question data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuestionVariant {
    Text,
    SingleChoice,
    MultiChoice,
    DragScale { min_value: f64, max_value: f64 },
}

impl QuestionVariant {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionVariant::Text => QuestionKind::Text,
            QuestionVariant::SingleChoice => QuestionKind::SingleChoice,
            QuestionVariant::MultiChoice => QuestionKind::MultiChoice,
            QuestionVariant::DragScale { .. } => QuestionKind::DragScale,
        }
    }
}

/// A question belongs to exactly one questionnaire of either kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionOwner {
    Questionnaire(i64),
    ProbandInfo(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub owner: QuestionOwner,
    /// Display position, unique within the owner
    pub position: i64,
    pub text: String,
    pub show_by_default: bool,
    pub variant: QuestionVariant,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        self.variant.kind()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub owner: QuestionOwner,
    pub position: i64,
    pub text: String,
    pub show_by_default: bool,
    pub variant: QuestionVariant,
}

/// Selectable option of a choice question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    /// Position of the follow-up question in the same questionnaire
    pub next_question_position: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proband {
    pub id: i64,
    pub study_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbandInfoCell {
    pub id: i64,
    pub proband_id: i64,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireAnswer {
    pub id: i64,
    pub proband_id: i64,
    pub questionnaire_id: i64,
    pub submitted_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorValueCell {
    pub id: i64,
    pub questionnaire_answer_id: i64,
    pub sensor: String,
    pub value: f64,
}

/// Value given for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerValue {
    Text(String),
    SingleChoice(String),
    MultiChoice(Vec<String>),
    DragScale(f64),
}

impl AnswerValue {
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerValue::Text(_) => QuestionKind::Text,
            AnswerValue::SingleChoice(_) => QuestionKind::SingleChoice,
            AnswerValue::MultiChoice(_) => QuestionKind::MultiChoice,
            AnswerValue::DragScale(_) => QuestionKind::DragScale,
        }
    }

    /// Flat text form used for info cells and CSV cells
    ///
    /// Multi-choice selections are joined with `;`.
    pub fn render(&self) -> String {
        match self {
            AnswerValue::Text(s) | AnswerValue::SingleChoice(s) => s.clone(),
            AnswerValue::MultiChoice(selected) => selected.join(";"),
            AnswerValue::DragScale(v) => v.to_string(),
        }
    }
}

/// One stored answer row, regardless of its variant table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRow {
    pub id: i64,
    pub questionnaire_answer_id: i64,
    pub question_id: i64,
    pub kind: QuestionKind,
    pub value: String,
}

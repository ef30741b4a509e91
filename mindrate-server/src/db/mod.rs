//! Schema store: repositories over the shared SQLite database
//!
//! Single-statement lookups are generic over the sqlx executor so they run
//! against the pool or inside an import transaction alike.

pub mod answers;
pub mod probands;
pub mod questionnaires;
pub mod questions;
pub mod studies;

pub use answers::*;
pub use probands::*;
pub use questionnaires::*;
pub use questions::*;
pub use studies::*;

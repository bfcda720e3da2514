pub mod time;
pub mod field;
pub mod schedule;
pub mod pricing;

pub use time::TimeOfDay;
pub use field::{Field, FieldInput, SportType};
pub use schedule::{DayOfWeek, Schedule, ScheduleInput};
pub use pricing::PriceQuote;

/// Catalog validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid day of week: {0}")]
    InvalidDay(String),

    #[error("Invalid schedule window: {start} must be before {end}")]
    InvalidWindow {
        start: String,
        end: String,
    },

    #[error("Duplicate schedule for {0}")]
    DuplicateDay(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

use pitch_catalog::CatalogError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Slot {0} is not offered on this date")]
    SlotNotOffered(String),

    #[error("Selected slots must be contiguous")]
    NotContiguous,

    #[error("Slot {0} is already reserved")]
    SlotOccupied(String),

    #[error("Slot {0} has already started")]
    PastSlot(String),

    #[error("Field is not available for booking")]
    FieldUnavailable,

    #[error("Missing contact details: {0}")]
    MissingContact(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    #[error("Unknown reservation status: {0}")]
    InvalidStatus(String),

    #[error("Date {0} is outside the bookable calendar")]
    DateOutOfRange(chrono::NaiveDate),

    #[error("Invalid UTC offset: {0} minutes")]
    InvalidOffset(i32),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

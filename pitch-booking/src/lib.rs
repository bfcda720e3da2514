pub mod error;
pub mod models;
pub mod slots;
pub mod selection;
pub mod booking;

pub use error::BookingError;
pub use models::{Customer, GuestContact, Reservation, ReservationStatus};
pub use slots::{DayAvailability, OccupiedSlots, SlotKey, SlotView};
pub use selection::SlotSelection;
pub use booking::{plan_booking, BookingPlan, BookingRequest};

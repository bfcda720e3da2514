pub mod pii;
pub mod models;

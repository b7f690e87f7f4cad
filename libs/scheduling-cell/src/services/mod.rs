pub mod booking;
pub mod calendar;
pub mod conflict;
pub mod notify;
pub mod slot_finder;

pub mod models;
pub mod repository;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use router::{scheduling_routes, SchedulingState};

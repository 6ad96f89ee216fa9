//! Database module for the Worldly server
//!
//! Row models and the data access layer over the shared connection pool.

pub mod models;
pub mod operations;

pub use models::{City, Country, NewTravel, Travel, TravelRecord, TravelStats, User};
pub use operations::DbOperations;

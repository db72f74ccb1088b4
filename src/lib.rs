pub mod api;
pub mod config;
pub mod database;
pub mod directory;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod statistics;

pub use error::ServiceError;

pub mod availability;
pub mod models;
pub mod types;

//! Helpers shared by unit and integration tests.

pub mod config_manager;
pub mod fixtures;
pub mod notify;
pub mod streamers;

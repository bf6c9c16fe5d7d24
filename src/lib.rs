pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod service;
pub mod srs;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Result, SchedulerError};

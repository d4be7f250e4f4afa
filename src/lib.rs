pub mod config;
pub mod error;
pub mod interrupt;
pub mod executor;
pub mod log;
pub mod model;
pub mod plan;
pub mod session;
pub mod state;

pub use error::{Error, Result, RunAborted};

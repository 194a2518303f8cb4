pub mod compare;
pub mod config;
pub mod error;
pub mod extract;
pub mod pose;
pub mod store;

pub use error::{Error, Result};

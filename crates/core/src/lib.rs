//! Core types shared by the APIService operator crates.
//!
//! - [`Error`] / [`Result`]: explicit, typed errors for config and file access
//! - [`ResultExt`]: logging combinators for results that may be discarded
//! - [`OperatorConfig`]: the operator's declared APIServices and operand settings

pub mod config;
pub mod error;
pub mod result;

pub use config::{ApiServiceEntry, ConfigFormat, OperatorConfig};
pub use error::Error;
pub use result::{Result, ResultExt};

//! CLI command implementations.

pub mod common;
pub mod convert;
pub mod devices;
pub mod play;
pub mod process;

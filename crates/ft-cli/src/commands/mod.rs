//! CLI command implementations.

pub mod flush;
pub mod run;
pub mod status;

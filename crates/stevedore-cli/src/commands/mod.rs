//! CLI commands

pub mod convert;
pub mod labels;
pub mod version;

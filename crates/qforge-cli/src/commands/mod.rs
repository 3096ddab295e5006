//! CLI command implementations.

pub mod common;
pub mod compile;
pub mod normalize;
pub mod status;
pub mod version;
pub mod vocabulary;

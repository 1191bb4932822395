//! CLI command implementations for Warrant.

pub mod token;

//! # warrant-core
//!
//! Shared types for the Warrant credential authority.
//!
//! This crate provides:
//! - The [`Permission`] scale (`read < write < sign < admin`) and its `covers` check
//! - [`TokenRecord`], the durable unit of truth kept for every issued credential
//! - [`Principal`], the identity a verified credential resolves to
//! - [`Page`], the public skip/limit policy for listings
//! - [`WarrantConfig`], the process configuration loaded from `config.toml`
//!
//! Nothing here performs I/O except configuration loading and saving.

pub mod config;
pub mod permission;
pub mod record;

pub use config::{ConfigError, LogConfig, StoreBackend, StoreConfig, WarrantConfig};
pub use permission::{InvalidPermission, Permission};
pub use record::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, Page, Principal, TokenRecord};

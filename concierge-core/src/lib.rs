//! Core types and traits for the hotel concierge gateway
//!
//! This crate provides the error type, configuration, logging setup and
//! the session store used by all other concierge components.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use error::{Error, Result};

//! Core types for ahoy
//!
//! This crate provides the session store, the session manager and the
//! configuration, logging and error plumbing shared by the other ahoy crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};

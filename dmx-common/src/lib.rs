//! # DMX Common Library
//!
//! Shared code for the Digital Museum eXperience survey services:
//! - Artwork catalog records and loading
//! - Configuration resolution (CLI → ENV → TOML → defaults)
//! - Common error type
//! - Clock abstraction for dwell-time measurement

pub mod catalog;
pub mod config;
pub mod error;
pub mod time;

pub use catalog::{ArtworkRecord, Catalog};
pub use error::{Error, Result};

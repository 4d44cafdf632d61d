//! # AquaSense Common Library
//!
//! Shared code for the AquaSense backend services:
//! - Water-quality parameter model and sparse readings
//! - Configuration file resolution and logging setup
//! - Common error type
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod reading;
pub mod time;

pub use error::{Error, Result};
pub use reading::{BoundsViolation, MeasuredReading, WaterParameter};

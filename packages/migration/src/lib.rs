//! # Invitation Migration
//!
//! Everything that moves a document between representations:
//!
//! - [`detect_mode`] / [`decode_payload`]: read the mode off a persisted payload
//! - [`linear_to_free`]: lossless, deterministic, never needs confirmation
//! - [`free_to_linear`]: flattens to reading order; may drop free-only items
//! - [`migrate`]: dispatch on the target mode
//!
//! Conversions are pure: same input and registry, same report.

mod convert;
mod detect;
mod report;

pub use convert::{free_to_linear, linear_to_free, migrate};
pub use detect::{decode_payload, detect_mode};
pub use report::{Diagnostics, DroppedItem, MigrationPolicy, MigrationReport, MigrationWarning};

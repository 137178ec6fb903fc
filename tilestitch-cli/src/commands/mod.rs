//! CLI command implementations.
//!
//! - [`run`] - Render every configured area
//! - [`plan`] - Pre-flight checks only, no network access
//! - [`bbox`] - Render one ad-hoc area given on the command line

pub mod bbox;
pub mod common;
pub mod plan;
pub mod run;

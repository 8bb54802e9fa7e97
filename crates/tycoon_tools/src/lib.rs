//! # Tycoon Development Tools
//!
//! Command-line tools for working on game data:
//! - Catalog validation
//! - Standard catalog export

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;

//! Data structures for catalog configuration.
//!
//! This module contains pure data structures that define resources and the
//! catalog document. All structs are designed to be deserialized from RON
//! files.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by callers such as `tycoon_tools`.

mod catalog_data;
mod resource_data;

pub use catalog_data::CatalogData;
pub use resource_data::ResourceDef;

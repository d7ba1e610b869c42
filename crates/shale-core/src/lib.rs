//! # shale-core
//!
//! Core abstractions for the shale record log.
//!
//! This crate provides the foundational types used across all shale components:
//!
//! - **Identifiers**: Strongly-typed collection IDs
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Logging initialization and span constructors
//!
//! ## Crate Boundary
//!
//! `shale-core` is the only crate allowed to define shared primitives.
//! Domain logic lives in `shale-log`; background services live in
//! `shale-janitor`.
//!
//! ## Example
//!
//! ```rust
//! use shale_core::prelude::*;
//!
//! // Generate a unique collection ID
//! let collection_id = CollectionId::generate();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use shale_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::CollectionId;
    pub use crate::observability::{init_logging, LogFormat};
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use id::CollectionId;
pub use observability::{init_logging, LogFormat};

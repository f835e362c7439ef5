//! Reel Core
//!
//! Foundational types for the Reel media service graph.
//!
//! This crate provides the building blocks shared by every graph node:
//! - **Property Store**: ordered, stringly-typed key/value bag with
//!   permissive coercion (`Properties`, `Value`)
//! - **Profile**: immutable frame geometry/timing descriptor shared by
//!   all services connected into one graph
//! - **Frame**: the unit of data pulled through a pipeline
//! - **Error Handling**: unified `ReelError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use reel_core::{Profile, Properties};
//!
//! let profile = Profile::preset("hdv_720_25p").unwrap();
//! assert_eq!(profile.fps(), 25.0);
//!
//! let mut props = Properties::new();
//! props.set("x", "42");
//! assert_eq!(props.get_int("x"), 42);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod frame;
pub mod profile;
pub mod properties;

// Re-export commonly used types
pub use error::{ReelError, Result};
pub use frame::Frame;
pub use profile::Profile;
pub use properties::{Properties, Value};

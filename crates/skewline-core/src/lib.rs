//! Skewline Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by the skew resolver:
//! - Node names, including the reserved `unknown` sentinel
//! - Observer-local timestamps and signed skews
//! - Observation events and subject state codes
//! - The event store and node directory seams

pub mod id;
pub mod time;
pub mod event;
pub mod store;
pub mod directory;
pub mod error;

pub use id::*;
pub use time::*;
pub use event::*;
pub use store::*;
pub use directory::*;
pub use error::*;

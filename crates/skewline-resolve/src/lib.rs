//! Skewline Resolve - Clock skew detection and identity resolution
//!
//! This crate implements the resolution pass:
//! - Pairwise skew detection by aligning two observers' state streams
//! - A symmetric, first-write-wins skew table
//! - Full-topology skew sweeps (optionally parallel)
//! - Resolution of anonymous nodes against unbound candidate names
//! - Pass orchestration with deadline and cooperative cancellation

pub mod config;
pub mod control;
pub mod detector;
pub mod engine;
pub mod observe;
pub mod resolver;
pub mod sweep;
pub mod table;

pub use config::*;
pub use control::*;
pub use detector::*;
pub use engine::*;
pub use observe::*;
pub use resolver::*;
pub use sweep::*;
pub use table::*;

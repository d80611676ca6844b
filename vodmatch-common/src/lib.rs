//! Shared foundation for the vodmatch workspace
//!
//! Holds the error type and the video timestamp newtype used by both the
//! deduction engine and the CLI.

pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::VideoTime;

//! Shared tracing setup for the vigil binaries.

mod tracing;

pub use self::tracing::{init, init_tracing, init_with_level};

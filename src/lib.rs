//! Asynchronous statement execution and row mapping on top of non-blocking database drivers.
//!
//! Re-exports the core pipeline and the `#[derive(Mapped)]` macro.
pub use sluice_core::*;
pub use sluice_macros::*;

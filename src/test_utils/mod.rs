//! Shared test utilities for smx.

pub mod fixtures;
pub mod logging;

//! smx - skills matrix resolution engine.
//!
//! Loads a matrix of categories and relationship rules, merges it with skill
//! metadata found on disk, and answers selection questions against the result.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod matrix;
pub mod sources;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Result, SmxError};

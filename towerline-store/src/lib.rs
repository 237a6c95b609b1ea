//! Schema for per-airport static data files.

#![warn(clippy::pedantic)]
#![allow(clippy::collapsible_else_if)] // this is usually intentional
#![forbid(missing_docs)]

use serde::{Deserialize, Serialize};

mod airport;
pub use airport::*;

mod ground;
pub use ground::*;

#[cfg(test)]
mod tests;

/// Root structure for an airport data file.
#[derive(Clone, Serialize, Deserialize)]
pub struct File {
    /// Airports defined in this file.
    pub airports: Vec<Airport>,
}

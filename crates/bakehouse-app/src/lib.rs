//! Bakehouse back-office application
//!
//! Library half of the `bakehouse` binary: logging setup, store wiring and
//! the text views the commands print.

pub mod app;
pub mod logging;

#[cfg(test)]
mod app_tests;

pub use app::*;

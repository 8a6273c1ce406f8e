//! Tests for the statement executor
//!
//! Organized by feature area

mod basic_tests;
mod cancel_tests;
mod error_tests;
mod helpers;

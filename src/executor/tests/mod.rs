//! Tests for the execution engine
//!
//! Organized by feature area

mod helpers;
mod instruction_tests;
mod runtime_tests;

//! Common utilities for the sieve selector engine.
//!
//! This crate provides shared infrastructure used by all sieve components:
//! - **Warning System** - colored terminal output for selector features that
//!   parse but can never match

pub mod warning;

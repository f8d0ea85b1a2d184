//! stratlang: a strategy expression compiler and indicator evaluation engine.
//!
//! Hexagonal architecture: the compiler and evaluator live in [`domain`],
//! port traits in [`ports`], file-backed implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;

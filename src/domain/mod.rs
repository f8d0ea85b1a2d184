//! Core domain: the DSL front end, market data model, indicator
//! computations and the evaluator that ties them together.

pub mod ast;
pub mod cache;
pub mod context;
pub mod error;
pub mod eval;
pub mod indicator;
pub mod lexer;
pub mod market;
pub mod parser;
pub mod registry;
pub mod token;

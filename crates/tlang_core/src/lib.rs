//! Interpreter for T, a stack based pipeline language for tabular data.
//!
//! Statements flow through the [`reader`], are parsed and bound by
//! [`command`] and [`binding`], turned into typed [`verb`]s and executed by a
//! [`program::Program`] against a stack of in-memory [`table`]s.
pub mod binding;
pub mod command;
pub mod config;
pub mod expr;
pub mod history;
pub mod program;
pub mod reader;
pub mod session;
pub mod stack;
pub mod table;
pub mod tokens;
pub mod udf;
pub mod verb;

//! Define a SQL AST, helpers for building it, and a conversion to a SQL string.

pub mod ast;
pub mod convert;
pub mod helpers;
pub mod string;

//! Translate fragment queries and index definitions to SQL.

pub mod ddl;
pub mod error;
pub mod helpers;
pub mod query;
pub mod request;

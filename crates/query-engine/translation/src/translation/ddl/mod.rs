//! Translate index definitions into DDL statements.

pub mod index;

pub use index::{
    translate_create_index, translate_drop_index, translate_table_indexes, TableIndex,
};

//! Metadata information regarding the database and tracked information.

pub mod database;
pub mod fragments;
pub mod indexes;
pub mod permissions;

// re-export without modules
pub use database::*;
pub use fragments::*;
pub use indexes::*;
pub use permissions::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata information.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    pub tables: TablesInfo,
    #[serde(default)]
    pub fragments: FragmentsInfo,
}

impl Metadata {
    pub fn empty() -> Self {
        Metadata {
            tables: TablesInfo::empty(),
            fragments: FragmentsInfo::empty(),
        }
    }
}

//! Configuration for the query compiler.

use query_engine_metadata::metadata;
use schemars::{gen::SchemaSettings, schema::RootSchema};

use crate::version1::{CompilerSettings, ParsedConfiguration};

/// The 'Configuration' type collects all the information necessary to compile queries at runtime.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', which validates the metadata once so that
/// compilation never has to deal with dangling references.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub metadata: metadata::Metadata,
    pub settings: CompilerSettings,
}

/// The JSON schema of the latest configuration format.
pub fn generate_latest_schema() -> RootSchema {
    SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<ParsedConfiguration>()
}

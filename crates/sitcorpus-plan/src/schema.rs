use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::CorpusConfig;

/// Emit the JSON Schema for corpus config files.
pub fn config_json_schema() -> RootSchema {
    schema_for!(CorpusConfig)
}

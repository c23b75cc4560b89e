//! The seam between the parsing engine and the model builder.

use crate::config::ModelConfig;
use crate::error::{ModelError, ModelResult};
use crate::project::ProjectFile;
use crate::raw::RawProject;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Anything able to hand over the raw record set of one project.
pub trait ProjectReader {
    fn read_raw(&self) -> ModelResult<RawProject>;
}

/// Reads raw records from `reader` and builds the model from them.
pub fn read_project<R: ProjectReader + ?Sized>(
    reader: &R,
    config: &ModelConfig,
) -> ModelResult<ProjectFile> {
    let raw = reader.read_raw()?;
    ProjectFile::build(raw, config)
}

#[derive(Debug, Clone)]
enum JsonSource {
    File(PathBuf),
    Text(String),
}

/// Reads the engine's JSON export.
#[derive(Debug, Clone)]
pub struct JsonProjectReader {
    source: JsonSource,
}

impl JsonProjectReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: JsonSource::File(path.as_ref().to_path_buf()),
        }
    }

    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            source: JsonSource::Text(json.into()),
        }
    }

    fn text(&self) -> ModelResult<String> {
        match &self.source {
            JsonSource::File(path) => {
                debug!(path = %path.display(), "reading project json");
                Ok(fs::read_to_string(path)?)
            }
            JsonSource::Text(text) => Ok(text.clone()),
        }
    }
}

impl ProjectReader for JsonProjectReader {
    fn read_raw(&self) -> ModelResult<RawProject> {
        let text = self.text()?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|err| ModelError::UnsupportedInput(format!("not a json document: {err}")))?;
        let Value::Object(root) = value else {
            return Err(ModelError::UnsupportedInput(
                "project json must be an object".to_string(),
            ));
        };
        if let Some(failure) = root.get("error") {
            return Err(engine_failure(failure));
        }
        serde_json::from_value(Value::Object(root))
            .map_err(|err| ModelError::UnsupportedInput(format!("malformed project json: {err}")))
    }
}

/// Maps an engine-reported `{"kind", "message"}` failure onto the error taxonomy.
fn engine_failure(failure: &Value) -> ModelError {
    let kind = failure.get("kind").and_then(Value::as_str).unwrap_or_default();
    let message = failure
        .get("message")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| failure.to_string());
    match kind {
        "password_protected" | "access_denied" => ModelError::AccessDenied(message),
        _ => ModelError::UnsupportedInput(message),
    }
}

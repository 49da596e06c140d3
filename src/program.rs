//! Program files
//!
//! A program file is a function table in JSON or TOML:
//!
//! ```json
//! {"functions": [{"name": "$main", "params": [], "code": [{"line": 1, "op": "push", "value": 1}]}]}
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::executor::{FunctionDef, Op};

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON program: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML program: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported program format '{0}' (expected .json or .toml)")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub code: Vec<Op>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramFile {
    pub functions: Vec<FunctionSpec>,
}

impl ProgramFile {
    /// Load a program, choosing the format by file extension
    pub fn load(path: &Path) -> Result<Self, ProgramError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProgramError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        let program = match extension {
            "json" => Self::from_json(&text)?,
            "toml" => Self::from_toml(&text)?,
            other => return Err(ProgramError::UnsupportedFormat(other.to_string())),
        };
        debug!(path = %path.display(), functions = program.functions.len(), "program loaded");
        Ok(program)
    }

    pub fn from_json(text: &str) -> Result<Self, ProgramError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, ProgramError> {
        Ok(toml::from_str(text)?)
    }

    /// Function table for `Runtime::builder`
    pub fn into_function_table(self) -> Vec<FunctionDef> {
        self.functions
            .into_iter()
            .map(|f| FunctionDef::new(f.name, f.params, f.code))
            .collect()
    }
}

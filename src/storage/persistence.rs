use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("resource `{0}` not found")]
    NotFound(String),
    #[error("resource `{0}` is outside the storage root")]
    OutsideRoot(String),
    #[error("i/o error on `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in `{path}`: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{0}` does not hold a JSON object")]
    NotAnObject(String),
}

impl StorageError {
    fn io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Result of [`FilePersistence::create_or_update_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonWrite {
    Created,
    Updated,
}

/// Files below a root directory, addressed by relative resource paths.
///
/// Bytes are stored verbatim. JSON resources can additionally be merged
/// into: nested objects merge recursively, every other value (arrays
/// included) is overwritten.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    root: PathBuf,
}

impl FilePersistence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `resource` below the root. Absolute paths and `..` are refused.
    pub fn resolve(&self, resource: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(resource.trim_start_matches('/'));
        let inside = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !inside {
            return Err(StorageError::OutsideRoot(resource.to_string()));
        }
        Ok(self.root.join(relative))
    }

    pub fn exists(&self, resource: &str) -> bool {
        self.resolve(resource).is_ok_and(|path| path.is_file())
    }

    pub fn read_bytes(&self, resource: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(resource)?;
        fs::read(path).map_err(|e| StorageError::io(resource, e))
    }

    pub fn read_text(&self, resource: &str) -> Result<String, StorageError> {
        let path = self.resolve(resource)?;
        fs::read_to_string(path).map_err(|e| StorageError::io(resource, e))
    }

    /// Writes `content`, replacing the file. The parent directory must exist.
    pub fn write_bytes(&self, resource: &str, content: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(resource)?;
        fs::write(path, content).map_err(|e| StorageError::io(resource, e))
    }

    pub fn write_text(&self, resource: &str, content: &str) -> Result<(), StorageError> {
        self.write_bytes(resource, content.as_bytes())
    }

    pub fn delete(&self, resource: &str) -> Result<(), StorageError> {
        let path = self.resolve(resource)?;
        fs::remove_file(path).map_err(|e| StorageError::io(resource, e))
    }

    /// Stores `update` as the JSON document at `resource`.
    ///
    /// Missing parent directories are created. An absent or empty file gets
    /// `update` verbatim; otherwise `update` is merged into the stored
    /// document.
    pub fn create_or_update_json(
        &self,
        resource: &str,
        update: &str,
    ) -> Result<JsonWrite, StorageError> {
        let path = self.resolve(resource)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(resource, e))?;
        }

        let existing = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(StorageError::io(resource, e)),
        };

        if existing.is_empty() {
            fs::write(&path, update).map_err(|e| StorageError::io(resource, e))?;
            debug!(resource, "Created JSON resource");
            return Ok(JsonWrite::Created);
        }

        let mut target = parse_object(resource, &existing)?;
        let source = parse_object(resource, update)?;
        merge(source, &mut target);

        let merged = serde_json::to_string(&Value::Object(target)).map_err(|source| {
            StorageError::Json {
                path: resource.to_string(),
                source,
            }
        })?;
        fs::write(&path, merged).map_err(|e| StorageError::io(resource, e))?;
        debug!(resource, "Merged JSON resource");
        Ok(JsonWrite::Updated)
    }
}

fn parse_object(resource: &str, text: &str) -> Result<Map<String, Value>, StorageError> {
    match serde_json::from_str(text) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(StorageError::NotAnObject(resource.to_string())),
        Err(source) => Err(StorageError::Json {
            path: resource.to_string(),
            source,
        }),
    }
}

/// Deep-merges `source` into `target`.
pub fn merge(source: Map<String, Value>, target: &mut Map<String, Value>) {
    for (name, value) in source {
        match value {
            Value::Object(nested) => {
                let slot = target
                    .entry(name)
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(existing) = slot {
                    merge(nested, existing);
                }
            }
            other => {
                target.insert(name, other);
            }
        }
    }
}

//! File-backed execution store
//!
//! Each execution is written to `<root>/<flow_name>/<id>.<ext>`, encoded with a
//! [`SerializerProtocol`]. Writes go to a temporary sibling first and are renamed
//! into place, so a reader never sees a half-written snapshot.

use crate::{
    checkpoint::{ExecutionId, ExecutionState},
    error::{CheckpointError, Result},
    serializer::{JsonSerializer, SerializerProtocol},
    traits::Store,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Store that keeps one file per execution under a root directory
#[derive(Debug)]
pub struct FileStore<S, Ser = JsonSerializer> {
    root: PathBuf,
    serializer: Ser,
    _state: PhantomData<fn() -> S>,
}

impl<S> FileStore<S, JsonSerializer> {
    /// JSON-encoded store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_serializer(root, JsonSerializer)
    }
}

impl<S, Ser: SerializerProtocol> FileStore<S, Ser> {
    pub fn with_serializer(root: impl Into<PathBuf>, serializer: Ser) -> Self {
        Self {
            root: root.into(),
            serializer,
            _state: PhantomData,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the snapshot for `id`
    pub fn path_for(&self, id: &ExecutionId) -> Result<PathBuf> {
        validate_segment("flow name", &id.flow_name)?;
        validate_segment("execution id", &id.id)?;

        Ok(self
            .root
            .join(&id.flow_name)
            .join(format!("{}.{}", id.id, self.serializer.extension())))
    }
}

fn validate_segment(what: &str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(|c: char| matches!(c, '/' | '\\' | '\0'));

    if invalid {
        return Err(CheckpointError::Invalid(format!(
            "{} {:?} cannot be used as a path segment",
            what, value
        )));
    }
    Ok(())
}

#[async_trait]
impl<S, Ser> Store<S> for FileStore<S, Ser>
where
    S: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
    Ser: SerializerProtocol + 'static,
{
    async fn get(&self, id: &ExecutionId) -> Result<ExecutionState<S>> {
        let path = self.path_for(id)?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(execution = %id, path = %path.display(), "No snapshot on disk");
                return Ok(ExecutionState::default());
            }
            Err(e) => return Err(e.into()),
        };

        self.serializer.loads(&bytes)
    }

    async fn set(&self, id: &ExecutionId, state: &ExecutionState<S>) -> Result<()> {
        let path = self.path_for(id)?;
        let bytes = self.serializer.dumps(state)?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let tmp = path.with_extension(format!("{}.tmp", self.serializer.extension()));
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;

        tracing::trace!(execution = %id, bytes = bytes.len(), "Snapshot written");
        Ok(())
    }
}

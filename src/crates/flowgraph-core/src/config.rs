//! Pipe configuration loaded from TOML or YAML
//!
//! ```toml
//! flow_name = "approvals"
//! max_steps = 500
//! log_level = "debug"
//!
//! [store]
//! type = "file"
//! path = "./state"
//! format = "json"
//! ```
//!
//! The same document in YAML:
//!
//! ```yaml
//! flow_name: approvals
//! max_steps: 500
//! store:
//!   type: file
//!   path: ./state
//!   format: bincode
//! ```
//!
//! Every field is optional; see [`PipeConfig::default`].

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::pipe::Pipe;
use flowgraph_checkpoint::{BincodeSerializer, FileStore, InMemoryStore, Store};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// On-disk encoding for file-backed stores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    #[default]
    Json,
    Bincode,
}

/// Where execution snapshots live
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local map, lost on exit
    #[default]
    Memory,
    /// One file per execution under `path`
    File {
        path: PathBuf,
        #[serde(default)]
        format: SerializationFormat,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    pub flow_name: String,
    /// Unlimited when absent
    pub max_steps: Option<usize>,
    pub store: StoreConfig,
    /// Default filter directive when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            flow_name: "default".to_string(),
            max_steps: None,
            store: StoreConfig::Memory,
            log_level: "info".to_string(),
        }
    }
}

impl PipeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let config = match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content)?,
            _ => {
                return Err(GraphError::Configuration(format!(
                    "Unsupported config format for {:?}: expected .toml, .yaml or .yml",
                    path
                )))
            }
        };

        tracing::debug!(path = %path.display(), flow = %config.flow_name, "Loaded pipe configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.flow_name.trim().is_empty() {
            return Err(GraphError::Configuration("flow_name cannot be empty".to_string()));
        }
        if self.max_steps == Some(0) {
            return Err(GraphError::Configuration(
                "max_steps must be greater than zero".to_string(),
            ));
        }
        if let StoreConfig::File { path, .. } = &self.store {
            if path.as_os_str().is_empty() {
                return Err(GraphError::Configuration("store path cannot be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Instantiate the configured store
    pub fn build_store<S>(&self) -> Arc<dyn Store<S>>
    where
        S: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
    {
        match &self.store {
            StoreConfig::Memory => Arc::new(InMemoryStore::<S>::new()),
            StoreConfig::File {
                path,
                format: SerializationFormat::Json,
            } => Arc::new(FileStore::<S>::new(path.clone())),
            StoreConfig::File {
                path,
                format: SerializationFormat::Bincode,
            } => Arc::new(FileStore::<S, _>::with_serializer(path.clone(), BincodeSerializer::new())),
        }
    }

    /// A pipe over `graph` using this configuration's name, store and step limit
    pub fn build_pipe<S>(&self, graph: impl Into<Arc<Graph<S>>>) -> Pipe<S>
    where
        S: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
    {
        let pipe = Pipe::new(self.flow_name.as_str(), graph, self.build_store());
        match self.max_steps {
            Some(limit) => pipe.with_max_steps(limit),
            None => pipe,
        }
    }
}

//! Record-collection providers and logical source resolution.
//!
//! Ownership model:
//! - `LogicalSource` names a dataset independently of where it is stored.
//! - `ProviderConfig` (fixed at provider construction) decides whether that
//!   name resolves to a local snapshot directory or a remote repository.
//! - `RecordProvider` turns a resolved `(source, variant, split)` request into
//!   a complete `RecordCollection`, or fails without returning partial rows.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::{Locality, ProviderConfig};
use crate::data::RecordCollection;
use crate::errors::CorpusError;
use crate::types::{ConfigVariant, SplitName};

/// Snapshot-file provider for local and hub-hosted datasets.
#[cfg(feature = "huggingface")]
pub mod snapshot;
#[cfg(feature = "huggingface")]
pub use snapshot::SnapshotProvider;

/// A dataset identity that resolves to a local or remote location.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogicalSource {
    local_name: Option<Cow<'static, str>>,
    remote_id: Cow<'static, str>,
    local_split_aliases: Vec<(SplitName, SplitName)>,
}

impl LogicalSource {
    /// Source available both as `<data_dir>/<local_name>` and as `remote_id`.
    pub fn new(
        local_name: impl Into<Cow<'static, str>>,
        remote_id: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            local_name: Some(local_name.into()),
            remote_id: remote_id.into(),
            local_split_aliases: Vec::new(),
        }
    }

    /// Source that is always fetched remotely, whatever the locality.
    pub fn remote_only(remote_id: impl Into<Cow<'static, str>>) -> Self {
        Self {
            local_name: None,
            remote_id: remote_id.into(),
            local_split_aliases: Vec::new(),
        }
    }

    /// Source named `name` under both the local root and `remote_prefix`.
    pub fn prefixed(name: &str, remote_prefix: &str) -> Self {
        Self::new(name.to_string(), format!("{remote_prefix}{name}"))
    }

    /// Read `requested` split from the local snapshot's `local` split instead.
    pub fn with_local_split(mut self, requested: &str, local: &str) -> Self {
        self.local_split_aliases
            .push((requested.to_string(), local.to_string()));
        self
    }

    /// Remote repository id.
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    /// Local snapshot directory name, if one exists.
    pub fn local_name(&self) -> Option<&str> {
        self.local_name.as_deref()
    }

    /// Resolve a request under `config`.
    pub fn resolve(
        &self,
        config: &ProviderConfig,
        variant: Option<&str>,
        split: &str,
    ) -> ResolvedSource {
        let variant = variant.filter(|v| !v.is_empty()).map(str::to_string);
        match (&config.locality, self.local_name.as_deref()) {
            (Locality::Local, Some(local_name)) => {
                let split = self
                    .local_split_aliases
                    .iter()
                    .find(|(requested, _)| requested == split)
                    .map(|(_, local)| local.clone())
                    .unwrap_or_else(|| split.to_string());
                ResolvedSource {
                    location: SourceLocation::LocalPath(config.data_dir.join(local_name)),
                    variant,
                    split,
                }
            }
            _ => ResolvedSource {
                location: SourceLocation::RemoteRepo(self.remote_id.to_string()),
                variant,
                split: split.to_string(),
            },
        }
    }
}

impl fmt::Display for LogicalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.local_name {
            Some(local) => write!(f, "{local} ({})", self.remote_id),
            None => f.write_str(&self.remote_id),
        }
    }
}

/// Where a resolved request is read from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceLocation {
    /// Directory containing snapshot shards.
    LocalPath(PathBuf),
    /// Repository id on the remote registry.
    RemoteRepo(String),
}

/// A fully resolved `(location, variant, split)` request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedSource {
    /// Storage location.
    pub location: SourceLocation,
    /// Optional sub-dataset within the source family.
    pub variant: Option<ConfigVariant>,
    /// Split name as stored at the location.
    pub split: SplitName,
}

impl ResolvedSource {
    /// Stable id used in errors and collection names.
    pub fn source_id(&self) -> String {
        let base = match &self.location {
            SourceLocation::LocalPath(path) => path.display().to_string(),
            SourceLocation::RemoteRepo(repo) => repo.clone(),
        };
        match &self.variant {
            Some(variant) => format!("{base}/{variant}:{}", self.split),
            None => format!("{base}:{}", self.split),
        }
    }
}

/// External collaborator that materializes record collections.
///
/// Implementations must return either the whole split or an error; a
/// partially-read split is reported as `SourceUnavailable`.
pub trait RecordProvider: Send + Sync {
    /// Locality and root settings this provider was built with.
    fn config(&self) -> &ProviderConfig;

    /// Fetch one split of `source` (optionally one config variant of it).
    fn fetch(
        &self,
        source: &LogicalSource,
        variant: Option<&str>,
        split: &str,
    ) -> Result<RecordCollection, CorpusError>;
}

/// In-memory provider for tests and small fixtures.
pub struct InMemoryProvider {
    config: ProviderConfig,
    collections: HashMap<ResolvedSource, RecordCollection>,
}

impl InMemoryProvider {
    /// Create an empty provider with `config`.
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            collections: HashMap::new(),
        }
    }

    /// Register `collection` as the answer for `(source, variant, split)` under this
    /// provider's locality.
    pub fn insert(
        &mut self,
        source: &LogicalSource,
        variant: Option<&str>,
        split: &str,
        collection: RecordCollection,
    ) {
        let resolved = source.resolve(&self.config, variant, split);
        self.collections.insert(resolved, collection);
    }

    /// Builder form of [`InMemoryProvider::insert`].
    pub fn with(
        mut self,
        source: &LogicalSource,
        variant: Option<&str>,
        split: &str,
        collection: RecordCollection,
    ) -> Self {
        self.insert(source, variant, split, collection);
        self
    }
}

impl RecordProvider for InMemoryProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn fetch(
        &self,
        source: &LogicalSource,
        variant: Option<&str>,
        split: &str,
    ) -> Result<RecordCollection, CorpusError> {
        let resolved = source.resolve(&self.config, variant, split);
        self.collections
            .get(&resolved)
            .cloned()
            .map(|collection| collection.renamed(resolved.source_id()))
            .ok_or_else(|| {
                CorpusError::unavailable(
                    resolved.source_id(),
                    format!("no collection registered for {source}"),
                )
            })
    }
}

use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{LogicalSource, RecordProvider, ResolvedSource, SourceLocation};
use crate::config::ProviderConfig;
use crate::constants::source::SHARD_EXTENSIONS;
use crate::data::{FieldValue, Record, RecordCollection};
use crate::errors::CorpusError;
use crate::types::FieldName;

/// Provider reading JSON-lines and parquet shards from local snapshot
/// directories or from dataset repositories on the hub.
///
/// Shards are selected by path: a requested variant must appear as a path
/// component, and the split must appear as a directory, a `-<split>-` token,
/// a `<split>-` filename prefix, or the file stem. Matching shards are read in
/// sorted path order so row order is stable between runs.
pub struct SnapshotProvider {
    config: ProviderConfig,
    shard_extensions: Vec<String>,
    hub_cache_dir: Option<PathBuf>,
}

impl SnapshotProvider {
    /// Create a provider for `config`.
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            shard_extensions: SHARD_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            hub_cache_dir: None,
        }
    }

    /// Store downloaded hub files under `dir` instead of the default hub cache.
    pub fn with_hub_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.hub_cache_dir = Some(dir.into());
        self
    }

    /// Restrict accepted shard extensions (lowercase, without the dot).
    pub fn with_shard_extensions(mut self, extensions: &[&str]) -> Self {
        self.shard_extensions = extensions.iter().map(|ext| ext.to_ascii_lowercase()).collect();
        self
    }

    fn accepts(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| self.shard_extensions.iter().any(|allowed| *allowed == ext))
    }

    fn local_shards(&self, root: &Path, resolved: &ResolvedSource) -> Result<Vec<PathBuf>, CorpusError> {
        let source_id = resolved.source_id();
        if !root.is_dir() {
            return Err(CorpusError::unavailable(
                source_id,
                format!("snapshot directory {} does not exist", root.display()),
            ));
        }
        let mut shards = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|err| {
                CorpusError::unavailable(source_id.clone(), format!("failed walking snapshot: {err}"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if self.accepts(&relative)
                && shard_matches(&relative, resolved.variant.as_deref(), &resolved.split)
            {
                shards.push(entry.path().to_path_buf());
            }
        }
        shards.sort();
        Ok(shards)
    }

    fn remote_shards(&self, repo_id: &str, resolved: &ResolvedSource) -> Result<Vec<PathBuf>, CorpusError> {
        let source_id = resolved.source_id();
        let mut builder = ApiBuilder::new().with_progress(true).with_token(None);
        if let Some(dir) = &self.hub_cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder.build().map_err(|err| {
            CorpusError::unavailable(source_id.clone(), format!("failed building hf-hub client: {err}"))
        })?;
        let repo_api = api.repo(Repo::new(repo_id.to_string(), RepoType::Dataset));
        info!("[corpora:hf] reading remote file list for dataset {}", repo_id);
        let info = repo_api.info().map_err(|err| {
            CorpusError::unavailable(
                source_id.clone(),
                format!("failed reading hf-hub repository info: {err}"),
            )
        })?;

        let mut remote_paths: Vec<String> = info
            .siblings
            .into_iter()
            .map(|entry| entry.rfilename)
            .filter(|path| {
                self.accepts(path)
                    && shard_matches(path, resolved.variant.as_deref(), &resolved.split)
            })
            .collect();
        remote_paths.sort();

        let mut shards = Vec::with_capacity(remote_paths.len());
        for remote_path in &remote_paths {
            debug!("[corpora:hf] fetching shard {}/{}", repo_id, remote_path);
            let local = repo_api.get(remote_path).map_err(|err| {
                CorpusError::unavailable(
                    source_id.clone(),
                    format!("failed downloading '{remote_path}' from hf-hub: {err}"),
                )
            })?;
            shards.push(local);
        }
        Ok(shards)
    }
}

impl RecordProvider for SnapshotProvider {
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
        let source_id = resolved.source_id();
        let shards = match &resolved.location {
            SourceLocation::LocalPath(root) => self.local_shards(root, &resolved)?,
            SourceLocation::RemoteRepo(repo_id) => self.remote_shards(repo_id, &resolved)?,
        };
        if shards.is_empty() {
            return Err(CorpusError::unavailable(
                source_id,
                format!(
                    "no {:?} shards match split '{}'",
                    self.shard_extensions, resolved.split
                ),
            ));
        }

        let mut rows = Vec::new();
        for shard in &shards {
            let before = rows.len();
            read_shard(&source_id, shard, &mut rows)?;
            debug!(
                "[corpora:hf] read {} rows from {}",
                rows.len() - before,
                shard.display()
            );
        }
        info!(
            "[corpora:hf] fetched {} rows from {} shard(s) for {}",
            rows.len(),
            shards.len(),
            source_id
        );
        uniform_collection(source_id, rows)
    }
}

/// True when `relative` (a `/`-separated shard path) belongs to `variant`/`split`.
fn shard_matches(relative: &str, variant: Option<&str>, split: &str) -> bool {
    let components: Vec<&str> = relative.split('/').collect();
    let Some((file_name, dirs)) = components.split_last() else {
        return false;
    };
    if let Some(variant) = variant
        && !dirs.contains(&variant)
    {
        return false;
    }
    if split.is_empty() {
        return true;
    }
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    dirs.contains(&split)
        || file_name.contains(&format!("-{split}-"))
        || file_name.starts_with(&format!("{split}-"))
        || stem == split
}

fn read_shard(source_id: &str, path: &Path, rows: &mut Vec<Map<String, Value>>) -> Result<(), CorpusError> {
    let is_parquet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        read_parquet_shard(source_id, path, rows)
    } else {
        read_json_lines_shard(source_id, path, rows)
    }
}

fn read_json_lines_shard(
    source_id: &str,
    path: &Path,
    rows: &mut Vec<Map<String, Value>>,
) -> Result<(), CorpusError> {
    let file = File::open(path).map_err(|err| {
        CorpusError::unavailable(source_id, format!("failed opening {}: {err}", path.display()))
    })?;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| {
            CorpusError::unavailable(source_id, format!("failed reading {}: {err}", path.display()))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(map)) => rows.push(map),
            Ok(_) => {
                return Err(CorpusError::unavailable(
                    source_id,
                    format!("{}:{} is not a JSON object", path.display(), line_no + 1),
                ));
            }
            Err(err) => {
                return Err(CorpusError::unavailable(
                    source_id,
                    format!("{}:{} invalid JSON: {err}", path.display(), line_no + 1),
                ));
            }
        }
    }
    Ok(())
}

fn read_parquet_shard(
    source_id: &str,
    path: &Path,
    rows: &mut Vec<Map<String, Value>>,
) -> Result<(), CorpusError> {
    let file = File::open(path).map_err(|err| {
        CorpusError::unavailable(
            source_id,
            format!("failed opening parquet shard {}: {err}", path.display()),
        )
    })?;
    let reader = SerializedFileReader::new(file).map_err(|err| {
        CorpusError::unavailable(
            source_id,
            format!("failed reading parquet shard {}: {err}", path.display()),
        )
    })?;
    let iter = reader.get_row_iter(None).map_err(|err| {
        CorpusError::unavailable(
            source_id,
            format!("failed iterating parquet shard {}: {err}", path.display()),
        )
    })?;
    for row in iter {
        let row = row.map_err(|err| {
            CorpusError::unavailable(
                source_id,
                format!("failed decoding parquet row in {}: {err}", path.display()),
            )
        })?;
        match row.to_json_value() {
            Value::Object(map) => rows.push(map),
            other => {
                return Err(CorpusError::unavailable(
                    source_id,
                    format!("parquet row decoded to non-object {other}"),
                ));
            }
        }
    }
    Ok(())
}

/// Build a collection whose schema is the union of row keys in first-seen
/// order; rows missing a key get `Null` there.
fn uniform_collection(
    name: String,
    rows: Vec<Map<String, Value>>,
) -> Result<RecordCollection, CorpusError> {
    let mut schema: Vec<FieldName> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !schema.contains(key) {
                schema.push(key.clone());
            }
        }
    }
    let records = rows
        .into_iter()
        .map(|mut row| {
            Record::from_fields(schema.iter().map(|field| {
                let value = row.remove(field).map(FieldValue::from).unwrap_or(FieldValue::Null);
                (field.clone(), value)
            }))
        })
        .collect();
    RecordCollection::new(name, schema, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_matching_follows_hub_layouts() {
        assert!(shard_matches("DocVQA/validation-00000-of-00006.parquet", Some("DocVQA"), "validation"));
        assert!(shard_matches("docvqa/train-00001-of-00003.parquet", Some("docvqa"), "train"));
        assert!(shard_matches("data/train-00000-of-00001.parquet", None, "train"));
        assert!(shard_matches("test/part.jsonl", None, "test"));
        assert!(shard_matches("rows-test-0001.jsonl", None, "test"));
        assert!(shard_matches("train.jsonl", None, "train"));
    }

    #[test]
    fn split_matching_rejects_other_splits_and_variants() {
        assert!(!shard_matches("DocVQA/test-00000-of-00006.parquet", Some("DocVQA"), "validation"));
        assert!(!shard_matches(
            "InfographicVQA/validation-00000-of-00002.parquet",
            Some("DocVQA"),
            "validation"
        ));
        assert!(!shard_matches("data/trainer-notes.jsonl", None, "train"));
    }

    #[test]
    fn uniform_collection_fills_missing_keys_with_null() {
        let rows = vec![
            json!({"query": "a", "image_filename": "p1.png"}),
            json!({"query": "b"}),
        ]
        .into_iter()
        .map(|value| match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        })
        .collect();
        let collection = uniform_collection("rows".into(), rows).unwrap();
        assert_eq!(collection.schema(), ["query", "image_filename"]);
        assert_eq!(
            collection.records()[1].get("image_filename"),
            Some(&FieldValue::Null)
        );
    }

    #[test]
    fn accepted_extensions_are_case_insensitive() {
        let provider = SnapshotProvider::new(ProviderConfig::default()).with_shard_extensions(&["JSONL"]);
        assert!(provider.accepts("train/part.JSONL"));
        assert!(!provider.accepts("train/part.parquet"));
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Filesystem-based artifact store
//!
//! Layout under the store root:
//!
//! ```text
//! manifest.json                 step name -> entry
//! <k0k1>/<rest of key>/         one directory per entry
//!     entry.json                CachedEntry
//!     artifact.json | <step>.png
//!     <step>.csv                optional handoff file
//! .tmp/                         entries being written
//! .scratch/                     per-step working directories
//! ```
//!
//! Entries are written into `.tmp` and renamed into place, so a reader never
//! sees a partial entry and a failed step leaves nothing behind.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::{Cache, CacheStats, CachedEntry, HandoffFile, ManifestEntry, StoredArtifact};
use crate::artifact::Artifact;
use crate::bridge::CodecKind;
use crate::errors::SvmflowError;
use crate::transforms::copy_file;

const ENTRY_FILE: &str = "entry.json";
const MANIFEST_FILE: &str = "manifest.json";
const TMP_DIR: &str = ".tmp";
const SCRATCH_DIR: &str = ".scratch";

fn cache_error(what: &str, e: impl std::fmt::Display) -> SvmflowError {
    SvmflowError::CacheError {
        message: format!("{}: {}", what, e),
    }
}

/// Filesystem-based artifact store
pub struct ArtifactStore {
    /// Store root
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) a store at `root`
    pub fn new(root: PathBuf) -> Result<Self, SvmflowError> {
        if !root.exists() {
            std::fs::create_dir_all(&root)
                .map_err(|e| cache_error("Failed to create store directory", e))?;
        }

        Ok(Self { root })
    }

    /// Open an existing store without creating it
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get directory for a cache entry
    fn entry_dir(&self, key: &str) -> PathBuf {
        // Use first 2 chars as directory for better filesystem performance
        let (prefix, rest) = key.split_at(2.min(key.len()));
        self.root.join(prefix).join(rest)
    }

    /// Working directory for a step run
    pub fn scratch_dir(&self, step: &str) -> PathBuf {
        self.root.join(SCRATCH_DIR).join(step)
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Read the build manifest; a missing manifest is empty
    pub fn manifest(&self) -> Result<BTreeMap<String, ManifestEntry>, SvmflowError> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| cache_error("Failed to read manifest", e))?;
        serde_json::from_str(&content).map_err(|e| cache_error("Failed to parse manifest", e))
    }

    fn write_manifest(&self, manifest: &BTreeMap<String, ManifestEntry>) -> Result<(), SvmflowError> {
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| cache_error("Failed to serialize manifest", e))?;

        let tmp = self.root.join(format!("{}.{}", MANIFEST_FILE, std::process::id()));
        std::fs::write(&tmp, json).map_err(|e| cache_error("Failed to write manifest", e))?;
        std::fs::rename(&tmp, self.manifest_path())
            .map_err(|e| cache_error("Failed to replace manifest", e))
    }

    fn manifest_entry(&self, name: &str) -> Result<ManifestEntry, SvmflowError> {
        let manifest = self.manifest()?;
        manifest.get(name).cloned().ok_or_else(|| {
            let known: Vec<String> = manifest.keys().cloned().collect();
            SvmflowError::unknown_artifact(name, &known)
        })
    }

    /// Materialized path of the artifact last built for step `name`
    pub fn path_of(&self, name: &str) -> Result<PathBuf, SvmflowError> {
        Ok(self.manifest_entry(name)?.path)
    }

    /// Load the artifact last built for step `name`
    pub fn load(&self, name: &str) -> Result<Artifact, SvmflowError> {
        let entry = self.manifest_entry(name)?;
        let stored = self.read_entry(&entry.key)?.ok_or_else(|| SvmflowError::CacheError {
            message: format!(
                "Manifest points '{}' at entry {}, which is missing; run the pipeline again",
                name, entry.key
            ),
        })?;
        Ok(stored.artifact)
    }

    /// Copy the materialized bytes of step `name` to `dest`
    pub fn export(&self, name: &str, dest: &Path) -> Result<PathBuf, SvmflowError> {
        copy_file(&self.path_of(name)?, dest)
    }

    fn read_entry(&self, key: &str) -> Result<Option<StoredArtifact>, SvmflowError> {
        let dir = self.entry_dir(key);
        let meta = dir.join(ENTRY_FILE);
        if !meta.exists() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(&meta).map_err(|e| cache_error("Failed to read cache entry", e))?;
        let entry: CachedEntry =
            serde_json::from_str(&content).map_err(|e| cache_error("Failed to parse cache entry", e))?;

        let file = dir.join(&entry.file);
        if !file.exists() {
            return Err(cache_error(
                "Cache entry is incomplete",
                format!("{} is missing", file.display()),
            ));
        }

        let artifact = match entry.codec {
            // Stored files are served in place
            CodecKind::CopyFile => Artifact::File(file),
            codec => {
                let bytes =
                    std::fs::read(&file).map_err(|e| cache_error("Failed to read artifact", e))?;
                codec
                    .decoder()
                    .decode(&bytes, &file)
                    .map_err(|e| cache_error("Failed to decode artifact", e))?
            }
        };

        if artifact.kind() != entry.kind {
            return Err(cache_error(
                "Cache entry is inconsistent",
                format!("expected a {}, found a {}", entry.kind, artifact.kind()),
            ));
        }

        Ok(Some(StoredArtifact {
            entry,
            dir,
            artifact,
        }))
    }

    /// List all cache entries
    pub fn list_entries(&self) -> Result<Vec<CachedEntry>, SvmflowError> {
        let mut entries = Vec::new();

        if !self.root.exists() {
            return Ok(entries);
        }

        for prefix_dir in std::fs::read_dir(&self.root)
            .map_err(|e| cache_error("Failed to read store directory", e))?
        {
            let prefix_dir = prefix_dir
                .map_err(|e| cache_error("Failed to read store entry", e))?
                .path();

            let hidden = prefix_dir
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| n.starts_with('.'));
            if hidden || !prefix_dir.is_dir() {
                continue;
            }

            for entry_dir in std::fs::read_dir(&prefix_dir)
                .map_err(|e| cache_error("Failed to read store subdirectory", e))?
            {
                let meta = entry_dir
                    .map_err(|e| cache_error("Failed to read store subdirectory", e))?
                    .path()
                    .join(ENTRY_FILE);

                // Unreadable entries are skipped here and rebuilt on demand
                if let Ok(content) = std::fs::read_to_string(&meta) {
                    if let Ok(entry) = serde_json::from_str::<CachedEntry>(&content) {
                        entries.push(entry);
                    }
                }
            }
        }

        entries.sort_by(|a, b| a.step_name.cmp(&b.step_name).then(a.timestamp.cmp(&b.timestamp)));
        Ok(entries)
    }

    /// Calculate directory size recursively
    fn dir_size(path: &Path) -> Result<u64, SvmflowError> {
        let mut size = 0;

        if path.is_file() {
            return Ok(path.metadata().map(|m| m.len()).unwrap_or(0));
        }

        for entry in std::fs::read_dir(path).map_err(|e| cache_error("Failed to read directory", e))? {
            let entry = entry.map_err(|e| cache_error("Failed to read entry", e))?;

            let path = entry.path();
            if path.is_dir() {
                size += Self::dir_size(&path)?;
            } else {
                size += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        Ok(size)
    }
}

#[async_trait]
impl Cache for ArtifactStore {
    async fn get(&self, key: &str) -> Result<Option<StoredArtifact>, SvmflowError> {
        self.read_entry(key)
    }

    async fn store(
        &self,
        step: &str,
        key: &str,
        artifact: &Artifact,
        encoder: Option<CodecKind>,
    ) -> Result<StoredArtifact, SvmflowError> {
        let codec = CodecKind::default_for(artifact.kind());
        let file = match codec {
            CodecKind::CopyFile => format!("{}.{}", step, codec.encoder().extension(artifact)),
            _ => "artifact.json".to_string(),
        };

        let tmp = self
            .root
            .join(TMP_DIR)
            .join(format!("{}.{}", key, std::process::id()));
        if tmp.exists() {
            tokio::fs::remove_dir_all(&tmp)
                .await
                .map_err(|e| cache_error("Failed to clear temporary entry", e))?;
        }
        tokio::fs::create_dir_all(&tmp)
            .await
            .map_err(|e| cache_error("Failed to create temporary entry", e))?;

        let bytes = codec.encoder().encode(artifact)?;
        tokio::fs::write(tmp.join(&file), bytes)
            .await
            .map_err(|e| cache_error("Failed to write artifact", e))?;

        let handoff = match encoder.filter(|&e| e != codec) {
            Some(kind) => {
                let handoff_file = format!("{}.{}", step, kind.encoder().extension(artifact));
                let bytes = kind.encoder().encode(artifact)?;
                tokio::fs::write(tmp.join(&handoff_file), bytes)
                    .await
                    .map_err(|e| cache_error("Failed to write handoff file", e))?;
                Some(HandoffFile {
                    codec: kind,
                    file: handoff_file,
                })
            }
            None => None,
        };

        let entry = CachedEntry {
            timestamp: SystemTime::now(),
            step_name: step.to_string(),
            cache_key: key.to_string(),
            kind: artifact.kind(),
            codec,
            file,
            handoff,
        };
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| cache_error("Failed to serialize cache entry", e))?;
        tokio::fs::write(tmp.join(ENTRY_FILE), json)
            .await
            .map_err(|e| cache_error("Failed to write cache entry", e))?;

        let dir = self.entry_dir(key);
        let intact = dir.exists() && matches!(self.read_entry(key), Ok(Some(_)));
        if intact {
            // Written once: an identical entry is already in place
            tokio::fs::remove_dir_all(&tmp)
                .await
                .map_err(|e| cache_error("Failed to remove temporary entry", e))?;
        } else {
            if dir.exists() {
                tracing::warn!(key = %key, "replacing damaged cache entry");
                tokio::fs::remove_dir_all(&dir)
                    .await
                    .map_err(|e| cache_error("Failed to remove damaged entry", e))?;
            }
            if let Some(parent) = dir.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| cache_error("Failed to create cache directory", e))?;
            }
            tokio::fs::rename(&tmp, &dir)
                .await
                .map_err(|e| cache_error("Failed to move entry into place", e))?;
        }

        self.read_entry(key)?.ok_or_else(|| SvmflowError::CacheError {
            message: format!("Entry {} vanished after being written", key),
        })
    }

    async fn invalidate(&self, key: &str) -> Result<(), SvmflowError> {
        let dir = self.entry_dir(key);

        if dir.exists() {
            tokio::fs::remove_dir_all(&dir)
                .await
                .map_err(|e| cache_error("Failed to remove cache entry", e))?;
        }

        Ok(())
    }

    async fn record(&self, step: &str, stored: &StoredArtifact) -> Result<(), SvmflowError> {
        let mut manifest = self.manifest()?;
        manifest.insert(
            step.to_string(),
            ManifestEntry {
                key: stored.entry.cache_key.clone(),
                kind: stored.entry.kind,
                codec: stored
                    .entry
                    .handoff
                    .as_ref()
                    .map_or(stored.entry.codec, |h| h.codec),
                path: stored.materialized_path(),
            },
        );
        self.write_manifest(&manifest)
    }

    async fn forget(&self, step: &str) -> Result<(), SvmflowError> {
        let mut manifest = self.manifest()?;
        if manifest.remove(step).is_some() {
            self.write_manifest(&manifest)?;
        }
        Ok(())
    }

    fn scratch_dir(&self, step: &str) -> PathBuf {
        ArtifactStore::scratch_dir(self, step)
    }

    async fn clear(&self) -> Result<(), SvmflowError> {
        if self.root.exists() {
            tokio::fs::remove_dir_all(&self.root)
                .await
                .map_err(|e| cache_error("Failed to clear store", e))?;

            tokio::fs::create_dir_all(&self.root)
                .await
                .map_err(|e| cache_error("Failed to recreate store directory", e))?;
        }

        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, SvmflowError> {
        let entries = self.list_entries()?;

        let mut stats = CacheStats {
            entries: entries.len(),
            size_bytes: 0,
            oldest_entry: entries.iter().map(|e| e.timestamp).min(),
            newest_entry: entries.iter().map(|e| e.timestamp).max(),
        };

        if self.root.exists() {
            stats.size_bytes = Self::dir_size(&self.root)?;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::frame::{Column, DataFrame};
    use tempfile::TempDir;

    fn store() -> (TempDir, ArtifactStore) {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("store")).unwrap();
        (temp, store)
    }

    fn frame() -> Artifact {
        Artifact::Frame(
            DataFrame::new(vec![
                Column::factor("truth", vec!["0".into(), "1".into()], vec![0, 1]),
                Column::numeric("estimate", vec![0.0, 0.0]),
            ])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let (_temp, store) = store();

        store.store("evaluation_df", "abcdef", &frame(), None).await.unwrap();
        let cached = store.get("abcdef").await.unwrap().unwrap();

        // JSON keeps the factor column intact
        assert_eq!(cached.artifact, frame());
        assert_eq!(cached.entry.codec, CodecKind::Json);
        assert!(store.root().join("ab").join("cdef").join("entry.json").exists());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let (_temp, store) = store();
        assert!(store.get("0123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_handoff_file_written() {
        let (_temp, store) = store();
        let stored = store
            .store("evaluation_df", "abcdef", &frame(), Some(CodecKind::Csv))
            .await
            .unwrap();

        let handoff = stored.materialized_path();
        assert_eq!(handoff.file_name().unwrap(), "evaluation_df.csv");
        let csv = std::fs::read_to_string(handoff).unwrap();
        assert!(csv.starts_with("truth,estimate\n"));
    }

    #[tokio::test]
    async fn test_file_artifacts_are_copied_in() {
        let (temp, store) = store();
        let src = temp.path().join("plot.png");
        std::fs::write(&src, b"\x89PNG").unwrap();

        let stored = store
            .store("cm_plot", "ffee00", &Artifact::File(src), None)
            .await
            .unwrap();

        let path = stored.artifact.as_file().unwrap();
        assert!(path.starts_with(store.root()));
        assert_eq!(path.file_name().unwrap(), "cm_plot.png");
        assert_eq!(std::fs::read(path).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_manifest_load_and_path_of() {
        let (_temp, store) = store();
        let stored = store
            .store("accuracy", "aa11", &Artifact::Scalar(0.75), None)
            .await
            .unwrap();
        store.record("accuracy", &stored).await.unwrap();

        assert_eq!(store.load("accuracy").unwrap(), Artifact::Scalar(0.75));
        assert!(store.path_of("accuracy").unwrap().ends_with("artifact.json"));
        assert_eq!(store.manifest().unwrap()["accuracy"].kind, ArtifactKind::Scalar);
    }

    #[tokio::test]
    async fn test_unknown_artifact_lists_known_names() {
        let (_temp, store) = store();
        let stored = store
            .store("accuracy", "aa11", &Artifact::Scalar(0.75), None)
            .await
            .unwrap();
        store.record("accuracy", &stored).await.unwrap();

        match store.load("nope").unwrap_err() {
            SvmflowError::UnknownArtifact { name, help } => {
                assert_eq!(name, "nope");
                assert!(help.unwrap().contains("accuracy"));
            }
            other => panic!("Expected UnknownArtifact, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forget_removes_from_manifest() {
        let (_temp, store) = store();
        let stored = store
            .store("accuracy", "aa11", &Artifact::Scalar(0.75), None)
            .await
            .unwrap();
        store.record("accuracy", &stored).await.unwrap();
        store.forget("accuracy").await.unwrap();

        assert!(store.manifest().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error() {
        let (_temp, store) = store();
        let stored = store
            .store("accuracy", "aa11", &Artifact::Scalar(0.75), None)
            .await
            .unwrap();
        std::fs::write(stored.dir.join("artifact.json"), "{").unwrap();

        assert!(store.get("aa11").await.is_err());
    }

    #[tokio::test]
    async fn test_store_replaces_entry_without_metadata() {
        let (_temp, store) = store();
        let stored = store
            .store("accuracy", "aa11", &Artifact::Scalar(0.75), None)
            .await
            .unwrap();
        std::fs::remove_file(stored.dir.join(ENTRY_FILE)).unwrap();
        assert!(store.get("aa11").await.unwrap().is_none());

        let rebuilt = store
            .store("accuracy", "aa11", &Artifact::Scalar(0.75), None)
            .await
            .unwrap();
        assert_eq!(rebuilt.artifact, Artifact::Scalar(0.75));
        assert!(rebuilt.dir.join(ENTRY_FILE).exists());
    }

    #[tokio::test]
    async fn test_store_replaces_incomplete_entry() {
        let (_temp, store) = store();
        let stored = store
            .store("accuracy", "aa11", &Artifact::Scalar(0.75), None)
            .await
            .unwrap();
        std::fs::remove_file(stored.dir.join("artifact.json")).unwrap();

        let rebuilt = store
            .store("accuracy", "aa11", &Artifact::Scalar(0.75), None)
            .await
            .unwrap();
        assert_eq!(store.get("aa11").await.unwrap().unwrap().artifact, rebuilt.artifact);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let (_temp, store) = store();
        store.store("a", "aa11", &Artifact::Scalar(1.0), None).await.unwrap();
        store.store("b", "bb22", &Artifact::Scalar(2.0), None).await.unwrap();

        assert_eq!(store.stats().await.unwrap().entries, 2);

        store.invalidate("aa11").await.unwrap();
        assert!(store.get("aa11").await.unwrap().is_none());

        store.clear().await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entries, 0);
    }
}

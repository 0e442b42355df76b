// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Content-addressed artifact store
//!
//! Every built artifact lives under the hash of everything that went into
//! it, so an unchanged step is never rebuilt. A manifest maps step names to
//! the entry built for them most recently.

mod filesystem;
mod hash;

pub use filesystem::ArtifactStore;
pub use hash::ContentHasher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::artifact::{Artifact, ArtifactKind};
use crate::bridge::CodecKind;
use crate::errors::SvmflowError;

/// Trait for artifact caches
#[async_trait]
pub trait Cache: Send + Sync {
    /// Load the artifact stored under `key`, if complete
    async fn get(&self, key: &str) -> Result<Option<StoredArtifact>, SvmflowError>;

    /// Persist `artifact` under `key`; `encoder` adds an extra handoff file
    async fn store(
        &self,
        step: &str,
        key: &str,
        artifact: &Artifact,
        encoder: Option<CodecKind>,
    ) -> Result<StoredArtifact, SvmflowError>;

    /// Remove the entry for `key`
    async fn invalidate(&self, key: &str) -> Result<(), SvmflowError>;

    /// Point the manifest's `step` at a stored artifact
    async fn record(&self, step: &str, stored: &StoredArtifact) -> Result<(), SvmflowError>;

    /// Drop `step` from the manifest
    async fn forget(&self, step: &str) -> Result<(), SvmflowError>;

    /// Working directory for a step run; never part of an entry
    fn scratch_dir(&self, step: &str) -> PathBuf;

    /// Clear all cached results
    async fn clear(&self) -> Result<(), SvmflowError>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats, SvmflowError>;
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cached entries
    pub entries: usize,
    /// Total size in bytes
    pub size_bytes: u64,
    /// Oldest entry timestamp
    pub oldest_entry: Option<SystemTime>,
    /// Newest entry timestamp
    pub newest_entry: Option<SystemTime>,
}

impl CacheStats {
    /// Format size for display
    pub fn formatted_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if self.size_bytes >= GB {
            format!("{:.2} GB", self.size_bytes as f64 / GB as f64)
        } else if self.size_bytes >= MB {
            format!("{:.2} MB", self.size_bytes as f64 / MB as f64)
        } else if self.size_bytes >= KB {
            format!("{:.2} KB", self.size_bytes as f64 / KB as f64)
        } else {
            format!("{} bytes", self.size_bytes)
        }
    }
}

/// Metadata written next to every stored artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// When the entry was written
    pub timestamp: SystemTime,
    /// Step that produced it
    pub step_name: String,
    /// Cache key (content hash)
    pub cache_key: String,
    pub kind: ArtifactKind,
    /// Lossless codec of the artifact file
    pub codec: CodecKind,
    /// Artifact file name within the entry directory
    pub file: String,
    /// Extra file written by the step's declared encoder
    #[serde(default)]
    pub handoff: Option<HandoffFile>,
}

/// Output of a step's declared encoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffFile {
    pub codec: CodecKind,
    pub file: String,
}

/// An artifact together with where it lives in the store
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub entry: CachedEntry,
    /// Entry directory
    pub dir: PathBuf,
    /// The artifact; file artifacts point into the entry directory
    pub artifact: Artifact,
}

impl StoredArtifact {
    /// Path of the file a reader should look at: the handoff output when the
    /// step declared an encoder, the artifact file otherwise
    pub fn materialized_path(&self) -> PathBuf {
        match &self.entry.handoff {
            Some(handoff) => self.dir.join(&handoff.file),
            None => self.dir.join(&self.entry.file),
        }
    }
}

/// One line of the build manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub key: String,
    pub kind: ArtifactKind,
    pub codec: CodecKind,
    pub path: PathBuf,
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Content hashing for cache keys
//!
//! Uses BLAKE3 for fast, secure content hashing.

use blake3::Hasher;
use std::path::Path;

use crate::errors::SvmflowError;
use crate::pipeline::{Settings, Step};

/// Content hasher for generating cache keys
pub struct ContentHasher {
    hasher: Hasher,
}

impl ContentHasher {
    /// Create a new content hasher
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
        }
    }

    /// Hash a step definition, the pipeline settings, the keys of its
    /// dependencies (in declared order) and any source files it reads
    pub fn hash_step(
        mut self,
        step: &Step,
        settings: &Settings,
        dependency_keys: &[String],
        base_dir: &Path,
    ) -> Result<String, SvmflowError> {
        // Description and dependency names are covered by the keys below
        let definition = serde_json::json!({
            "name": step.name,
            "runtime": step.runtime,
            "transform": step.transform,
            "encoder": step.encoder,
            "decoder": step.decoder,
        });
        self.update_json("step definition", &definition)?;
        self.update_json("settings", settings)?;

        for key in dependency_keys {
            self.update(key.as_bytes());
        }

        for file in step.transform.source_files(base_dir) {
            self.hash_file(&file)?;
        }

        Ok(self.finalize())
    }

    fn update_json<T: serde::Serialize>(&mut self, what: &str, value: &T) -> Result<(), SvmflowError> {
        let json = serde_json::to_string(value).map_err(|e| SvmflowError::CacheError {
            message: format!("Failed to serialize {}: {}", what, e),
        })?;
        self.hasher.update(json.as_bytes());
        // Field separator so adjacent values cannot run together
        self.hasher.update(&[0]);
        Ok(())
    }

    /// Hash a single file's contents
    pub fn hash_file(&mut self, path: &Path) -> Result<(), SvmflowError> {
        if !path.exists() {
            return Ok(()); // Don't fail on missing files - the step reports them
        }

        let content = std::fs::read(path).map_err(|e| SvmflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        self.hasher.update(&content);
        Ok(())
    }

    /// Hash arbitrary bytes
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalize and get the hash
    pub fn finalize(self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Runtime;
    use crate::transforms::Transform;
    use tempfile::TempDir;

    fn read_step() -> Step {
        Step {
            name: "raw_df".into(),
            description: None,
            runtime: Runtime::Ds,
            transform: Transform::ReadDataset {
                path: "heart.csv".into(),
            },
            depends_on: vec![],
            encoder: None,
            decoder: None,
        }
    }

    fn key(step: &Step, settings: &Settings, deps: &[String], dir: &Path) -> String {
        ContentHasher::new().hash_step(step, settings, deps, dir).unwrap()
    }

    #[test]
    fn test_hasher_consistent() {
        let mut hasher1 = ContentHasher::new();
        hasher1.update(b"test data");
        let hash1 = hasher1.finalize();

        let mut hasher2 = ContentHasher::new();
        hasher2.update(b"test data");
        let hash2 = hasher2.finalize();

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_dataset_contents_change_the_key() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::default();
        std::fs::write(temp.path().join("heart.csv"), "age,target\n1,0\n").unwrap();
        let before = key(&read_step(), &settings, &[], temp.path());

        std::fs::write(temp.path().join("heart.csv"), "age,target\n2,0\n").unwrap();
        let after = key(&read_step(), &settings, &[], temp.path());

        assert_ne!(before, after);
    }

    #[test]
    fn test_seed_changes_the_key() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::default();
        let reseeded = Settings {
            seed: 7,
            ..Settings::default()
        };

        assert_ne!(
            key(&read_step(), &settings, &[], temp.path()),
            key(&read_step(), &reseeded, &[], temp.path())
        );
    }

    #[test]
    fn test_description_does_not_change_the_key() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::default();
        let mut described = read_step();
        described.description = Some("Load the data".into());

        assert_eq!(
            key(&read_step(), &settings, &[], temp.path()),
            key(&described, &settings, &[], temp.path())
        );
    }

    #[test]
    fn test_dependency_order_matters() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::default();
        let step = read_step();
        let a = vec!["k1".to_string(), "k2".to_string()];
        let b = vec!["k2".to_string(), "k1".to_string()];

        assert_ne!(
            key(&step, &settings, &a, temp.path()),
            key(&step, &settings, &b, temp.path())
        );
    }
}

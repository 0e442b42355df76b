// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Byte-for-byte codec for rendered files

use std::path::Path;

use super::{Decoder, Encoder};
use crate::artifact::{Artifact, ArtifactKind};
use crate::errors::{SvmflowError, SvmflowResult};

/// File artifacts travel as their raw bytes
pub struct CopyFileCodec;

impl Encoder for CopyFileCodec {
    fn accepts(&self, kind: ArtifactKind) -> bool {
        kind == ArtifactKind::File
    }

    fn encode(&self, artifact: &Artifact) -> SvmflowResult<Vec<u8>> {
        let path = artifact.as_file()?;
        std::fs::read(path).map_err(|e| SvmflowError::FileReadError {
            path: path.clone(),
            error: e.to_string(),
        })
    }

    fn extension(&self, artifact: &Artifact) -> String {
        artifact
            .as_file()
            .ok()
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_string()
    }
}

impl Decoder for CopyFileCodec {
    fn output_kind(&self) -> Option<ArtifactKind> {
        Some(ArtifactKind::File)
    }

    fn decode(&self, bytes: &[u8], materialize_at: &Path) -> SvmflowResult<Artifact> {
        if let Some(parent) = materialize_at.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(materialize_at, bytes).map_err(|e| SvmflowError::FileWriteError {
            path: materialize_at.to_path_buf(),
            error: e.to_string(),
        })?;
        Ok(Artifact::File(materialize_at.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_are_materialized() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("cm.png");
        std::fs::write(&src, b"\x89PNG-bytes").unwrap();
        let artifact = Artifact::File(src);

        assert_eq!(CopyFileCodec.extension(&artifact), "png");
        let bytes = CopyFileCodec.encode(&artifact).unwrap();

        let dst = temp.path().join("consumer/cm.png");
        let decoded = CopyFileCodec.decode(&bytes, &dst).unwrap();

        assert_eq!(decoded, Artifact::File(dst.clone()));
        assert_eq!(std::fs::read(dst).unwrap(), b"\x89PNG-bytes");
    }

    #[test]
    fn test_missing_file_cannot_be_encoded() {
        let artifact = Artifact::File("/nonexistent/plot.png".into());
        assert!(CopyFileCodec.encode(&artifact).is_err());
    }
}

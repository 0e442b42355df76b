// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Cross-runtime bridge
//!
//! Artifacts never cross from one runtime to another in memory. The producer's
//! encoder turns the artifact into bytes, the consumer's decoder turns those
//! bytes back into an artifact. The same codecs persist artifacts in the store.

mod csv;
mod file;
mod json;

pub use self::csv::CsvCodec;
pub use self::file::CopyFileCodec;
pub use self::json::JsonCodec;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::artifact::{Artifact, ArtifactKind};
use crate::errors::SvmflowResult;

/// Turns an artifact into bytes
pub trait Encoder: Send + Sync {
    /// Whether artifacts of `kind` can be encoded
    fn accepts(&self, kind: ArtifactKind) -> bool;

    /// Encode the artifact
    fn encode(&self, artifact: &Artifact) -> SvmflowResult<Vec<u8>>;

    /// File extension for the encoded bytes
    fn extension(&self, artifact: &Artifact) -> String;
}

/// Turns bytes back into an artifact
pub trait Decoder: Send + Sync {
    /// Kind of artifact produced, `None` when it depends on the bytes
    fn output_kind(&self) -> Option<ArtifactKind>;

    /// Decode the bytes. Codecs producing files materialize them at
    /// `materialize_at`, a path owned by the consuming step.
    fn decode(&self, bytes: &[u8], materialize_at: &Path) -> SvmflowResult<Artifact>;
}

/// Codec names usable as `encoder:` / `decoder:` in a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    /// Frame as CSV
    Csv,
    /// Any in-memory artifact as JSON
    Json,
    /// A rendered file, byte for byte
    CopyFile,
}

impl CodecKind {
    pub fn encoder(&self) -> &'static dyn Encoder {
        match self {
            Self::Csv => &CsvCodec,
            Self::Json => &JsonCodec,
            Self::CopyFile => &CopyFileCodec,
        }
    }

    pub fn decoder(&self) -> &'static dyn Decoder {
        match self {
            Self::Csv => &CsvCodec,
            Self::Json => &JsonCodec,
            Self::CopyFile => &CopyFileCodec,
        }
    }

    /// Lossless codec used to persist an artifact of `kind`
    pub fn default_for(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::File => Self::CopyFile,
            _ => Self::Json,
        }
    }

    /// Whether bytes from `self` can be decoded by `decoder`
    pub fn compatible_with(&self, decoder: CodecKind) -> bool {
        *self == decoder
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
            Self::CopyFile => write!(f, "copy_file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_acceptance() {
        assert!(CodecKind::Csv.encoder().accepts(ArtifactKind::Frame));
        assert!(!CodecKind::Csv.encoder().accepts(ArtifactKind::Model));
        assert!(CodecKind::Json.encoder().accepts(ArtifactKind::Model));
        assert!(!CodecKind::Json.encoder().accepts(ArtifactKind::File));
        assert!(CodecKind::CopyFile.encoder().accepts(ArtifactKind::File));
    }

    #[test]
    fn test_decoder_output_kinds() {
        assert_eq!(CodecKind::Csv.decoder().output_kind(), Some(ArtifactKind::Frame));
        assert_eq!(CodecKind::Json.decoder().output_kind(), None);
        assert_eq!(CodecKind::CopyFile.decoder().output_kind(), Some(ArtifactKind::File));
    }

    #[test]
    fn test_default_codecs_are_lossless() {
        assert_eq!(CodecKind::default_for(ArtifactKind::Frame), CodecKind::Json);
        assert_eq!(CodecKind::default_for(ArtifactKind::File), CodecKind::CopyFile);
    }

    #[test]
    fn test_parse_codec_names() {
        let kind: CodecKind = serde_yaml::from_str("copy_file").unwrap();
        assert_eq!(kind, CodecKind::CopyFile);
        assert_eq!(kind.to_string(), "copy_file");
    }
}

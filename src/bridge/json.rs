// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! JSON codec for in-memory artifacts

use std::path::Path;

use super::{Decoder, Encoder};
use crate::artifact::{Artifact, ArtifactKind};
use crate::errors::{SvmflowError, SvmflowResult};

/// Any artifact except files, tagged with its kind
pub struct JsonCodec;

impl Encoder for JsonCodec {
    fn accepts(&self, kind: ArtifactKind) -> bool {
        kind != ArtifactKind::File
    }

    fn encode(&self, artifact: &Artifact) -> SvmflowResult<Vec<u8>> {
        if !self.accepts(artifact.kind()) {
            return Err(SvmflowError::schema(format!(
                "a {} artifact cannot be encoded as JSON; use copy_file",
                artifact.kind()
            )));
        }
        Ok(serde_json::to_vec_pretty(artifact)?)
    }

    fn extension(&self, _artifact: &Artifact) -> String {
        "json".to_string()
    }
}

impl Decoder for JsonCodec {
    fn output_kind(&self) -> Option<ArtifactKind> {
        None
    }

    fn decode(&self, bytes: &[u8], _materialize_at: &Path) -> SvmflowResult<Artifact> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

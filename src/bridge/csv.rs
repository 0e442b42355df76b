// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! CSV codec for frames

use std::path::Path;

use super::{Decoder, Encoder};
use crate::artifact::{Artifact, ArtifactKind};
use crate::errors::SvmflowResult;
use crate::frame::{read_csv_bytes, to_csv_bytes};

/// Frame ↔ CSV. Factor columns are written as their level text and come
/// back as plain numeric or text columns.
pub struct CsvCodec;

impl Encoder for CsvCodec {
    fn accepts(&self, kind: ArtifactKind) -> bool {
        kind == ArtifactKind::Frame
    }

    fn encode(&self, artifact: &Artifact) -> SvmflowResult<Vec<u8>> {
        to_csv_bytes(artifact.as_frame()?)
    }

    fn extension(&self, _artifact: &Artifact) -> String {
        "csv".to_string()
    }
}

impl Decoder for CsvCodec {
    fn output_kind(&self) -> Option<ArtifactKind> {
        Some(ArtifactKind::Frame)
    }

    fn decode(&self, bytes: &[u8], _materialize_at: &Path) -> SvmflowResult<Artifact> {
        Ok(Artifact::Frame(read_csv_bytes(bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, DataFrame};

    #[test]
    fn test_factor_columns_are_narrowed() {
        let df = DataFrame::new(vec![
            Column::factor("truth", vec!["0".into(), "1".into()], vec![1, 0]),
            Column::text("note", vec!["a".into(), "b".into()]),
        ])
        .unwrap();

        let bytes = CsvCodec.encode(&Artifact::Frame(df)).unwrap();
        let decoded = CsvCodec.decode(&bytes, Path::new("unused")).unwrap();
        let frame = decoded.as_frame().unwrap();

        assert!(frame.column("truth").unwrap().is_numeric());
        assert_eq!(frame.column("truth").unwrap().as_f64().unwrap(), vec![1.0, 0.0]);
        assert_eq!(frame.column("note").unwrap().type_name(), "text");
    }

    #[test]
    fn test_rejects_non_frames() {
        assert!(CsvCodec.encode(&Artifact::Scalar(0.5)).is_err());
    }
}

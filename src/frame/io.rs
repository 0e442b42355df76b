// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! CSV reading and writing for data frames

use polars::prelude::{
    CsvReadOptions, CsvWriter, LazyCsvReader, LazyFileListReader, SerReader, SerWriter,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::DataFrame;
use crate::errors::{SvmflowError, SvmflowResult};

/// Rows polars looks at before settling a column's type
const INFER_SCHEMA_ROWS: usize = 10_000;

fn csv_error(e: impl std::fmt::Display) -> SvmflowError {
    SvmflowError::Csv {
        message: e.to_string(),
    }
}

/// Read a CSV file with a header row. A column is numeric when every
/// non-empty cell parses as a number; anything else stays text.
pub fn read_csv(path: &Path) -> SvmflowResult<DataFrame> {
    if !path.exists() {
        return Err(SvmflowError::FileNotFound {
            path: path.to_path_buf(),
            help: None,
        });
    }

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| csv_error(format!("{}: {}", path.display(), e)))?;

    DataFrame::from_polars(df)
}

/// Parse CSV bytes with the same inference rules as [`read_csv`]
pub fn read_csv_bytes(bytes: &[u8]) -> SvmflowResult<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(csv_error)?;

    DataFrame::from_polars(df)
}

/// Serialize a frame to CSV bytes (header row, no index column). Factor
/// columns are written as their level text.
pub fn to_csv_bytes(df: &DataFrame) -> SvmflowResult<Vec<u8>> {
    let mut table = df.to_polars()?;
    let mut buf = Vec::new();

    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut table)
        .map_err(csv_error)?;

    Ok(buf)
}

/// Directory `write_to_csv` has to create first, if any. A bare file name
/// has none.
fn parent_to_create(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Write a frame to exactly `path` (no extension is added), creating parent
/// directories when the path has any
pub fn write_to_csv(df: &DataFrame, path: &Path) -> SvmflowResult<PathBuf> {
    if let Some(parent) = parent_to_create(path) {
        std::fs::create_dir_all(parent).map_err(|e| SvmflowError::FileWriteError {
            path: parent.to_path_buf(),
            error: e.to_string(),
        })?;
    }

    let bytes = to_csv_bytes(df)?;
    std::fs::write(path, bytes).map_err(|e| SvmflowError::FileWriteError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, ColumnData};
    use tempfile::TempDir;

    #[test]
    fn test_read_infers_column_types() {
        let df = read_csv_bytes(b"age,sex,target\n63,M,1\n41,F,0\n").unwrap();

        assert_eq!(df.n_rows(), 2);
        assert!(df.column("age").unwrap().is_numeric());
        assert!(matches!(df.column("sex").unwrap().data, ColumnData::Text { .. }));
    }

    #[test]
    fn test_empty_cells_become_nan() {
        let df = read_csv_bytes(b"chol,sex\n200.5,M\n,F\n").unwrap();
        let chol = df.column("chol").unwrap().as_f64().unwrap();
        assert_eq!(chol[0], 200.5);
        assert!(chol[1].is_nan());
    }

    #[test]
    fn test_write_then_read_keeps_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let df = DataFrame::new(vec![
            Column::numeric("a", vec![1.5, 2.5]),
            Column::integer("n", vec![3, -1]),
            Column::text("b", vec!["x".into(), "y".into()]),
        ])
        .unwrap();

        let written = write_to_csv(&df, &path).unwrap();
        assert_eq!(written, path);

        let back = read_csv(&path).unwrap();
        assert_eq!(back, df);
    }

    #[test]
    fn test_bare_file_name_has_no_parent_to_create() {
        assert_eq!(parent_to_create(Path::new("file.csv")), None);
        assert_eq!(
            parent_to_create(Path::new("out/file.csv")),
            Some(Path::new("out"))
        );
    }

    #[test]
    fn test_factor_written_as_levels() {
        let df = DataFrame::new(vec![Column::factor(
            "truth",
            vec!["0".into(), "1".into()],
            vec![1, 0, 1],
        )])
        .unwrap();

        let text = String::from_utf8(to_csv_bytes(&df).unwrap()).unwrap();
        assert_eq!(text, "truth\n1\n0\n1\n");
    }

    #[test]
    fn test_integers_written_without_fraction() {
        let df = DataFrame::new(vec![Column::integer("estimate", vec![0, 1])]).unwrap();
        let text = String::from_utf8(to_csv_bytes(&df).unwrap()).unwrap();
        assert_eq!(text, "estimate\n0\n1\n");
    }

    #[test]
    fn test_missing_file() {
        let result = read_csv(Path::new("does_not_exist.csv"));
        assert!(matches!(result, Err(SvmflowError::FileNotFound { .. })));
    }

    #[test]
    fn test_rows_with_extra_fields_fail() {
        let result = read_csv_bytes(b"a,b\n1,2\n3,4,5\n");
        assert!(matches!(result, Err(SvmflowError::Csv { .. })));
    }
}

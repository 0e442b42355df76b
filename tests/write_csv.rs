// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Writing a frame to a path relative to the working directory. Kept in its
//! own test binary because it changes the process working directory.

use std::path::Path;

use svmflow::frame::{write_to_csv, Column, DataFrame};
use tempfile::TempDir;

#[test]
fn test_write_to_bare_file_name() {
    let temp = TempDir::new().unwrap();
    std::env::set_current_dir(temp.path()).unwrap();

    let df = DataFrame::new(vec![
        Column::integer("truth", vec![1, 0]),
        Column::integer("estimate", vec![1, 1]),
    ])
    .unwrap();

    let written = write_to_csv(&df, Path::new("file.csv")).unwrap();
    assert_eq!(written, Path::new("file.csv"));

    let content = std::fs::read_to_string(temp.path().join("file.csv")).unwrap();
    assert_eq!(content, "truth,estimate\n1,1\n0,1\n");
}

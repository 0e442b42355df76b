// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! File passthrough

use std::path::{Path, PathBuf};

use crate::errors::{SvmflowError, SvmflowResult};

/// Copy `src` to `dst` byte for byte, creating parent directories of `dst`
pub fn copy_file(src: &Path, dst: &Path) -> SvmflowResult<PathBuf> {
    if !src.is_file() {
        return Err(SvmflowError::FileNotFound {
            path: src.to_path_buf(),
            help: Some("The file to copy does not exist; was its producing step built?".into()),
        });
    }

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SvmflowError::FileWriteError {
            path: parent.to_path_buf(),
            error: e.to_string(),
        })?;
    }

    std::fs::copy(src, dst).map_err(|e| SvmflowError::FileWriteError {
        path: dst.to_path_buf(),
        error: e.to_string(),
    })?;

    Ok(dst.to_path_buf())
}

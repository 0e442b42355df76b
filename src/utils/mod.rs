// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Utility modules
//!
//! Common utilities for the svmflow CLI.

pub mod spinner;

pub use spinner::*;

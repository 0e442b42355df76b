// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Column-oriented tables
//!
//! A frame is a polars data frame plus factor metadata. Every polars column
//! holds one of four dtypes: `Float64`, `Int64`, `String`, or `UInt32` codes
//! of a factor whose sorted level set is kept next to the frame. [`Column`]
//! is the owned view transforms work with; it is also the JSON form of a
//! frame.

mod io;

pub use io::{read_csv, read_csv_bytes, to_csv_bytes, write_to_csv};

use polars::prelude as pl;
use polars::prelude::{ChunkVar, IntoLazy, NamedFrom};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{SvmflowError, SvmflowResult};

/// A table of equally long, uniquely named columns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "FrameRecord", try_from = "FrameRecord")]
pub struct DataFrame {
    inner: pl::DataFrame,
    /// Level sets of factor columns, by column name
    levels: BTreeMap<String, Vec<String>>,
}

impl DataFrame {
    /// Build a frame, checking column lengths, name uniqueness and that
    /// every factor code points at a level
    pub fn new(columns: Vec<Column>) -> SvmflowResult<Self> {
        let mut levels = BTreeMap::new();
        let mut series = Vec::with_capacity(columns.len());

        for column in columns {
            if let ColumnData::Factor { levels: l, codes } = &column.data {
                if let Some(code) = codes.iter().find(|&&c| c as usize >= l.len()) {
                    return Err(SvmflowError::schema(format!(
                        "factor column '{}' has code {} but only {} level(s)",
                        column.name,
                        code,
                        l.len()
                    )));
                }
                levels.insert(column.name.clone(), l.clone());
            }
            series.push(pl::Column::from(column.to_series()));
        }

        let inner = pl::DataFrame::new(series).map_err(|e| match e {
            pl::PolarsError::ShapeMismatch(msg) => SvmflowError::shape(msg.to_string()),
            pl::PolarsError::Duplicate(msg) => SvmflowError::schema(msg.to_string()),
            other => other.into(),
        })?;

        Ok(Self { inner, levels })
    }

    /// Adopt a frame produced by polars, narrowing every column to a
    /// float, integer or text column
    pub fn from_polars(df: pl::DataFrame) -> SvmflowResult<Self> {
        let columns = df
            .get_columns()
            .iter()
            .map(|column| {
                let series = column.as_materialized_series();
                let dtype = series.dtype();
                let target = if dtype.is_float() {
                    pl::DataType::Float64
                } else if dtype.is_integer() {
                    pl::DataType::Int64
                } else {
                    pl::DataType::String
                };
                Ok(pl::Column::from(series.cast(&target)?))
            })
            .collect::<SvmflowResult<Vec<_>>>()?;

        Ok(Self {
            inner: pl::DataFrame::new(columns)?,
            levels: BTreeMap::new(),
        })
    }

    /// The frame as polars sees it, with factor columns spelled out as
    /// their level text
    pub fn to_polars(&self) -> SvmflowResult<pl::DataFrame> {
        let mut df = self.inner.clone();
        for column in self.columns() {
            if let ColumnData::Factor { levels, codes } = &column.data {
                let text: Vec<&str> = codes
                    .iter()
                    .map(|&c| levels.get(c as usize).map(String::as_str).unwrap_or(""))
                    .collect();
                df.with_column(pl::Series::new(column.name.as_str().into(), text))?;
            }
        }
        Ok(df)
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.inner.height()
    }

    /// Number of columns
    pub fn n_cols(&self) -> usize {
        self.inner.width()
    }

    pub fn columns(&self) -> Vec<Column> {
        self.inner
            .get_columns()
            .iter()
            .map(|c| self.view(c))
            .collect()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.inner
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .collect()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<Column> {
        self.inner.column(name).ok().map(|c| self.view(c))
    }

    /// Look up a column, failing with a schema error naming what exists
    pub fn require(&self, name: &str) -> SvmflowResult<Column> {
        self.column(name).ok_or_else(|| {
            SvmflowError::schema(format!(
                "column '{}' not found (available: {})",
                name,
                self.column_names().join(", ")
            ))
        })
    }

    /// Columns usable as numbers (numeric values or factor codes)
    pub fn numeric_columns(&self) -> Vec<(String, Vec<f64>)> {
        self.columns()
            .into_iter()
            .filter_map(|c| c.as_f64().map(|v| (c.name, v)))
            .collect()
    }

    /// Mean and population standard deviation of a numeric column,
    /// ignoring missing cells
    pub fn mean_std(&self, name: &str) -> SvmflowResult<(f64, f64)> {
        let series = self
            .inner
            .column(name)
            .map_err(|_| SvmflowError::schema(format!("column '{}' not found", name)))?
            .as_materialized_series()
            .cast(&pl::DataType::Float64)?;
        let std = series.f64()?.std(0);

        Ok((series.mean().unwrap_or(0.0), std.unwrap_or(0.0)))
    }

    /// Row count of every distinct code pair of two factor columns
    pub fn code_pair_counts(&self, a: &str, b: &str) -> SvmflowResult<Vec<(u32, u32, u64)>> {
        for name in [a, b] {
            if !self.levels.contains_key(name) {
                return Err(SvmflowError::schema(format!(
                    "column '{}' is not a factor",
                    name
                )));
            }
        }

        let grouped = self
            .inner
            .clone()
            .lazy()
            .group_by([pl::col(a), pl::col(b)])
            .agg([pl::len().alias("count")])
            .collect()?;

        let left = grouped.column(a)?.as_materialized_series().u32()?;
        let right = grouped.column(b)?.as_materialized_series().u32()?;
        let counts = grouped
            .column("count")?
            .as_materialized_series()
            .cast(&pl::DataType::UInt64)?;

        Ok(left
            .into_iter()
            .zip(right.into_iter())
            .zip(counts.u64()?.into_iter())
            .filter_map(|((l, r), n)| Some((l?, r?, n?)))
            .collect())
    }

    fn view(&self, column: &pl::Column) -> Column {
        let series = column.as_materialized_series();
        let name = series.name().to_string();

        let data = match (self.levels.get(&name), series.dtype()) {
            (Some(levels), pl::DataType::UInt32) => ColumnData::Factor {
                levels: levels.clone(),
                codes: series
                    .u32()
                    .map(|ca| ca.into_iter().map(|c| c.unwrap_or(0)).collect())
                    .unwrap_or_default(),
            },
            (_, pl::DataType::Float64) => ColumnData::Numeric {
                values: series
                    .f64()
                    .map(|ca| ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
                    .unwrap_or_default(),
            },
            (_, pl::DataType::Int64) => ColumnData::Integer {
                values: series
                    .i64()
                    .map(|ca| ca.into_iter().collect())
                    .unwrap_or_default(),
            },
            _ => ColumnData::Text {
                values: series
                    .str()
                    .map(|ca| {
                        ca.into_iter()
                            .map(|v| v.unwrap_or_default().to_string())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        };

        Column { name, data }
    }
}

impl PartialEq for DataFrame {
    fn eq(&self, other: &Self) -> bool {
        self.levels == other.levels && self.inner.equals_missing(&other.inner)
    }
}

/// Serialized form of a frame
#[derive(Serialize, Deserialize)]
struct FrameRecord {
    columns: Vec<Column>,
}

impl From<DataFrame> for FrameRecord {
    fn from(df: DataFrame) -> Self {
        Self {
            columns: df.columns(),
        }
    }
}

impl TryFrom<FrameRecord> for DataFrame {
    type Error = SvmflowError;

    fn try_from(record: FrameRecord) -> Result<Self, Self::Error> {
        Self::new(record.columns)
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Column storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnData {
    /// Floating point values; missing cells are NaN
    Numeric {
        #[serde(with = "nan_as_null")]
        values: Vec<f64>,
    },
    /// Whole numbers; missing cells are `None`
    Integer { values: Vec<Option<i64>> },
    /// Free text
    Text { values: Vec<String> },
    /// Categorical values: `codes[i]` indexes into `levels`
    Factor { levels: Vec<String>, codes: Vec<u32> },
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric { values },
        }
    }

    pub fn integer(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Integer {
                values: values.into_iter().map(Some).collect(),
            },
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text { values },
        }
    }

    pub fn factor(name: impl Into<String>, levels: Vec<String>, codes: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Factor { levels, codes },
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric { values } => values.len(),
            ColumnData::Integer { values } => values.len(),
            ColumnData::Text { values } => values.len(),
            ColumnData::Factor { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.data,
            ColumnData::Numeric { .. } | ColumnData::Integer { .. }
        )
    }

    /// Numeric view; factor columns yield their codes, text yields `None`
    pub fn as_f64(&self) -> Option<Vec<f64>> {
        match &self.data {
            ColumnData::Numeric { values } => Some(values.clone()),
            ColumnData::Integer { values } => Some(
                values
                    .iter()
                    .map(|v| v.map(|v| v as f64).unwrap_or(f64::NAN))
                    .collect(),
            ),
            ColumnData::Factor { codes, .. } => Some(codes.iter().map(|&c| c as f64).collect()),
            ColumnData::Text { .. } => None,
        }
    }

    /// Cell rendered as text, the way it is written to CSV
    pub fn cell(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Numeric { values } => {
                values.get(row).map(|&v| format_number(v)).unwrap_or_default()
            }
            ColumnData::Integer { values } => values
                .get(row)
                .copied()
                .flatten()
                .map(|v| v.to_string())
                .unwrap_or_default(),
            ColumnData::Text { values } => values.get(row).cloned().unwrap_or_default(),
            ColumnData::Factor { levels, codes } => codes
                .get(row)
                .and_then(|&c| levels.get(c as usize))
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Short type label for display
    pub fn type_name(&self) -> &'static str {
        match self.data {
            ColumnData::Numeric { .. } => "numeric",
            ColumnData::Integer { .. } => "integer",
            ColumnData::Text { .. } => "text",
            ColumnData::Factor { .. } => "factor",
        }
    }

    fn to_series(&self) -> pl::Series {
        let name = self.name.as_str().into();
        match &self.data {
            ColumnData::Numeric { values } => {
                let values: Vec<Option<f64>> = values
                    .iter()
                    .map(|&v| if v.is_nan() { None } else { Some(v) })
                    .collect();
                pl::Series::new(name, values)
            }
            ColumnData::Integer { values } => pl::Series::new(name, values.as_slice()),
            ColumnData::Text { values } => pl::Series::new(name, values.as_slice()),
            ColumnData::Factor { codes, .. } => pl::Series::new(name, codes.as_slice()),
        }
    }
}

/// Canonical text form of a number: integral values print without a
/// fractional part, NaN prints as an empty cell
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// JSON has no NaN; missing numeric cells travel as `null`
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let opts: Vec<Option<f64>> = values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        opts.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let opts: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(opts.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_rejects_ragged_columns() {
        let result = DataFrame::new(vec![
            Column::numeric("a", vec![1.0, 2.0]),
            Column::numeric("b", vec![1.0]),
        ]);
        assert!(matches!(result, Err(SvmflowError::Shape { .. })));
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let result = DataFrame::new(vec![
            Column::numeric("a", vec![1.0]),
            Column::numeric("a", vec![2.0]),
        ]);
        assert!(matches!(result, Err(SvmflowError::Schema { .. })));
    }

    #[test]
    fn test_new_rejects_out_of_range_factor_codes() {
        let result = DataFrame::new(vec![Column::factor("truth", vec!["0".into()], vec![0, 3])]);
        let err = result.unwrap_err();
        assert!(matches!(err, SvmflowError::Schema { .. }));
        assert!(err.to_string().contains("code 3"));
    }

    #[test]
    fn test_require_lists_available_columns() {
        let df = DataFrame::new(vec![Column::numeric("age", vec![50.0])]).unwrap();
        let err = df.require("target").unwrap_err();
        assert!(err.to_string().contains("available: age"));
    }

    #[test]
    fn test_numeric_columns_skip_text() {
        let df = DataFrame::new(vec![
            Column::numeric("age", vec![50.0, 60.0]),
            Column::text("sex", vec!["M".into(), "F".into()]),
            Column::factor("cp", vec!["a".into(), "b".into()], vec![1, 0]),
        ])
        .unwrap();

        let numeric = df.numeric_columns();
        assert_eq!(numeric.len(), 2);
        assert_eq!(numeric[1], ("cp".to_string(), vec![1.0, 0.0]));
    }

    #[test]
    fn test_columns_keep_their_kind() {
        let df = DataFrame::new(vec![
            Column::integer("n", vec![1, 2]),
            Column::factor("f", vec!["x".into(), "y".into()], vec![1, 1]),
        ])
        .unwrap();

        let columns = df.columns();
        assert_eq!(columns[0].type_name(), "integer");
        assert_eq!(columns[1].type_name(), "factor");
        assert_eq!(columns[1].cell(0), "y");
    }

    #[test]
    fn test_mean_std_is_population() {
        let df = DataFrame::new(vec![Column::numeric("x", vec![1.0, 2.0, 3.0])]).unwrap();
        let (mean, std) = df.mean_std("x").unwrap();
        assert_relative_eq!(mean, 2.0);
        assert_relative_eq!(std, (2.0f64 / 3.0).sqrt());
    }

    #[test]
    fn test_code_pair_counts() {
        let levels = vec!["0".to_string(), "1".to_string()];
        let df = DataFrame::new(vec![
            Column::factor("a", levels.clone(), vec![0, 1, 1, 1]),
            Column::factor("b", levels, vec![0, 1, 1, 0]),
        ])
        .unwrap();

        let mut counts = df.code_pair_counts("a", "b").unwrap();
        counts.sort_unstable();
        assert_eq!(counts, vec![(0, 0, 1), (1, 0, 1), (1, 1, 2)]);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(f64::NAN), "");
    }

    #[test]
    fn test_json_keeps_missing_values() {
        let df = DataFrame::new(vec![Column::numeric("x", vec![1.0, f64::NAN])]).unwrap();
        let json = serde_json::to_string(&df).unwrap();
        let back: DataFrame = serde_json::from_str(&json).unwrap();

        let values = back.column("x").unwrap().as_f64().unwrap();
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert_eq!(back, df);
    }

    #[test]
    fn test_json_with_dangling_factor_code_is_rejected() {
        let json = r#"{"columns":[{"name":"truth","data":{"type":"factor","levels":["0","1"],"codes":[0,7]}}]}"#;
        let err = serde_json::from_str::<DataFrame>(json).unwrap_err();
        assert!(err.to_string().contains("code 7"));
    }
}

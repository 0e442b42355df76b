// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! Integer encoding of text columns

use std::collections::BTreeSet;

use crate::errors::{SvmflowError, SvmflowResult};
use crate::frame::{Column, ColumnData, DataFrame};

/// Code assigned to an empty text cell
pub const MISSING_CODE: i64 = -1;

/// Replace every text column by integer codes over its sorted distinct
/// non-empty values. Numeric columns pass through untouched.
pub fn encode_categoricals(raw: &DataFrame, target_column: &str) -> SvmflowResult<DataFrame> {
    if raw.n_cols() == 0 {
        return Err(SvmflowError::schema("dataset has no columns"));
    }
    raw.require(target_column)?;

    let columns = raw
        .columns()
        .into_iter()
        .map(|column| match &column.data {
            ColumnData::Text { values } => {
                tracing::debug!(column = %column.name, "encoding text column");
                Column::integer(column.name.clone(), encode_values(values))
            }
            _ => column,
        })
        .collect();

    DataFrame::new(columns)
}

fn encode_values(values: &[String]) -> Vec<i64> {
    let levels: Vec<&str> = values
        .iter()
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    values
        .iter()
        .map(|v| match levels.binary_search(&v.as_str()) {
            Ok(code) => code as i64,
            Err(_) => MISSING_CODE,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> DataFrame {
        DataFrame::new(vec![
            Column::numeric("age", vec![63.0, 37.0, 41.0]),
            Column::text("sex", vec!["male".into(), "female".into(), "".into()]),
            Column::numeric("target", vec![1.0, 0.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_text_columns_become_sorted_codes() {
        let encoded = encode_categoricals(&raw(), "target").unwrap();

        assert_eq!(encoded.n_rows(), 3);
        let sex = encoded.column("sex").unwrap();
        assert!(sex.is_numeric());
        assert_eq!(sex.as_f64().unwrap(), vec![1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_numeric_columns_untouched() {
        let encoded = encode_categoricals(&raw(), "target").unwrap();
        assert_eq!(encoded.column("age"), raw().column("age"));
        assert_eq!(encoded.column("target"), raw().column("target"));
    }

    #[test]
    fn test_missing_target_column() {
        let err = encode_categoricals(&raw(), "outcome").unwrap_err();
        assert!(matches!(err, SvmflowError::Schema { .. }));
    }

    #[test]
    fn test_empty_frame() {
        let df = DataFrame::new(vec![]).unwrap();
        assert!(encode_categoricals(&df, "target").is_err());
    }
}

use polars::prelude::*;

use crate::errors::DnspError;

/// Canonical column order every network adapter must deliver.
pub const LOAD_COLUMNS: [&str; 6] = ["zss", "name", "time", "mw", "mvar", "mva"];

/// Columns an adapter cannot fabricate; the rest are null-filled.
const REQUIRED_COLUMNS: [&str; 2] = ["zss", "time"];

/// Coerces an adapter's output into the shared zone substation load shape:
/// `zss` and `time` must be present, `name` and the three load measures are
/// added as nulls when the network does not publish them, measures are cast
/// to `Float32`, and columns are reordered to [`LOAD_COLUMNS`].
pub fn conform_load_frame(network: &'static str, df: DataFrame) -> Result<DataFrame, DnspError> {
    if df.height() == 0 {
        return Err(DnspError::Empty { network });
    }

    let names: Vec<String> = df
        .get_column_names_str()
        .into_iter()
        .map(str::to_string)
        .collect();
    for required in REQUIRED_COLUMNS {
        if !names.iter().any(|name| name == required) {
            return Err(DnspError::MissingColumn {
                network,
                column: required.to_string(),
            });
        }
    }

    let mut fill = Vec::new();
    if !names.iter().any(|name| name == "name") {
        fill.push(lit(NULL).cast(DataType::String).alias("name"));
    }
    for measure in ["mw", "mvar", "mva"] {
        if !names.iter().any(|name| name == measure) {
            fill.push(lit(NULL).cast(DataType::Float32).alias(measure));
        }
    }

    let mut lf = df.lazy();
    if !fill.is_empty() {
        lf = lf.with_columns(fill);
    }
    lf.select([
        col("zss").cast(DataType::String),
        col("name").cast(DataType::String),
        col("time"),
        col("mw").cast(DataType::Float32),
        col("mvar").cast(DataType::Float32),
        col("mva").cast(DataType::Float32),
    ])
    .collect()
    .map_err(DnspError::frame(network))
}

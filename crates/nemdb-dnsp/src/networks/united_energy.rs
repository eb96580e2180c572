use std::io::Cursor;

use polars::prelude::*;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::{concat_frames, fetch_bytes, to_datetime_expr, zip_file_entries};

const NAME: &str = "united_energy";

/// Yearly zip of per-station CSVs with mixed-case headers.
pub struct UnitedEnergyAdapter;

impl NetworkAdapter for UnitedEnergyAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, year: i32) -> Option<String> {
        match year {
            2024 => Some(
                "https://media.unitedenergy.com.au/reports/UE-1-July-2022-to-30-June-2023-1.zip"
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn read_all_zss(&self, year: i32) -> Result<DataFrame, DnspError> {
        let url = self
            .url(year)
            .ok_or(DnspError::NoUrlForYear { network: NAME, year })?;
        let bytes = fetch_bytes(NAME, &url)?;
        read_archive(&bytes)
    }
}

pub fn read_archive(bytes: &[u8]) -> Result<DataFrame, DnspError> {
    let err = DnspError::frame(NAME);
    let mut frames = Vec::new();
    for (entry, data) in zip_file_entries(NAME, bytes)? {
        if !entry.ends_with(".csv") {
            continue;
        }
        let zss = zss_from_entry(&entry)?;
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(data))
            .finish()
            .map_err(&err)?;
        let lowered: Vec<String> = df
            .get_column_names_str()
            .into_iter()
            .map(str::to_lowercase)
            .collect();
        df.set_column_names(lowered.iter().map(String::as_str))
            .map_err(&err)?;
        let frame = df
            .lazy()
            .with_columns([
                lit(zss.as_str()).alias("zss"),
                to_datetime_expr(col("date_time"), "%Y-%m-%d: %H:%M").alias("time"),
            ])
            .select([
                col("zss"),
                col("time"),
                col("mw"),
                col("mvar"),
                col("mva"),
            ])
            .collect()
            .map_err(&err)?;
        frames.push(frame);
    }
    conform_load_frame(NAME, concat_frames(NAME, frames)?)
}

/// Entries look like `<folder>/<ZSS>_<fy>.csv`, sometimes prefixed `UE/`.
fn zss_from_entry(entry: &str) -> Result<String, DnspError> {
    let stem = entry
        .split('/')
        .nth(1)
        .ok_or_else(|| DnspError::entry(NAME, entry, "expected a folder/station path"))?;
    let stem = stem.split("_20").next().unwrap_or(stem);
    Ok(stem.split("UE/").next().unwrap_or(stem).to_string())
}

use std::io::Cursor;

use polars::prelude::*;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::{concat_frames, to_datetime_expr, zip_file_entries};

const NAME: &str = "cppal";

const INSTRUCTIONS: &str = "CitiPower and Powercor publish through an external provider \
(https://spaces.hightail.com/space/1aUFTWDtim); download the archive by hand and decode it \
with read_archive";

/// CitiPower and Powercor joint publication. The archive sits behind a
/// file-sharing provider, so the automated path only reports how to get it.
pub struct CppalAdapter;

impl NetworkAdapter for CppalAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, _year: i32) -> Option<String> {
        None
    }

    fn read_all_zss(&self, _year: i32) -> Result<DataFrame, DnspError> {
        Err(DnspError::ManualDownload {
            network: NAME,
            instructions: INSTRUCTIONS,
        })
    }
}

/// Decodes a manually downloaded archive of per-station CSVs.
pub fn read_archive(bytes: &[u8]) -> Result<DataFrame, DnspError> {
    let err = DnspError::frame(NAME);
    let mut frames = Vec::new();
    for (entry, data) in zip_file_entries(NAME, bytes)? {
        if !entry.ends_with(".csv") {
            continue;
        }
        let zss = zss_from_entry(&entry)?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(data))
            .finish()
            .map_err(&err)?;
        let frame = df
            .lazy()
            .with_columns([
                lit(zss.as_str()).alias("zss"),
                to_datetime_expr(col("date_time"), "%Y-%m-%d %H:%M:%S").alias("time"),
            ])
            .select([
                col("zss"),
                col("time"),
                col("MW").alias("mw"),
                col("MVAR").alias("mvar"),
                col("MVA").alias("mva"),
            ])
            .collect()
            .map_err(&err)?;
        frames.push(frame);
    }
    conform_load_frame(NAME, concat_frames(NAME, frames)?)
}

/// Entries look like `<folder>/<ZSS>_<fy>.csv`.
fn zss_from_entry(entry: &str) -> Result<String, DnspError> {
    let stem = entry
        .split('/')
        .nth(1)
        .ok_or_else(|| DnspError::entry(NAME, entry, "expected a folder/station path"))?;
    Ok(stem
        .split("_20")
        .next()
        .unwrap_or(stem)
        .to_string())
}

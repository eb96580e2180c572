use std::io::Cursor;

use polars::prelude::*;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::{concat_frames, fetch_bytes, to_datetime_expr, zip_file_entries};

const NAME: &str = "endeavour";

/// Distribution annual planning report archive of headerless `time,MW` CSVs.
pub struct EndeavourAdapter;

impl NetworkAdapter for EndeavourAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, year: i32) -> Option<String> {
        match year {
            2024 => Some(
                "https://www.endeavourenergy.com.au/__data/assets/file/0025/78352/FY-23-DAPR-Upload-Folder.zip"
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
        let zss = zss_from_entry(&entry)?;
        let mut df = CsvReadOptions::default()
            .with_has_header(false)
            .into_reader_with_file_handle(Cursor::new(data))
            .finish()
            .map_err(&err)?;
        df.set_column_names(["time", "mw"]).map_err(&err)?;
        let frame = df
            .lazy()
            .with_columns([
                lit(zss.as_str()).alias("zss"),
                to_datetime_expr(col("time"), "%d/%m/%Y %H:%M:%S").alias("time"),
            ])
            .collect()
            .map_err(&err)?;
        frames.push(frame);
    }
    conform_load_frame(NAME, concat_frames(NAME, frames)?)
}

/// Entries look like `<folder>/<ZSS> ZS_<fy>.csv`.
fn zss_from_entry(entry: &str) -> Result<String, DnspError> {
    let stem = entry
        .split('/')
        .nth(1)
        .ok_or_else(|| DnspError::entry(NAME, entry, "expected a folder/station path"))?;
    Ok(stem.split(" ZS_").next().unwrap_or(stem).to_string())
}

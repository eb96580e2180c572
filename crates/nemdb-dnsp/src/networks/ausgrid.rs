use std::io::Cursor;

use polars::prelude::*;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::{concat_frames, fetch_bytes, midnight_fix, to_datetime_expr, zip_file_entries};

const NAME: &str = "ausgrid";

/// Yearly zip of per-station CSVs, one half-hour-of-day column per interval.
pub struct AusgridAdapter;

impl NetworkAdapter for AusgridAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, year: i32) -> Option<String> {
        match year {
            2024 => Some(
                "https://www.ausgrid.com.au/-/media/Documents/Data-to-share/Distribution-zone-substation-informaton/FY2024.zip?rev=6fc7bcc1b5464355b0370de40aae283d"
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

/// Decodes the yearly archive into the shared load shape.
pub fn read_archive(bytes: &[u8]) -> Result<DataFrame, DnspError> {
    let err = DnspError::frame(NAME);
    let mut frames = Vec::new();
    for (_, data) in zip_file_entries(NAME, bytes)? {
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(data))
            .finish()
            .map_err(&err)?;
        df.rename("Zone Substation", "zss".into()).map_err(&err)?;
        df.rename("Date", "date".into()).map_err(&err)?;
        df.rename("Unit", "metric".into()).map_err(&err)?;
        let df = df.drop("Year").map_err(&err)?;
        let df = df
            .lazy()
            .filter(col("metric").eq(lit("MW")))
            .collect()
            .map_err(&err)?;

        // Every remaining column is a time-of-day reading.
        let index = ["zss", "date", "metric"];
        let on: Vec<String> = df
            .get_column_names_str()
            .into_iter()
            .filter(|name| !index.contains(name))
            .map(str::to_string)
            .collect();
        let long = df.unpivot(on, index).map_err(&err)?;

        let frame = long
            .lazy()
            .with_columns([to_datetime_expr(
                concat_str(
                    [col("date"), midnight_fix(col("variable"))],
                    " ",
                    true,
                ),
                "%Y-%m-%d %H:%M",
            )
            .alias("time")])
            .select([col("zss"), col("time"), col("value").alias("mw")])
            .collect()
            .map_err(&err)?;
        frames.push(frame);
    }
    conform_load_frame(NAME, concat_frames(NAME, frames)?)
}

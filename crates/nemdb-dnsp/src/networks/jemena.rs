use std::io::Cursor;

use calamine::{Data, Range, Reader, Xlsx};
use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::{concat_frames, fetch_bytes, zip_file_entries};

const NAME: &str = "jemena";

/// Zip of per-station workbooks; the interval table starts at the row whose
/// first cell reads "From".
pub struct JemenaAdapter;

impl NetworkAdapter for JemenaAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, year: i32) -> Option<String> {
        match year {
            2024 => Some(
                "https://daprprd.blob.core.windows.net/historial-loadtrace-data/zone%20substations.zip"
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
    let mut frames = Vec::new();
    for (entry, data) in zip_file_entries(NAME, bytes)? {
        let zss = entry
            .split(" Zone Substation")
            .next()
            .unwrap_or(&entry)
            .to_string();
        let mut workbook =
            Xlsx::new(Cursor::new(data)).map_err(DnspError::workbook(NAME))?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| DnspError::entry(NAME, &entry, "workbook has no sheets"))?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(DnspError::workbook(NAME))?;
        frames.push(parse_sheet(&zss, &entry, &range)?);
    }
    conform_load_frame(NAME, concat_frames(NAME, frames)?)
}

/// Extracts the interval table from one station sheet.
pub(crate) fn parse_sheet(
    zss: &str,
    entry: &str,
    range: &Range<Data>,
) -> Result<DataFrame, DnspError> {
    let rows: Vec<_> = range.rows().collect();
    let header_idx = rows
        .iter()
        .position(|row| matches!(row.first(), Some(Data::String(cell)) if cell == "From"))
        .ok_or_else(|| DnspError::entry(NAME, entry, "no 'From' header row"))?;
    let header = &rows[header_idx];
    let mw_idx = header
        .iter()
        .position(|cell| matches!(cell, Data::String(name) if name == "MW"))
        .ok_or_else(|| DnspError::entry(NAME, entry, "no MW column"))?;

    let mut times: Vec<Option<i64>> = Vec::new();
    let mut megawatts: Vec<Option<f64>> = Vec::new();
    for row in &rows[header_idx + 1..] {
        times.push(cell_to_micros(row.first()));
        megawatts.push(cell_to_f64(row.get(mw_idx)));
    }

    let err = DnspError::frame(NAME);
    let time = Series::new("time".into(), times)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .map_err(&err)?;
    let mw = Series::new("mw".into(), megawatts);
    let df = DataFrame::new(vec![time.into(), mw.into()]).map_err(&err)?;
    df.lazy()
        .with_columns([lit(zss).alias("zss")])
        .collect()
        .map_err(&err)
}

fn cell_to_micros(cell: Option<&Data>) -> Option<i64> {
    let parsed: Option<NaiveDateTime> = match cell? {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::String(raw) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok(),
        _ => None,
    };
    parsed.map(|dt| dt.and_utc().timestamp_micros())
}

fn cell_to_f64(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Float(value) => Some(*value),
        Data::Int(value) => Some(*value as f64),
        Data::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

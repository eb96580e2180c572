use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use polars::prelude::pivot::pivot_stable;
use polars::prelude::*;
use tracing::warn;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::{fetch_bytes, zip_file_entries};

const NAME: &str = "sapn";

/// SA Power Networks zip of CSVs with a three-row column header
/// (station / connection point / metric) over date+time index columns.
pub struct SapnAdapter;

impl NetworkAdapter for SapnAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, year: i32) -> Option<String> {
        match year {
            2024 => Some("https://www.sapowernetworks.com.au/public/download.jsp?id=331119".to_string()),
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
    let mut stations: Vec<String> = Vec::new();
    let mut points: Vec<String> = Vec::new();
    let mut metrics: Vec<String> = Vec::new();
    let mut times: Vec<Option<i64>> = Vec::new();
    let mut values: Vec<Option<f64>> = Vec::new();

    for (entry, data) in zip_file_entries(NAME, bytes)? {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_slice());
        let mut records = Vec::new();
        for record in reader.records() {
            match record {
                Ok(record) => records.push(record),
                Err(parse_err) => {
                    warn!(network = NAME, entry, %parse_err, "skipping bad line");
                }
            }
        }
        // Row 0 is a title; rows 1..=3 carry station, connection point and
        // metric labels for every data column.
        if records.len() < 5 {
            return Err(DnspError::entry(NAME, &entry, "too few rows for a load table"));
        }
        let zss_row = clean_header(&records[1]);
        let point_row = clean_header(&records[2]);
        let metric_row: Vec<Option<String>> = clean_header(&records[3])
            .into_iter()
            .map(|cell| cell.map(strip_metric_suffix))
            .collect();
        let zss_row = fill_limit1(zss_row);
        let point_row = fill_limit1(point_row);
        let metric_row = fill_limit1(metric_row);

        for record in &records[4..] {
            let (Some(date), Some(time)) = (record.get(0), record.get(1)) else {
                continue;
            };
            let stamp = NaiveDateTime::parse_from_str(
                &format!("{date} {time}"),
                "%d/%m/%Y %H:%M",
            )
            .ok()
            .map(|dt| dt.and_utc().timestamp_micros());
            for column in 2..record.len() {
                let (Some(Some(zss)), Some(Some(metric))) =
                    (zss_row.get(column), metric_row.get(column))
                else {
                    continue;
                };
                // Some files carry Amp readings we do not keep.
                if metric == "Amp" {
                    continue;
                }
                stations.push(zss.clone());
                points.push(
                    point_row
                        .get(column)
                        .cloned()
                        .flatten()
                        .unwrap_or_default(),
                );
                metrics.push(metric.clone());
                times.push(stamp);
                values.push(record.get(column).and_then(|raw| raw.trim().parse().ok()));
            }
        }
    }

    if stations.is_empty() {
        return Err(DnspError::Empty { network: NAME });
    }

    let time = Series::new("time".into(), times)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .map_err(&err)?;
    let long = DataFrame::new(vec![
        Series::new("zss".into(), stations).into(),
        Series::new("connection_point".into(), points).into(),
        Series::new("metric".into(), metrics).into(),
        time.into(),
        Series::new("value".into(), values).into(),
    ])
    .map_err(&err)?;

    let wide = pivot_stable(
        &long,
        ["metric"],
        Some(["zss", "connection_point", "time"]),
        Some(["value"]),
        true,
        None,
        None,
    )
    .map_err(&err)?;
    let frame = wide
        .lazy()
        .rename(["MW", "MVar", "MVA"], ["mw", "mvar", "mva"], false)
        .drop(["connection_point"])
        .collect()
        .map_err(&err)?;
    conform_load_frame(NAME, frame)
}

/// Placeholder labels pandas-style exports leave in merged header cells.
fn clean_header(record: &csv::StringRecord) -> Vec<Option<String>> {
    record
        .iter()
        .map(|cell| {
            let cell = cell.trim();
            if cell.is_empty()
                || cell.contains("Zone Sub Name")
                || cell.contains("Unnamed")
                || cell.contains("Associated Connection Point")
            {
                None
            } else {
                Some(cell.to_string())
            }
        })
        .collect()
}

/// Duplicate metric labels arrive as "MW.1", "MVar.2" and so on.
fn strip_metric_suffix(metric: String) -> String {
    match metric.rsplit_once('.') {
        Some((base, suffix)) if suffix.chars().all(|c| c.is_ascii_digit()) => base.to_string(),
        _ => metric,
    }
}

/// Backward-fill then forward-fill, each looking one cell only, the way the
/// header labels sit over merged cells in the source files.
fn fill_limit1(mut cells: Vec<Option<String>>) -> Vec<Option<String>> {
    for index in 0..cells.len() {
        if cells[index].is_none() {
            if let Some(next) = cells.get(index + 1).cloned().flatten() {
                cells[index] = Some(next);
            }
        }
    }
    for index in (1..cells.len()).rev() {
        if cells[index].is_none() && cells[index - 1].is_some() {
            cells[index] = cells[index - 1].clone();
        }
    }
    cells
}

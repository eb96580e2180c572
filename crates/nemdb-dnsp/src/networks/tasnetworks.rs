use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use polars::prelude::pivot::pivot_stable;
use polars::prelude::*;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::fetch_bytes;

const NAME: &str = "tasnetworks";

/// One CSV for the whole state: a station-name header row over a metric row,
/// station codes embedded as "Name (CODE)".
pub struct TasnetworksAdapter;

impl NetworkAdapter for TasnetworksAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, year: i32) -> Option<String> {
        match year {
            2023 | 2024 => Some(
                "https://www.tasnetworks.com.au/Documents/Manual-documents/Planning-and-upgrades/Substation-Load-Information/2023-Zone-Substation-Report"
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
        read_report_csv(&bytes)
    }
}

pub fn read_report_csv(bytes: &[u8]) -> Result<DataFrame, DnspError> {
    let err = DnspError::frame(NAME);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record.map_err(|source| {
            DnspError::entry(NAME, "report", source.to_string())
        })?);
    }
    if records.len() < 3 {
        return Err(DnspError::entry(NAME, "report", "too few rows for a load table"));
    }

    // Station names only appear over the first of their metric columns.
    let mut filled_names: Vec<Option<String>> = Vec::new();
    let mut last_name: Option<String> = None;
    for cell in records[0].iter() {
        let cell = cell.trim();
        if !cell.is_empty() && !cell.contains("Unnamed:") {
            last_name = Some(cell.to_string());
        }
        filled_names.push(last_name.clone());
    }
    let metrics: Vec<String> = records[1]
        .iter()
        .map(|cell| cell.trim().to_lowercase())
        .collect();

    let mut names: Vec<String> = Vec::new();
    let mut stations: Vec<Option<String>> = Vec::new();
    let mut metric_col: Vec<String> = Vec::new();
    let mut times: Vec<Option<i64>> = Vec::new();
    let mut values: Vec<Option<f64>> = Vec::new();
    for record in &records[2..] {
        let Some(raw_time) = record.get(0) else { continue };
        let stamp = NaiveDateTime::parse_from_str(raw_time, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|dt| dt.and_utc().timestamp_micros());
        for column in 1..record.len() {
            let (Some(Some(name)), Some(metric)) =
                (filled_names.get(column), metrics.get(column))
            else {
                continue;
            };
            if metric.is_empty() {
                continue;
            }
            names.push(name.clone());
            stations.push(station_code(name));
            metric_col.push(metric.clone());
            times.push(stamp);
            values.push(record.get(column).and_then(|raw| raw.trim().parse().ok()));
        }
    }
    if names.is_empty() {
        return Err(DnspError::Empty { network: NAME });
    }

    let time = Series::new("time".into(), times)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .map_err(&err)?;
    let long = DataFrame::new(vec![
        time.into(),
        Series::new("name".into(), names).into(),
        Series::new("zss".into(), stations).into(),
        Series::new("metric".into(), metric_col).into(),
        Series::new("value".into(), values).into(),
    ])
    .map_err(&err)?;
    let wide = pivot_stable(
        &long,
        ["metric"],
        Some(["time", "name", "zss"]),
        Some(["value"]),
        true,
        None,
        None,
    )
    .map_err(&err)?;
    conform_load_frame(NAME, wide)
}

/// "Creek Road No.44 (CK)" -> "CK"
fn station_code(name: &str) -> Option<String> {
    let open = name.rfind('(')?;
    let close = name[open..].find(')')? + open;
    let code = &name[open + 1..close];
    if code.is_empty() || !code.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some(code.to_string())
}

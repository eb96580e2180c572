//! One module per distribution network service provider.

pub mod ausgrid;
pub mod ausnet;
pub mod cppal;
pub mod endeavour;
pub mod energex;
pub mod ergon;
pub mod essential_energy;
pub mod jemena;
pub mod sapn;
pub mod tasnetworks;
pub mod united_energy;

pub use ausgrid::AusgridAdapter;
pub use ausnet::AusnetAdapter;
pub use cppal::CppalAdapter;
pub use endeavour::EndeavourAdapter;
pub use energex::EnergexAdapter;
pub use ergon::ErgonAdapter;
pub use essential_energy::EssentialEnergyAdapter;
pub use jemena::JemenaAdapter;
pub use sapn::SapnAdapter;
pub use tasnetworks::TasnetworksAdapter;
pub use united_energy::UnitedEnergyAdapter;

use std::io::{Cursor, Read};

use polars::prelude::*;
use tracing::info;
use ::zip::ZipArchive;

use crate::errors::DnspError;

pub(crate) fn fetch_bytes(network: &'static str, url: &str) -> Result<Vec<u8>, DnspError> {
    info!(network, url, "downloading");
    match ureq::get(url).call() {
        Ok(response) => {
            let mut bytes = Vec::new();
            response.into_reader().read_to_end(&mut bytes)?;
            Ok(bytes)
        }
        Err(ureq::Error::Status(status, _)) => Err(DnspError::Download {
            network,
            url: url.to_string(),
            status,
        }),
        Err(err) => Err(DnspError::Http {
            network,
            url: url.to_string(),
            source: Box::new(err),
        }),
    }
}

/// Reads every file entry of a zip archive into memory as `(path, bytes)`.
pub(crate) fn zip_file_entries(
    network: &'static str,
    bytes: &[u8],
) -> Result<Vec<(String, Vec<u8>)>, DnspError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(DnspError::zip(network))?;
    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(DnspError::zip(network))?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push((name, data));
    }
    Ok(entries)
}

/// Strptime expression shared by the CSV-based adapters.
pub(crate) fn to_datetime_expr(expr: Expr, format: &str) -> Expr {
    expr.str().to_datetime(
        Some(TimeUnit::Microseconds),
        None,
        StrptimeOptions {
            format: Some(format.into()),
            strict: false,
            exact: true,
            cache: true,
        },
        lit("raise"),
    )
}

/// AEMO-adjacent publications occasionally use "24:00" for midnight.
pub(crate) fn midnight_fix(expr: Expr) -> Expr {
    expr.str().replace(lit("24:"), lit("00:"), true)
}

/// Queensland networks share one layout: zips of `Date,Time,MW,MVA` CSVs
/// whose entry names carry the station code before `marker`.
pub(crate) fn read_date_time_archive(
    network: &'static str,
    bytes: &[u8],
    marker: &str,
) -> Result<DataFrame, DnspError> {
    let err = DnspError::frame(network);
    let projection: std::sync::Arc<[PlSmallStr]> = ["Date", "Time", "MW", "MVA"]
        .iter()
        .map(|name| PlSmallStr::from_str(name))
        .collect();
    let mut frames = Vec::new();
    for (entry, data) in zip_file_entries(network, bytes)? {
        let zss = entry.split(marker).next().unwrap_or(&entry).to_string();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_columns(Some(projection.clone()))
            .into_reader_with_file_handle(Cursor::new(data))
            .finish()
            .map_err(&err)?;
        let frame = df
            .lazy()
            .with_columns([
                lit(zss.as_str()).alias("zss"),
                to_datetime_expr(
                    concat_str([col("Date"), col("Time")], " ", true),
                    "%Y-%m-%d %H:%M:%S",
                )
                .alias("time"),
            ])
            .select([
                col("zss"),
                col("time"),
                col("MW").alias("mw"),
                col("MVA").alias("mva"),
            ])
            .collect()
            .map_err(&err)?;
        frames.push(frame);
    }
    concat_frames(network, frames)
}

pub(crate) fn concat_frames(
    network: &'static str,
    frames: Vec<DataFrame>,
) -> Result<DataFrame, DnspError> {
    if frames.is_empty() {
        return Err(DnspError::Empty { network });
    }
    let lazy: Vec<LazyFrame> = frames.into_iter().map(DataFrame::lazy).collect();
    concat(lazy, UnionArgs::default())
        .and_then(LazyFrame::collect)
        .map_err(DnspError::frame(network))
}

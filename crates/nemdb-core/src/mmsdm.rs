//! Readers for the grid operator's MMSDM archives and NEMWEB report pages.
//!
//! Archive CSVs carry a comment first row, an `I` header row and `D` data
//! rows, closed by an "END OF REPORT" trailer.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use polars::prelude::pivot::pivot_stable;
use polars::prelude::*;
use tracing::{info, warn};
use ::zip::ZipArchive;

use crate::config::Config;
use crate::error::{NemdbError, Result};
use crate::fetch::{cache_response_zip, http_get_bytes, list_available_files, with_retry};
use crate::store::{is_temporal, mmsdm_dtype, TableSpec};

/// Timestamp layout used throughout the MMSDM archives.
pub const STRPTIME: &str = "%Y/%m/%d %H:%M:%S";

const BIDMOVE_URL: &str = "https://nemweb.com.au/Reports/Current/Bidmove_Complete/";
const HISTDEMAND_ARCHIVE_URL: &str = "http://www.nemweb.com.au/REPORTS/ARCHIVE/HistDemand";
const HISTDEMAND_CURRENT_URL: &str = "http://www.nemweb.com.au/REPORTS/CURRENT/HistDemand";
const FORECAST_URL: &str = "https://nemweb.com.au/Reports/Current/Operational_Demand/Forecast_HH/";

fn archive_url(table: &str, year: i32, month: u32) -> String {
    format!(
        "http://nemweb.com.au/Data_Archive/Wholesale_Electricity/MMSDM/{year}/MMSDM_{year}_{month:02}/MMSDM_Historical_Data_SQLLoader/DATA/PUBLIC_DVD_{table}_{year}{month:02}010000.zip"
    )
}

/// Some vintages are only published under the PUBLIC_ARCHIVE naming scheme.
fn archive_url_alt(table: &str, year: i32, month: u32) -> String {
    format!(
        "http://nemweb.com.au/Data_Archive/Wholesale_Electricity/MMSDM/{year}/MMSDM_{year}_{month:02}/MMSDM_Historical_Data_SQLLoader/DATA/PUBLIC_ARCHIVE%23{table}%23FILE01%23{year}{month:02}010000.zip"
    )
}

fn fetch_archive(config: &Config, table: &str, year: i32, month: u32) -> Result<PathBuf> {
    match cache_response_zip(config, &archive_url(table, year, month)) {
        Ok(path) => Ok(path),
        Err(_) => {
            info!(table, "retrying with alternative archive url");
            cache_response_zip(config, &archive_url_alt(table, year, month)).map_err(|_| {
                NemdbError::MissingData {
                    table: table.to_string(),
                    year,
                    month,
                }
            })
        }
    }
}

fn first_zip_entry<R: Read + Seek>(reader: R) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(reader)?;
    if archive.len() == 0 {
        return Err(NemdbError::processing("empty zip archive"));
    }
    let mut bytes = Vec::new();
    archive.by_index(0)?.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn read_zip_entry(path: &Path) -> Result<Vec<u8>> {
    first_zip_entry(File::open(path)?)
}

/// Downloads one month of `spec` and decodes it to the configured columns
/// and dtypes.
pub fn read_table(config: &Config, spec: &TableSpec, year: i32, month: u32) -> Result<DataFrame> {
    info!(table = spec.name, year, month, "fetching archive table");
    let archive = fetch_archive(config, spec.name, year, month)?;
    let bytes = read_zip_entry(&archive)?;
    parse_table_csv(&bytes, spec.name, spec.columns, year, month, spec.low_memory)
}

/// Columns named on the archive's `I` header row.
fn header_columns(bytes: &[u8]) -> Result<HashSet<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let header = reader
        .records()
        .nth(1)
        .transpose()
        .map_err(|err| NemdbError::processing(format!("unreadable archive header: {err}")))?
        .ok_or_else(|| NemdbError::processing("archive csv has no header row"))?;
    Ok(header.iter().map(str::to_string).collect())
}

/// Decodes an archive CSV: projects the configured columns, null-fills the
/// ones this vintage does not carry, parses timestamps and casts everything
/// to its storage dtype. The trailer row is dropped.
pub fn parse_table_csv(
    bytes: &[u8],
    table: &str,
    columns: &[&str],
    year: i32,
    month: u32,
    low_memory: bool,
) -> Result<DataFrame> {
    let available = header_columns(bytes)?;
    let present: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|name| available.contains(*name))
        .collect();
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|name| !available.contains(*name))
        .collect();
    if !missing.is_empty() {
        info!(
            table,
            year, month, ?missing, "columns not in this vintage, filling with nulls"
        );
    }

    let projection: Arc<[PlSmallStr]> = present
        .iter()
        .map(|name| PlSmallStr::from_str(name))
        .collect();
    let df = CsvReadOptions::default()
        .with_skip_rows(1)
        .with_has_header(true)
        .with_columns(Some(projection))
        .with_low_memory(low_memory)
        .with_ignore_errors(true)
        .map_parse_options(|opts| opts.with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;

    // "END OF REPORT" trailer
    let df = if df.height() > 0 {
        df.slice(0, df.height() - 1)
    } else {
        df
    };

    let mut lf = df.lazy();
    if !missing.is_empty() {
        let fills: Vec<Expr> = missing
            .iter()
            .map(|name| lit(NULL).cast(mmsdm_dtype(name)).alias(*name))
            .collect();
        lf = lf.with_columns(fills);
    }

    let casts: Vec<Expr> = columns
        .iter()
        .map(|name| {
            let dtype = mmsdm_dtype(name);
            if is_temporal(&dtype) && present.contains(name) {
                parse_timestamp(col(*name)).cast(dtype).alias(*name)
            } else {
                col(*name).cast(dtype).alias(*name)
            }
        })
        .collect();
    Ok(lf.with_columns(casts).select([cols(columns.to_vec())]).collect()?)
}

fn parse_timestamp(expr: Expr) -> Expr {
    expr.str().to_datetime(
        Some(TimeUnit::Microseconds),
        None,
        StrptimeOptions {
            format: Some(STRPTIME.into()),
            strict: false,
            exact: true,
            cache: true,
        },
        lit("raise"),
    )
}

/// Daily BIDMOVE_COMPLETE report: returns `(price_bids, volume_bids)`, the
/// day offer and period offer sections of the file.
pub fn read_bids(config: &Config, year: i32, month: u32, day: u32) -> Result<(DataFrame, DataFrame)> {
    let stem = format!("PUBLIC_BIDMOVE_COMPLETE_{year}{month:02}{day:02}");
    let files = list_available_files(BIDMOVE_URL, ".zip")?;
    let url = files.iter().find(|f| f.contains(&stem)).ok_or_else(|| {
        NemdbError::processing(format!(
            "no BIDMOVE_COMPLETE file published for {year}-{month:02}-{day:02}"
        ))
    })?;
    let path = cache_response_zip(config, url)?;
    let bytes = read_zip_entry(&path)?;
    split_bid_sections(&bytes)
}

/// Splits a multi-section AEMO report into per-`I`-row frames and returns
/// the first two sections.
pub fn split_bid_sections(bytes: &[u8]) -> Result<(DataFrame, DataFrame)> {
    let mut sections: Vec<Vec<u8>> = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    for line in bytes.split(|b| *b == b'\n') {
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };
        match line.first() {
            Some(b'I') => {
                if !current.is_empty() {
                    sections.push(std::mem::take(&mut current));
                }
                current.extend_from_slice(line);
                current.push(b'\n');
            }
            Some(b'D') => {
                current.extend_from_slice(line);
                current.push(b'\n');
            }
            _ => {}
        }
    }
    if !current.is_empty() {
        sections.push(current);
    }
    if sections.len() < 2 {
        return Err(NemdbError::processing(
            "bid report did not contain price and volume sections",
        ));
    }
    let mut frames = sections.into_iter();
    let price = parse_section(frames.next().unwrap_or_default())?;
    let volume = parse_section(frames.next().unwrap_or_default())?;
    Ok((price, volume))
}

fn parse_section(bytes: Vec<u8>) -> Result<DataFrame> {
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .with_ignore_errors(true)
        .map_parse_options(|opts| opts.with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?)
}

/// Half-hourly regional demand from the current HistDemand reports, one
/// column per region.
pub fn read_demand_actuals() -> Result<DataFrame> {
    let files = list_available_files(HISTDEMAND_CURRENT_URL, ".zip")?;
    let mut frames = Vec::new();
    for url in &files {
        match with_retry(2, Duration::from_secs(1), || fetch_report_csv(url)) {
            Ok(df) => frames.push(df.lazy()),
            Err(err) => warn!(url, %err, "skipping report file"),
        }
    }
    if frames.is_empty() {
        return Err(NemdbError::processing("no demand report could be read"));
    }
    let df = concat(
        frames,
        UnionArgs {
            diagonal: true,
            ..Default::default()
        },
    )?
    .collect()?;
    process_demand(df)
}

/// Archived HistDemand publications are zips of zips of report CSVs.
pub fn read_archived_demand_actuals() -> Result<DataFrame> {
    read_archived_hist_demand()
}

/// The rooftop PV history shares the HistDemand publication layout.
pub fn read_archived_rooftop_pv() -> Result<DataFrame> {
    read_archived_hist_demand()
}

fn read_archived_hist_demand() -> Result<DataFrame> {
    let files = list_available_files(HISTDEMAND_ARCHIVE_URL, ".zip")?;
    let mut frames = Vec::new();
    for url in &files {
        let outer = http_get_bytes(url)?;
        let mut archive = ZipArchive::new(Cursor::new(outer))?;
        for index in 0..archive.len() {
            let mut inner = Vec::new();
            archive.by_index(index)?.read_to_end(&mut inner)?;
            let csv_bytes = first_zip_entry(Cursor::new(inner))?;
            let df = read_report_csv(&csv_bytes)?;
            frames.push(process_demand(df)?.lazy());
        }
    }
    if frames.is_empty() {
        return Err(NemdbError::processing("no archived demand files found"));
    }
    Ok(concat(
        frames,
        UnionArgs {
            diagonal: true,
            ..Default::default()
        },
    )?
    .collect()?)
}

/// Latest (or a chosen day's) half-hourly operational demand forecast,
/// deduplicated to the most recent LOAD_DATE per interval and region.
pub fn read_demand_forecast(date: Option<&str>) -> Result<DataFrame> {
    let files = list_available_files(FORECAST_URL, ".zip")?;
    let selected: Vec<String> = match date {
        None => files.last().cloned().into_iter().collect(),
        Some(day) => files.iter().filter(|f| f.contains(day)).cloned().collect(),
    };
    if selected.is_empty() {
        return Err(NemdbError::processing("no forecast file matches the date"));
    }
    let mut frames = Vec::new();
    for url in &selected {
        match with_retry(2, Duration::from_secs(1), || fetch_report_csv(url)) {
            Ok(df) => frames.push(df.lazy()),
            Err(err) => warn!(url, %err, "skipping forecast file"),
        }
    }
    if frames.is_empty() {
        return Err(NemdbError::processing("no forecast report could be read"));
    }
    let df = concat(
        frames,
        UnionArgs {
            diagonal: true,
            ..Default::default()
        },
    )?
    .collect()?;

    Ok(df
        .lazy()
        .drop_nulls(None)
        .sort(
            ["LOAD_DATE", "INTERVAL_DATETIME", "REGIONID"],
            SortMultipleOptions::default().with_order_descending_multi([true, false, false]),
        )
        .group_by_stable([col("INTERVAL_DATETIME"), col("REGIONID")])
        .agg([
            col("OPERATIONAL_DEMAND_POE10").first(),
            col("OPERATIONAL_DEMAND_POE50").first(),
            col("OPERATIONAL_DEMAND_POE90").first(),
        ])
        .with_columns([parse_timestamp(col("INTERVAL_DATETIME"))])
        .sort(
            ["INTERVAL_DATETIME", "REGIONID"],
            SortMultipleOptions::default(),
        )
        .collect()?)
}

fn fetch_report_csv(url: &str) -> Result<DataFrame> {
    let bytes = http_get_bytes(url)?;
    // report links can point at a raw csv or a single-file zip
    let csv_bytes = if bytes.starts_with(b"PK") {
        first_zip_entry(Cursor::new(bytes))?
    } else {
        bytes
    };
    read_report_csv(&csv_bytes)
}

fn read_report_csv(bytes: &[u8]) -> Result<DataFrame> {
    Ok(CsvReadOptions::default()
        .with_skip_rows(1)
        .with_has_header(true)
        .with_ignore_errors(true)
        .map_parse_options(|opts| opts.with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?)
}

/// Sums demand over duplicate report rows, stamps interval-ending times and
/// pivots to one column per region.
pub(crate) fn process_demand(df: DataFrame) -> Result<DataFrame> {
    // pandas-era exports carry the interval demand in a duplicated column
    let value_col = if df.get_column_names_str().contains(&"DEMAND_duplicated_0") {
        "DEMAND_duplicated_0"
    } else {
        "DEMAND"
    };
    let aggregated = df
        .lazy()
        .drop_nulls(None)
        .group_by([col("REGIONID"), col("SETTLEMENTDATE"), col("PERIODID")])
        .agg([col(value_col).sum().alias("DEMAND")])
        .with_columns([
            parse_timestamp(col("SETTLEMENTDATE")),
            col("PERIODID").cast(DataType::Int64),
        ])
        .with_columns([
            // interval end = settlement day + periodid half hours
            (col("SETTLEMENTDATE").cast(DataType::Int64)
                + col("PERIODID") * lit(30i64 * 60 * 1_000_000))
            .cast(DataType::Datetime(TimeUnit::Microseconds, None))
            .alias("time"),
        ])
        .collect()?;
    let wide = pivot_stable(
        &aggregated,
        ["REGIONID"],
        Some(["time"]),
        Some(["DEMAND"]),
        true,
        None,
        None,
    )?;
    Ok(wide
        .lazy()
        .sort(["time"], SortMultipleOptions::default())
        .collect()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn micros(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
            .and_utc()
            .timestamp_micros()
    }

    const DISPATCHPRICE_CSV: &str = "\
C,NEMP.WORLD,DISPATCHPRICE,AEMO,PUBLIC,2020/02/01,00:00:00\n\
I,DISPATCH,PRICE,1,SETTLEMENTDATE,REGIONID,RRP,ROP\n\
D,DISPATCH,PRICE,1,2020/01/10 12:35:00,NSW1,45.5,45.5\n\
D,DISPATCH,PRICE,1,2020/01/10 12:35:00,VIC1,40.25,40.25\n\
C,END OF REPORT,4\n";

    #[test]
    fn archive_table_projects_parses_and_null_fills() {
        let columns = ["SETTLEMENTDATE", "REGIONID", "RRP", "LOWERREGROP"];
        let df = parse_table_csv(
            DISPATCHPRICE_CSV.as_bytes(),
            "DISPATCHPRICE",
            &columns,
            2020,
            1,
            false,
        )
        .unwrap();

        assert_eq!(df.get_column_names_str(), columns.to_vec());
        // trailer row dropped
        assert_eq!(df.height(), 2);
        assert_eq!(
            df.column("SETTLEMENTDATE").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Microseconds, None)
        );
        assert_eq!(
            df.column("SETTLEMENTDATE").unwrap().datetime().unwrap().get(0),
            Some(micros(2020, 1, 10, 12, 35, 0))
        );
        assert!(matches!(
            df.column("REGIONID").unwrap().dtype(),
            DataType::Categorical(_, _)
        ));
        assert_eq!(df.column("RRP").unwrap().dtype(), &DataType::Float32);
        // column absent from this vintage
        assert_eq!(df.column("LOWERREGROP").unwrap().null_count(), 2);
    }

    #[test]
    fn bid_report_splits_into_price_and_volume_sections() {
        let report = "\
C,NEMP.WORLD,BIDMOVE_COMPLETE,AEMO,PUBLIC\n\
I,BID,BIDDAYOFFER,2,SETTLEMENTDATE,DUID,BIDTYPE,PRICEBAND1\n\
D,BID,BIDDAYOFFER,2,2020/01/10 00:00:00,UNIT1,ENERGY,-1000\n\
I,BID,BIDPEROFFER,2,INTERVAL_DATETIME,DUID,BIDTYPE,ROCUP,ROCDOWN,MAXAVAIL\n\
D,BID,BIDPEROFFER,2,2020/01/10 00:05:00,UNIT1,ENERGY,3,3,100\n\
D,BID,BIDPEROFFER,2,2020/01/10 00:10:00,UNIT1,ENERGY,3,3,120\n\
C,END OF REPORT,6\n";
        let (price, volume) = split_bid_sections(report.as_bytes()).unwrap();
        assert_eq!(price.height(), 1);
        assert_eq!(volume.height(), 2);
        assert!(price
            .get_column_names_str()
            .contains(&"PRICEBAND1"));
        assert!(volume.get_column_names_str().contains(&"MAXAVAIL"));
    }

    #[test]
    fn demand_reports_pivot_to_regions() {
        let df = df!(
            "REGIONID" => ["NSW1", "NSW1", "VIC1"],
            "SETTLEMENTDATE" => ["2020/01/10 00:00:00", "2020/01/10 00:00:00", "2020/01/10 00:00:00"],
            "PERIODID" => [1i64, 2, 1],
            "DEMAND" => [7000.0, 7100.0, 5000.0],
        )
        .unwrap();
        let wide = process_demand(df).unwrap();

        assert_eq!(wide.height(), 2);
        let names = wide.get_column_names_str();
        assert!(names.contains(&"time"));
        assert!(names.contains(&"NSW1"));
        assert!(names.contains(&"VIC1"));
        // interval-ending stamps, sorted
        assert_eq!(
            wide.column("time").unwrap().datetime().unwrap().get(0),
            Some(micros(2020, 1, 10, 0, 30, 0))
        );
        assert_eq!(
            wide.column("time").unwrap().datetime().unwrap().get(1),
            Some(micros(2020, 1, 10, 1, 0, 0))
        );
    }
}

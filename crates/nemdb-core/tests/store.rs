use chrono::NaiveDate;
use polars::prelude::*;

use nemdb_core::store::{DataSource, DnspDataSource, QueryKind, TableSpec};
use nemdb_core::{Config, Filesystem};

const PRICES: TableSpec = TableSpec {
    name: "DISPATCHPRICE",
    columns: &["SETTLEMENTDATE", "REGIONID", "RRP"],
    primary_keys: &["SETTLEMENTDATE", "REGIONID"],
    extra_partitions: &[],
    query: QueryKind::BySettlementDate,
    low_memory: false,
};

const DETAILS: TableSpec = TableSpec {
    name: "DUDETAIL",
    columns: &["DUID", "EFFECTIVEDATE", "VERSIONNO", "REGISTEREDCAPACITY"],
    primary_keys: &["VERSIONNO", "DUID"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

const DAY_OFFERS: TableSpec = TableSpec {
    name: "BIDDAYOFFER_D",
    columns: &["SETTLEMENTDATE", "DUID", "PRICEBAND1"],
    primary_keys: &["DUID"],
    extra_partitions: &[],
    query: QueryKind::BySettlementDay,
    low_memory: false,
};

const SUMMARIES: TableSpec = TableSpec {
    name: "DUDETAILSUMMARY",
    columns: &["DUID", "START_DATE", "END_DATE", "REGIONID"],
    primary_keys: &["END_DATE", "DUID"],
    extra_partitions: &[],
    query: QueryKind::ByStartEnd,
    low_memory: false,
};

const PERIOD_OFFERS: TableSpec = TableSpec {
    name: "BIDPEROFFER_D",
    columns: &["INTERVAL_DATETIME", "DUID", "MAXAVAIL"],
    primary_keys: &["INTERVAL_DATETIME", "DUID"],
    extra_partitions: &[],
    query: QueryKind::ByIntervalDateTime,
    low_memory: false,
};

const LOADS: TableSpec = TableSpec {
    name: "ZONE_SUBSTATION",
    columns: &["time", "zss", "mw", "network"],
    primary_keys: &["zss", "time"],
    extra_partitions: &["network"],
    query: QueryKind::Full,
    low_memory: false,
};

fn micros(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
        .and_utc()
        .timestamp_micros()
}

fn datetime_series(name: &str, stamps: Vec<i64>) -> Series {
    Series::new(name.into(), stamps)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .unwrap()
}

fn price_frame() -> DataFrame {
    DataFrame::new(vec![
        datetime_series(
            "SETTLEMENTDATE",
            vec![
                micros(2020, 1, 10, 12, 35),
                micros(2020, 1, 10, 12, 35),
                micros(2020, 1, 10, 12, 40),
            ],
        )
        .into(),
        Series::new("REGIONID".into(), ["NSW1", "VIC1", "NSW1"]).into(),
        Series::new("RRP".into(), [42.5f32, 39.1, 44.0]).into(),
    ])
    .unwrap()
}

#[test]
fn partitions_land_on_disk_and_scan_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path(), Filesystem::Local);
    let source = DataSource::new(config, PRICES).unwrap();

    source.insert_frame(price_frame(), 2020, 1).unwrap();

    let partition = dir
        .path()
        .join("DISPATCHPRICE")
        .join("year=2020")
        .join("month=1");
    assert!(partition.join("DISPATCHPRICE-0.parquet").exists());

    let df = source.read().unwrap();
    assert_eq!(df.height(), 3);
    // hive columns come back from the directory names
    let years = df.column("year").unwrap();
    assert_eq!(years.null_count(), 0);
}

#[test]
fn settlement_date_query_returns_one_interval() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path(), Filesystem::Local);
    let source = DataSource::new(config, PRICES).unwrap();
    source.insert_frame(price_frame(), 2020, 1).unwrap();

    let interval = source.get_data("2020/01/10 12:35:00").unwrap();
    assert_eq!(interval.height(), 2);

    let empty = source.get_data("2020/01/11 12:35:00").unwrap();
    assert_eq!(empty.height(), 0);

    assert!(source.get_data("not a date").is_err());
}

#[test]
fn effective_date_query_keeps_the_latest_version() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path(), Filesystem::Local);
    let source = DataSource::new(config, DETAILS).unwrap();

    let days = vec![
        NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(2019, 12, 1).unwrap(),
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
    ];
    let df = DataFrame::new(vec![
        Series::new("DUID".into(), ["BW01", "BW01", "BW01"]).into(),
        Series::new("EFFECTIVEDATE".into(), days).into(),
        Series::new("VERSIONNO".into(), [1i32, 2, 3]).into(),
        Series::new("REGISTEREDCAPACITY".into(), [660.0f32, 680.0, 700.0]).into(),
    ])
    .unwrap();
    source.insert_frame(df, 2019, 6).unwrap();

    // the 2021 version is not yet effective in 2020
    let current = source.get_data("2020/01/10").unwrap();
    assert_eq!(current.height(), 1);
    let version = current.column("VERSIONNO").unwrap().i32().unwrap();
    assert_eq!(version.get(0), Some(2));
}

#[test]
fn market_day_rolls_over_at_four_am() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path(), Filesystem::Local);
    let source = DataSource::new(config, DAY_OFFERS).unwrap();

    // daily offers settle at midnight of their market day
    let df = DataFrame::new(vec![
        datetime_series(
            "SETTLEMENTDATE",
            vec![micros(2020, 1, 9, 0, 0), micros(2020, 1, 10, 0, 0)],
        )
        .into(),
        Series::new("DUID".into(), ["BW01", "BW01"]).into(),
        Series::new("PRICEBAND1".into(), [-1000.0f32, -995.0]).into(),
    ])
    .unwrap();
    source.insert_frame(df, 2020, 1).unwrap();

    let day_of = |date: &str| {
        let rows = source.get_data(date).unwrap();
        assert_eq!(rows.height(), 1);
        rows.column("PRICEBAND1").unwrap().f32().unwrap().get(0)
    };

    // interval-ending convention: up to and including 04:00 belongs to
    // the previous market day
    assert_eq!(day_of("2020/01/10 03:59:59"), Some(-1000.0));
    assert_eq!(day_of("2020/01/10 04:00:00"), Some(-1000.0));
    assert_eq!(day_of("2020/01/10 04:05:00"), Some(-995.0));
    // a bare date queries from midnight, so it also rolls back
    assert_eq!(day_of("2020/01/10"), Some(-1000.0));
}

#[test]
fn start_end_window_keeps_open_records_visible() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path(), Filesystem::Local);
    let source = DataSource::new(config, SUMMARIES).unwrap();

    let starts = vec![
        NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
    ];
    let ends = vec![NaiveDate::from_ymd_opt(2019, 12, 31), None];
    let df = DataFrame::new(vec![
        Series::new("DUID".into(), ["RETIRED1", "BW01"]).into(),
        Series::new("START_DATE".into(), starts).into(),
        Series::new("END_DATE".into(), ends).into(),
        Series::new("REGIONID".into(), ["NSW1", "NSW1"]).into(),
    ])
    .unwrap();
    source.insert_frame(df, 2019, 1).unwrap();

    // before the open record starts, only the closed window matches
    let early = source.get_data("2019/03/01").unwrap();
    assert_eq!(early.height(), 1);
    let duid = early.column("DUID").unwrap().str().unwrap();
    assert_eq!(duid.get(0), Some("RETIRED1"));

    // long after both started, the null END_DATE record is still current
    let late = source.get_data("2024/05/05").unwrap();
    assert_eq!(late.height(), 1);
    let duid = late.column("DUID").unwrap().str().unwrap();
    assert_eq!(duid.get(0), Some("BW01"));
}

#[test]
fn interval_datetime_query_filters_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path(), Filesystem::Local);
    let source = DataSource::new(config, PERIOD_OFFERS).unwrap();

    let df = DataFrame::new(vec![
        datetime_series(
            "INTERVAL_DATETIME",
            vec![micros(2020, 1, 10, 12, 35), micros(2020, 1, 10, 12, 40)],
        )
        .into(),
        Series::new("DUID".into(), ["BW01", "BW01"]).into(),
        Series::new("MAXAVAIL".into(), [100.0f32, 120.0]).into(),
    ])
    .unwrap();
    source.insert_frame(df, 2020, 1).unwrap();

    let interval = source.get_data("2020/01/10 12:40:00").unwrap();
    assert_eq!(interval.height(), 1);
    let avail = interval.column("MAXAVAIL").unwrap().f32().unwrap();
    assert_eq!(avail.get(0), Some(120.0));
}

#[test]
fn zone_substation_partitions_by_network_and_year() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path(), Filesystem::Local);
    let source = DnspDataSource::new(config, LOADS).unwrap();

    let df = DataFrame::new(vec![
        datetime_series("time", vec![micros(2024, 3, 1, 0, 30)]).into(),
        Series::new("zss".into(), ["ANT"]).into(),
        Series::new("mw".into(), [12.5f32]).into(),
    ])
    .unwrap();
    source.insert_frame("energex", df, 2024).unwrap();

    let partition = dir
        .path()
        .join("ZONE_SUBSTATION")
        .join("network=energex")
        .join("year=2024");
    assert!(partition.join("ZONE_SUBSTATION-0.parquet").exists());

    let back = source.read().unwrap();
    assert_eq!(back.height(), 1);
    let networks = back.column("network").unwrap().str().unwrap();
    assert_eq!(networks.get(0), Some("energex"));
}

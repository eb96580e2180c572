use std::io::{Cursor, Write};

use calamine::{Data, Range};
use chrono::NaiveDate;
use polars::prelude::*;
use ::zip::write::FileOptions;
use ::zip::ZipWriter;

use crate::errors::DnspError;
use crate::model::{conform_load_frame, LOAD_COLUMNS};
use crate::networks::{
    ausgrid, ausnet, cppal, endeavour, energex, essential_energy, jemena, sapn, tasnetworks,
    united_energy,
};
use crate::registry::adapters;

fn make_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .expect("start zip entry");
        writer.write_all(content.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

fn micros(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
        .and_utc()
        .timestamp_micros()
}

fn mw_values(df: &DataFrame) -> Vec<Option<f32>> {
    df.column("mw").unwrap().f32().unwrap().into_iter().collect()
}

fn time_values(df: &DataFrame) -> Vec<Option<i64>> {
    df.column("time")
        .unwrap()
        .datetime()
        .unwrap()
        .into_iter()
        .collect()
}

#[test]
fn registry_has_every_network_once() {
    let names: Vec<&str> = adapters().iter().map(|a| a.name()).collect();
    assert_eq!(names.len(), 11);
    let mut unique = names.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn manual_download_networks_explain_themselves() {
    for adapter in adapters() {
        if matches!(adapter.name(), "cppal" | "essential_energy") {
            let err = adapter.read_all_zss(2024).unwrap_err();
            assert!(matches!(err, DnspError::ManualDownload { .. }), "{err}");
        }
    }
}

#[test]
fn conform_fills_missing_measures_and_orders_columns() {
    let df = df!(
        "time" => [micros(2023, 7, 1, 0, 30)],
        "zss" => ["NPS"],
        "mw" => [1.5f64],
    )
    .unwrap()
    .lazy()
    .with_columns([col("time").cast(DataType::Datetime(TimeUnit::Microseconds, None))])
    .collect()
    .unwrap();

    let out = conform_load_frame("test", df).unwrap();
    assert_eq!(out.get_column_names_str(), LOAD_COLUMNS.to_vec());
    assert_eq!(out.column("mvar").unwrap().null_count(), 1);
    assert_eq!(out.column("mw").unwrap().dtype(), &DataType::Float32);
}

#[test]
fn conform_rejects_empty_and_incomplete_frames() {
    let empty = df!("zss" => Vec::<String>::new(), "time" => Vec::<i64>::new()).unwrap();
    assert!(matches!(
        conform_load_frame("test", empty),
        Err(DnspError::Empty { .. })
    ));

    let no_station = df!("time" => [1i64], "mw" => [1.0f64]).unwrap();
    assert!(matches!(
        conform_load_frame("test", no_station),
        Err(DnspError::MissingColumn { .. })
    ));
}

#[test]
fn ausgrid_unpivots_half_hours_and_keeps_only_mw() {
    let csv = "Zone Substation,Date,Year,Unit,00:30,24:00\n\
               NPS,2023-07-01,2023,MW,1.5,2.0\n\
               NPS,2023-07-01,2023,Amps,10,20\n";
    let bytes = make_zip(&[("FY2024/NPS.csv", csv)]);
    let df = ausgrid::read_archive(&bytes).unwrap();

    assert_eq!(df.get_column_names_str(), LOAD_COLUMNS.to_vec());
    assert_eq!(df.height(), 2);
    let times = time_values(&df);
    assert!(times.contains(&Some(micros(2023, 7, 1, 0, 30))));
    // "24:00" readings roll over to midnight
    assert!(times.contains(&Some(micros(2023, 7, 1, 0, 0))));
    let total: f32 = mw_values(&df).into_iter().flatten().sum();
    assert_eq!(total, 3.5);
}

#[test]
fn ausnet_station_csv_parses_and_sorts() {
    let csv = "01-Jul-2023,00:30,1.25\n01-Jul-2023,24:00,2.0\n";
    let df = ausnet::read_station_csv(csv.as_bytes()).unwrap();
    assert_eq!(df.height(), 2);
    let times = time_values(&df);
    // midnight sorts before half past
    assert_eq!(times[0], Some(micros(2023, 7, 1, 0, 0)));
    assert_eq!(times[1], Some(micros(2023, 7, 1, 0, 30)));
}

#[test]
fn cppal_archive_takes_station_from_entry_path() {
    let csv = "date_time,MW,MVAR,MVA\n2023-07-01 00:30:00,1.0,2.0,3.0\n";
    let bytes = make_zip(&[
        ("CP and PAL/NPS_2022-23.csv", csv),
        ("CP and PAL/readme.txt", "not a load file"),
    ]);
    let df = cppal::read_archive(&bytes).unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(
        df.column("zss").unwrap().str().unwrap().get(0),
        Some("NPS")
    );
    assert_eq!(df.column("mvar").unwrap().f32().unwrap().get(0), Some(2.0));
}

#[test]
fn endeavour_headerless_rows_parse() {
    let csv = "01/07/2023 00:30:00,1.5\n30/06/2023 23:30:00,2.5\n";
    let bytes = make_zip(&[("FY23/ALB ZS_FY23.csv", csv)]);
    let df = endeavour::read_archive(&bytes).unwrap();
    assert_eq!(df.height(), 2);
    assert_eq!(
        df.column("zss").unwrap().str().unwrap().get(0),
        Some("ALB")
    );
    // no reactive readings published
    assert_eq!(df.column("mva").unwrap().null_count(), 2);
}

#[test]
fn energex_entry_marker_and_projection() {
    let csv = "Date,Time,MW,MVA,Quality\n2023-07-01,00:30:00,1.5,2.0,good\n";
    let bytes = make_zip(&[("NPS_EGX_2023-24.csv", csv)]);
    let df = energex::read_archive(&bytes).unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(
        df.column("zss").unwrap().str().unwrap().get(0),
        Some("NPS")
    );
    assert_eq!(mw_values(&df), vec![Some(1.5)]);
    assert_eq!(df.column("mvar").unwrap().null_count(), 1);
}

#[test]
fn essential_energy_scales_kilowatts_down() {
    let csv = "Name,IntervalEnd,kW,kVAr\nNPS,2023-07-01T00:30:00.000Z,1500,500\n";
    let bytes = make_zip(&[("EE-loads.csv", csv)]);
    let df = essential_energy::read_archive(&bytes).unwrap();
    assert_eq!(mw_values(&df), vec![Some(1.5)]);
    assert_eq!(df.column("mvar").unwrap().f32().unwrap().get(0), Some(0.5));
    assert_eq!(time_values(&df), vec![Some(micros(2023, 7, 1, 0, 30))]);
}

#[test]
fn jemena_sheet_table_starts_at_from_row() {
    let mut range: Range<Data> = Range::new((0, 0), (2, 1));
    range.set_value((0, 0), Data::String("Station report".to_string()));
    range.set_value((1, 0), Data::String("From".to_string()));
    range.set_value((1, 1), Data::String("MW".to_string()));
    range.set_value((2, 0), Data::String("2023-07-01 00:30:00".to_string()));
    range.set_value((2, 1), Data::Float(1.5));

    let df = jemena::parse_sheet("NPS", "NPS Zone Substation.xlsx", &range).unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(time_values(&df), vec![Some(micros(2023, 7, 1, 0, 30))]);
    assert_eq!(df.column("mw").unwrap().f64().unwrap().get(0), Some(1.5));
}

#[test]
fn sapn_three_row_header_pivots_by_metric() {
    let csv = "Zone Substation Load Data,,,\n\
               Zone Sub Name,,NPS,\n\
               Associated Connection Point,,CP1,\n\
               Date,Time,MW.1,MVA\n\
               01/07/2023,00:30,1.5,2.5\n";
    let bytes = make_zip(&[("NPS.csv", csv)]);
    let df = sapn::read_archive(&bytes).unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(
        df.column("zss").unwrap().str().unwrap().get(0),
        Some("NPS")
    );
    // duplicate-suffixed metric labels fold back into MW
    assert_eq!(mw_values(&df), vec![Some(1.5)]);
    assert_eq!(df.column("mva").unwrap().f32().unwrap().get(0), Some(2.5));
    assert_eq!(df.column("mvar").unwrap().null_count(), 1);
}

#[test]
fn tasnetworks_station_codes_come_from_names() {
    let csv = ",Anytown (ANT),Unnamed: 2\n\
               ,MW,MVA\n\
               2023-07-01 00:30:00,1.5,2.5\n";
    let df = tasnetworks::read_report_csv(csv.as_bytes()).unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(
        df.column("zss").unwrap().str().unwrap().get(0),
        Some("ANT")
    );
    assert_eq!(
        df.column("name").unwrap().str().unwrap().get(0),
        Some("Anytown (ANT)")
    );
    assert_eq!(mw_values(&df), vec![Some(1.5)]);
}

#[test]
fn united_energy_lowercases_headers() {
    let csv = "DATE_TIME,MW,MVAR,MVA\n2023-07-01: 00:30,1.0,2.0,3.0\n";
    let bytes = make_zip(&[("UE/NPS_2022.csv", csv)]);
    let df = united_energy::read_archive(&bytes).unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(
        df.column("zss").unwrap().str().unwrap().get(0),
        Some("NPS")
    );
    assert_eq!(time_values(&df), vec![Some(micros(2023, 7, 1, 0, 30))]);
}

use std::io::Cursor;

use polars::prelude::*;
use tracing::warn;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::{concat_frames, fetch_bytes, midnight_fix, to_datetime_expr};

const NAME: &str = "ausnet";

/// Zone substations listed in the 2024 regulatory information notice.
/// https://www.aer.gov.au/documents/ausnet-services-d-2023-24-category-analysis-rin-templates
pub const ALL_ZSS: [&str; 54] = [
    "BDL", "BGE", "BN", "BRA", "BRT", "BWA", "BWN", "BWR", "CF", "CLN", "CNR", "CPK", "CRE",
    "CYN", "DRN", "ELM", "EPG", "FGY", "FTR", "HPK", "KLK", "KLO", "KMS", "LDL", "LGA", "LLG",
    "LYD", "MBY", "MFA", "MJG", "MOE", "MSD", "MYT", "NLA", "NRN", "OFR", "PHI", "PHM", "RUBA",
    "RWN", "SLE", "SMG", "SMR", "TGN", "TT", "WGI", "WGL", "WN", "WO", "WT", "WYK", "MDI",
    "MWL", "RVE",
];

/// Per-station export endpoint; there is no yearly archive.
pub struct AusnetAdapter;

fn station_url(zss: &str) -> String {
    format!("https://dapr.ausnetservices.com.au/export_all_load_trace_data.php?station={zss}")
}

impl NetworkAdapter for AusnetAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, _year: i32) -> Option<String> {
        None
    }

    fn read_all_zss(&self, _year: i32) -> Result<DataFrame, DnspError> {
        let mut frames = Vec::new();
        for zss in ALL_ZSS {
            let station = fetch_bytes(NAME, &station_url(zss))
                .and_then(|bytes| read_station_csv(&bytes))
                .and_then(|df| {
                    df.lazy()
                        .with_columns([lit(zss).alias("zss")])
                        .collect()
                        .map_err(DnspError::frame(NAME))
                });
            match station {
                Ok(df) => frames.push(df),
                Err(err) => warn!(network = NAME, zss, %err, "skipping station"),
            }
        }
        conform_load_frame(NAME, concat_frames(NAME, frames)?)
    }
}

/// Headerless `date,time,mw` rows for a single station.
pub fn read_station_csv(bytes: &[u8]) -> Result<DataFrame, DnspError> {
    let err = DnspError::frame(NAME);
    let mut df = CsvReadOptions::default()
        .with_has_header(false)
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(&err)?;
    df.set_column_names(["date", "time", "mw"]).map_err(&err)?;
    df.lazy()
        .with_columns([to_datetime_expr(
            concat_str([col("date"), midnight_fix(col("time"))], " ", true),
            "%d-%b-%Y %H:%M",
        )
        .alias("time")])
        .select([col("time"), col("mw")])
        .sort(["time"], SortMultipleOptions::default())
        .collect()
        .map_err(&err)
}

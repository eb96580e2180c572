use std::io::Cursor;

use polars::prelude::*;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::{to_datetime_expr, zip_file_entries};

const NAME: &str = "essential_energy";

const INSTRUCTIONS: &str = "Essential Energy blocks scripted downloads; fetch \
https://www.essentialenergy.com.au/ext/schools/EE-Zone-Substation-Load-Data-2023-24.zip \
in a browser and decode it with read_archive";

/// Single-CSV zip with kW/kVAr readings per station.
pub struct EssentialEnergyAdapter;

impl NetworkAdapter for EssentialEnergyAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, _year: i32) -> Option<String> {
        None
    }

    fn read_all_zss(&self, _year: i32) -> Result<DataFrame, DnspError> {
        Err(DnspError::ManualDownload {
            network: NAME,
            instructions: INSTRUCTIONS,
        })
    }
}

/// Decodes a manually downloaded archive. Readings are published in kW and
/// kVAr and scaled down to MW/MVAr here.
pub fn read_archive(bytes: &[u8]) -> Result<DataFrame, DnspError> {
    let err = DnspError::frame(NAME);
    let (_, data) = zip_file_entries(NAME, bytes)?
        .into_iter()
        .find(|(name, _)| name.ends_with(".csv"))
        .ok_or_else(|| DnspError::Empty { network: NAME })?;
    let projection: std::sync::Arc<[PlSmallStr]> = ["Name", "IntervalEnd", "kW", "kVAr"]
        .iter()
        .map(|name| PlSmallStr::from_str(name))
        .collect();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_columns(Some(projection))
        .into_reader_with_file_handle(Cursor::new(data))
        .finish()
        .map_err(&err)?;
    let frame = df
        .lazy()
        .with_columns([
            (col("kW").cast(DataType::Float32) / lit(1000.0f32)).alias("mw"),
            (col("kVAr").cast(DataType::Float32) / lit(1000.0f32)).alias("mvar"),
            to_datetime_expr(col("IntervalEnd"), "%Y-%m-%dT%H:%M:%S%.3fZ").alias("time"),
        ])
        .select([
            col("Name").alias("zss"),
            col("time"),
            col("mw"),
            col("mvar"),
        ])
        .collect()
        .map_err(&err)?;
    conform_load_frame(NAME, frame)
}

use polars::prelude::DataFrame;

use crate::errors::DnspError;
use crate::model::conform_load_frame;
use crate::registry::NetworkAdapter;

use super::{fetch_bytes, read_date_time_archive};

const NAME: &str = "ergon";

pub struct ErgonAdapter;

impl NetworkAdapter for ErgonAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn url(&self, year: i32) -> Option<String> {
        match year {
            2024 => Some(
                "https://www.ergon.com.au/__data/assets/file/0007/1385755/Ergon-Energy-Network-Zone-Substation-Data-2023-24.zip"
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
    conform_load_frame(NAME, read_date_time_archive(NAME, bytes, "_EECL_")?)
}

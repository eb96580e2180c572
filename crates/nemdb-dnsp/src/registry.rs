use polars::prelude::DataFrame;
use tracing::error;

use crate::errors::DnspError;
use crate::networks::{
    AusgridAdapter, AusnetAdapter, CppalAdapter, EndeavourAdapter, EnergexAdapter, ErgonAdapter,
    EssentialEnergyAdapter, JemenaAdapter, SapnAdapter, TasnetworksAdapter, UnitedEnergyAdapter,
};

/// One distribution network's zone substation load publication.
///
/// Each network publishes load traces in its own layout (yearly zip of CSVs,
/// per-station exports, spreadsheets); implementations hide that behind a
/// single frame conforming to [`crate::LOAD_COLUMNS`].
pub trait NetworkAdapter {
    /// Network identifier used as the `network` partition value.
    fn name(&self) -> &'static str;

    /// Download URL for the published archive covering `year`, when one exists.
    fn url(&self, year: i32) -> Option<String>;

    /// Fetches and decodes every zone substation load trace for `year`.
    fn read_all_zss(&self, year: i32) -> Result<DataFrame, DnspError>;
}

/// Every known network adapter, in registration order.
pub fn adapters() -> Vec<Box<dyn NetworkAdapter>> {
    vec![
        Box::new(AusgridAdapter),
        Box::new(AusnetAdapter),
        Box::new(CppalAdapter),
        Box::new(EndeavourAdapter),
        Box::new(EnergexAdapter),
        Box::new(ErgonAdapter),
        Box::new(EssentialEnergyAdapter),
        Box::new(JemenaAdapter),
        Box::new(SapnAdapter),
        Box::new(TasnetworksAdapter),
        Box::new(UnitedEnergyAdapter),
    ]
}

/// Runs every adapter for `year`, logging and skipping the ones that fail.
///
/// Networks publish on their own schedules, so a missing year on one network
/// must not block the others.
pub fn read_all_zss(year: i32) -> Vec<(&'static str, DataFrame)> {
    let mut frames = Vec::new();
    for adapter in adapters() {
        match adapter.read_all_zss(year) {
            Ok(df) => frames.push((adapter.name(), df)),
            Err(err) => {
                error!(network = adapter.name(), %err, "skipping zone substation source");
            }
        }
    }
    frames
}

//! Top-level handle over every dataset the toolkit mirrors.

use chrono::{Datelike, NaiveDateTime};
use polars::enable_string_cache;
use polars::prelude::*;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dates::DateRange;
use crate::error::{NemdbError, Result};
use crate::mmsdm;
use crate::store::{DataSource, DnspDataSource, QueryKind, TableSpec};

pub const DISPATCHREGIONSUM: TableSpec = TableSpec {
    name: "DISPATCHREGIONSUM",
    columns: &[
        "SETTLEMENTDATE",
        "REGIONID",
        "TOTALDEMAND",
        "DEMANDFORECAST",
        "INITIALSUPPLY",
        "SS_SOLAR_AVAILABILITY",
        "SS_WIND_AVAILABILITY",
    ],
    primary_keys: &["SETTLEMENTDATE", "REGIONID"],
    extra_partitions: &[],
    query: QueryKind::BySettlementDate,
    low_memory: false,
};

pub const DISPATCHLOAD: TableSpec = TableSpec {
    name: "DISPATCHLOAD",
    columns: &[
        "SETTLEMENTDATE",
        "DUID",
        "DISPATCHMODE",
        "AGCSTATUS",
        "INITIALMW",
        "TOTALCLEARED",
        "RAMPDOWNRATE",
        "RAMPUPRATE",
        "AVAILABILITY",
        "RAISEREGENABLEMENTMAX",
        "RAISEREGENABLEMENTMIN",
        "LOWERREGENABLEMENTMAX",
        "LOWERREGENABLEMENTMIN",
        "SEMIDISPATCHCAP",
        "LOWER5MIN",
        "LOWER60SEC",
        "LOWER6SEC",
        "LOWER1SEC",
        "RAISE5MIN",
        "RAISE60SEC",
        "RAISE6SEC",
        "RAISE1SEC",
        "LOWERREG",
        "RAISEREG",
        "RAISEREGAVAILABILITY",
        "RAISE6SECACTUALAVAILABILITY",
        "RAISE1SECACTUALAVAILABILITY",
        "RAISE60SECACTUALAVAILABILITY",
        "RAISE5MINACTUALAVAILABILITY",
        "RAISEREGACTUALAVAILABILITY",
        "LOWER6SECACTUALAVAILABILITY",
        "LOWER1SECACTUALAVAILABILITY",
        "UIGF",
    ],
    primary_keys: &["SETTLEMENTDATE", "DUID"],
    extra_partitions: &["DUID"],
    query: QueryKind::BySettlementDate,
    low_memory: false,
};

pub const DISPATCHPRICE: TableSpec = TableSpec {
    name: "DISPATCHPRICE",
    columns: &[
        "SETTLEMENTDATE",
        "REGIONID",
        "RRP",
        "ROP",
        "RAISE6SECROP",
        "RAISE1SECROP",
        "RAISE60SECROP",
        "RAISE5MINROP",
        "RAISEREGROP",
        "LOWER6SECROP",
        "LOWER1SECROP",
        "LOWER60SECROP",
        "LOWER5MINROP",
        "LOWERREGROP",
    ],
    primary_keys: &["SETTLEMENTDATE", "REGIONID"],
    extra_partitions: &[],
    query: QueryKind::BySettlementDate,
    low_memory: false,
};

pub const RESERVE: TableSpec = TableSpec {
    name: "RESERVE",
    columns: &[
        "SETTLEMENTDATE",
        "VERSIONNO",
        "REGIONID",
        "PERIODID",
        "LOWER5MIN",
        "RAISE5MIN",
        "RAISEREG",
        "LOWERREG",
    ],
    primary_keys: &["SETTLEMENTDATE", "REGIONID"],
    extra_partitions: &[],
    query: QueryKind::BySettlementDate,
    low_memory: false,
};

pub const GENUNITS: TableSpec = TableSpec {
    name: "GENUNITS",
    columns: &[
        "GENSETID",
        "STATIONID",
        "VOLTLEVEL",
        "DISPATCHTYPE",
        "STARTTYPE",
        "NORMALSTATUS",
        "MAXCAPACITY",
        "GENSETTYPE",
        "GENSETNAME",
        "LOWERREG",
        "CO2E_EMISSIONS_FACTOR",
        "CO2E_ENERGY_SOURCE",
        "CO2E_DATA_SOURCE",
        "MINCAPACITY",
        "REGISTEREDMINCAPACITY",
        "LASTCHANGED",
    ],
    primary_keys: &["STATIONID", "LASTCHANGED"],
    extra_partitions: &[],
    query: QueryKind::Full,
    low_memory: false,
};

pub const DUDETAILSUMMARY: TableSpec = TableSpec {
    name: "DUDETAILSUMMARY",
    columns: &[
        "DUID",
        "START_DATE",
        "END_DATE",
        "DISPATCHTYPE",
        "CONNECTIONPOINTID",
        "REGIONID",
        "TRANSMISSIONLOSSFACTOR",
        "DISTRIBUTIONLOSSFACTOR",
        "SCHEDULE_TYPE",
        "MIN_RAMP_RATE_UP",
        "MIN_RAMP_RATE_DOWN",
        "MAX_RAMP_RATE_UP",
        "MAX_RAMP_RATE_DOWN",
        "IS_AGGREGATED",
    ],
    primary_keys: &["END_DATE", "REGIONID", "DUID"],
    extra_partitions: &[],
    query: QueryKind::ByStartEnd,
    low_memory: false,
};

pub const DUDETAIL: TableSpec = TableSpec {
    name: "DUDETAIL",
    columns: &[
        "DUID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "REGISTEREDCAPACITY",
        "MAXCAPACITY",
    ],
    primary_keys: &["VERSIONNO", "DUID"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const BIDDAYOFFER_D: TableSpec = TableSpec {
    name: "BIDDAYOFFER_D",
    columns: &[
        "DUID",
        "SETTLEMENTDATE",
        "BIDTYPE",
        "DIRECTION",
        "VERSIONNO",
        "PARTICIPANTID",
        "DAILYENERGYCONSTRAINT",
        "PRICEBAND1",
        "PRICEBAND2",
        "PRICEBAND3",
        "PRICEBAND4",
        "PRICEBAND5",
        "PRICEBAND6",
        "PRICEBAND7",
        "PRICEBAND8",
        "PRICEBAND9",
        "PRICEBAND10",
        "MINIMUMLOAD",
        "T1",
        "T2",
        "T3",
        "T4",
        "NORMALSTATUS",
        "ENTRYTYPE",
    ],
    primary_keys: &["VERSIONNO", "DUID"],
    extra_partitions: &[],
    query: QueryKind::BySettlementDate,
    low_memory: false,
};

pub const BIDPEROFFER_D: TableSpec = TableSpec {
    name: "BIDPEROFFER_D",
    columns: &[
        "DUID",
        "SETTLEMENTDATE",
        "BIDTYPE",
        "DIRECTION",
        "VERSIONNO",
        "INTERVAL_DATETIME",
        "MAXAVAIL",
        "FIXEDLOAD",
        "ROCUP",
        "ROCDOWN",
        "ENABLEMENTMIN",
        "ENABLEMENTMAX",
        "LOWBREAKPOINT",
        "HIGHBREAKPOINT",
        "BANDAVAIL1",
        "BANDAVAIL2",
        "BANDAVAIL3",
        "BANDAVAIL4",
        "BANDAVAIL5",
        "BANDAVAIL6",
        "BANDAVAIL7",
        "BANDAVAIL8",
        "BANDAVAIL9",
        "BANDAVAIL10",
        "ENERGYLIMIT",
        "LASTCHANGED",
    ],
    primary_keys: &["SETTLEMENTDATE", "DUID"],
    extra_partitions: &[],
    query: QueryKind::BySettlementDate,
    low_memory: true,
};

pub const DISPATCHCONSTRAINT: TableSpec = TableSpec {
    name: "DISPATCHCONSTRAINT",
    columns: &[
        "SETTLEMENTDATE",
        "CONSTRAINTID",
        "DUID",
        "RHS",
        "GENCONID_EFFECTIVEDATE",
        "GENCONID_VERSIONNO",
        "LHS",
        "VIOLATIONDEGREE",
        "MARGINALVALUE",
    ],
    primary_keys: &["SETTLEMENTDATE", "CONSTRAINTID"],
    extra_partitions: &[],
    query: QueryKind::BySettlementDate,
    low_memory: false,
};

pub const GENCONDATA: TableSpec = TableSpec {
    name: "GENCONDATA",
    columns: &[
        "GENCONID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "CONSTRAINTTYPE",
        "GENERICCONSTRAINTWEIGHT",
    ],
    primary_keys: &["GENCONID", "EFFECTIVEDATE", "VERSIONNO"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const SPDREGIONCONSTRAINT: TableSpec = TableSpec {
    name: "SPDREGIONCONSTRAINT",
    columns: &[
        "REGIONID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "GENCONID",
        "BIDTYPE",
        "FACTOR",
    ],
    primary_keys: &["REGIONID", "GENCONID", "EFFECTIVEDATE", "VERSIONNO", "BIDTYPE"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const SPDCONNECTIONPOINTCONSTRAINT: TableSpec = TableSpec {
    name: "SPDCONNECTIONPOINTCONSTRAINT",
    columns: &[
        "CONNECTIONPOINTID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "GENCONID",
        "BIDTYPE",
        "FACTOR",
    ],
    primary_keys: &[
        "CONNECTIONPOINTID",
        "GENCONID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "BIDTYPE",
    ],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const SPDINTERCONNECTORCONSTRAINT: TableSpec = TableSpec {
    name: "SPDINTERCONNECTORCONSTRAINT",
    columns: &[
        "INTERCONNECTORID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "GENCONID",
        "FACTOR",
    ],
    primary_keys: &["INTERCONNECTORID", "GENCONID", "EFFECTIVEDATE", "VERSIONNO"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const INTERCONNECTOR: TableSpec = TableSpec {
    name: "INTERCONNECTOR",
    columns: &["INTERCONNECTORID", "REGIONFROM", "REGIONTO"],
    primary_keys: &["INTERCONNECTORID"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const INTERCONNECTORCONSTRAINT: TableSpec = TableSpec {
    name: "INTERCONNECTORCONSTRAINT",
    columns: &[
        "INTERCONNECTORID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "FROMREGIONLOSSSHARE",
        "LOSSCONSTANT",
        "ICTYPE",
        "LOSSFLOWCOEFFICIENT",
        "IMPORTLIMIT",
        "EXPORTLIMIT",
    ],
    primary_keys: &["INTERCONNECTORID", "EFFECTIVEDATE", "VERSIONNO"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const LOSSMODEL: TableSpec = TableSpec {
    name: "LOSSMODEL",
    columns: &[
        "INTERCONNECTORID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "LOSSSEGMENT",
        "MWBREAKPOINT",
    ],
    primary_keys: &["INTERCONNECTORID", "EFFECTIVEDATE", "VERSIONNO"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const LOSSFACTORMODEL: TableSpec = TableSpec {
    name: "LOSSFACTORMODEL",
    columns: &[
        "INTERCONNECTORID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "REGIONID",
        "DEMANDCOEFFICIENT",
    ],
    primary_keys: &["INTERCONNECTORID", "EFFECTIVEDATE", "VERSIONNO"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const DISPATCHINTERCONNECTORRES: TableSpec = TableSpec {
    name: "DISPATCHINTERCONNECTORRES",
    columns: &["INTERCONNECTORID", "SETTLEMENTDATE", "MWFLOW", "MWLOSSES"],
    primary_keys: &["INTERCONNECTORID", "SETTLEMENTDATE"],
    extra_partitions: &[],
    query: QueryKind::BySettlementDate,
    low_memory: false,
};

pub const MNSP_INTERCONNECTOR: TableSpec = TableSpec {
    name: "MNSP_INTERCONNECTOR",
    columns: &[
        "INTERCONNECTORID",
        "LINKID",
        "EFFECTIVEDATE",
        "VERSIONNO",
        "FROMREGION",
        "TOREGION",
        "FROM_REGION_TLF",
        "TO_REGION_TLF",
        "LHSFACTOR",
        "MAXCAPACITY",
    ],
    primary_keys: &["INTERCONNECTORID", "LINKID", "EFFECTIVEDATE", "VERSIONNO"],
    extra_partitions: &[],
    query: QueryKind::ByEffectiveDateVersionNo,
    low_memory: false,
};

pub const ZONE_SUBSTATION: TableSpec = TableSpec {
    name: "ZONE_SUBSTATION",
    columns: &["time", "zss", "mw", "network"],
    primary_keys: &["zss", "time"],
    extra_partitions: &["network"],
    query: QueryKind::Full,
    low_memory: false,
};

/// Tables a `populate` run refreshes by default.
const ACTIVE_TABLES: [&str; 11] = [
    "DISPATCHREGIONSUM",
    "BIDDAYOFFER_D",
    "BIDPEROFFER_D",
    "DUDETAILSUMMARY",
    "DUDETAIL",
    "GENUNITS",
    "DISPATCHLOAD",
    "DISPATCHPRICE",
    "MNSP_INTERCONNECTOR",
    "RESERVE",
    "ZONE_SUBSTATION",
];

/// Interface over the historical inputs of NEM spot market dispatch,
/// backed by partitioned parquet datasets under one cache directory.
///
/// ```no_run
/// use nemdb_core::{Config, NemwebDb};
///
/// let db = NemwebDb::new(Config::default())?;
/// db.dispatchregionsum.add_data(2020, 1)?;
/// let interval = db.dispatchregionsum.get_data("2020/01/10 12:35:00")?;
/// # Ok::<(), nemdb_core::NemdbError>(())
/// ```
pub struct NemwebDb {
    config: Config,
    pub dispatchregionsum: DataSource,
    pub dispatchload: DataSource,
    pub dispatchprice: DataSource,
    pub reserve: DataSource,
    pub genunits: DataSource,
    pub dudetailsummary: DataSource,
    pub dudetail: DataSource,
    pub biddayoffer_d: DataSource,
    pub bidperoffer_d: DataSource,
    pub dispatchconstraint: DataSource,
    pub gencondata: DataSource,
    pub spdregionconstraint: DataSource,
    pub spdconnectionpointconstraint: DataSource,
    pub spdinterconnectorconstraint: DataSource,
    pub interconnector: DataSource,
    pub interconnectorconstraint: DataSource,
    pub lossmodel: DataSource,
    pub lossfactormodel: DataSource,
    pub dispatchinterconnectorres: DataSource,
    pub mnsp_interconnector: DataSource,
    pub zone_substation: DnspDataSource,
}

impl NemwebDb {
    pub fn new(config: Config) -> Result<Self> {
        config.ensure_cache_dir()?;
        Ok(NemwebDb {
            dispatchregionsum: DataSource::new(config.clone(), DISPATCHREGIONSUM)?,
            dispatchload: DataSource::new(config.clone(), DISPATCHLOAD)?,
            dispatchprice: DataSource::new(config.clone(), DISPATCHPRICE)?,
            reserve: DataSource::new(config.clone(), RESERVE)?,
            genunits: DataSource::new(config.clone(), GENUNITS)?,
            dudetailsummary: DataSource::new(config.clone(), DUDETAILSUMMARY)?,
            dudetail: DataSource::new(config.clone(), DUDETAIL)?,
            biddayoffer_d: DataSource::new(config.clone(), BIDDAYOFFER_D)?,
            bidperoffer_d: DataSource::new(config.clone(), BIDPEROFFER_D)?,
            dispatchconstraint: DataSource::new(config.clone(), DISPATCHCONSTRAINT)?,
            gencondata: DataSource::new(config.clone(), GENCONDATA)?,
            spdregionconstraint: DataSource::new(config.clone(), SPDREGIONCONSTRAINT)?,
            spdconnectionpointconstraint: DataSource::new(
                config.clone(),
                SPDCONNECTIONPOINTCONSTRAINT,
            )?,
            spdinterconnectorconstraint: DataSource::new(
                config.clone(),
                SPDINTERCONNECTORCONSTRAINT,
            )?,
            interconnector: DataSource::new(config.clone(), INTERCONNECTOR)?,
            interconnectorconstraint: DataSource::new(config.clone(), INTERCONNECTORCONSTRAINT)?,
            lossmodel: DataSource::new(config.clone(), LOSSMODEL)?,
            lossfactormodel: DataSource::new(config.clone(), LOSSFACTORMODEL)?,
            dispatchinterconnectorres: DataSource::new(config.clone(), DISPATCHINTERCONNECTORRES)?,
            mnsp_interconnector: DataSource::new(config.clone(), MNSP_INTERCONNECTOR)?,
            zone_substation: DnspDataSource::new(config.clone(), ZONE_SUBSTATION)?,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Table names a default `populate` run refreshes.
    pub fn active_tables() -> &'static [&'static str] {
        &ACTIVE_TABLES
    }

    /// MMSDM table lookup by name; ZONE_SUBSTATION lives on its own field.
    pub fn table(&self, name: &str) -> Option<&DataSource> {
        match name {
            "DISPATCHREGIONSUM" => Some(&self.dispatchregionsum),
            "DISPATCHLOAD" => Some(&self.dispatchload),
            "DISPATCHPRICE" => Some(&self.dispatchprice),
            "RESERVE" => Some(&self.reserve),
            "GENUNITS" => Some(&self.genunits),
            "DUDETAILSUMMARY" => Some(&self.dudetailsummary),
            "DUDETAIL" => Some(&self.dudetail),
            "BIDDAYOFFER_D" => Some(&self.biddayoffer_d),
            "BIDPEROFFER_D" => Some(&self.bidperoffer_d),
            "DISPATCHCONSTRAINT" => Some(&self.dispatchconstraint),
            "GENCONDATA" => Some(&self.gencondata),
            "SPDREGIONCONSTRAINT" => Some(&self.spdregionconstraint),
            "SPDCONNECTIONPOINTCONSTRAINT" => Some(&self.spdconnectionpointconstraint),
            "SPDINTERCONNECTORCONSTRAINT" => Some(&self.spdinterconnectorconstraint),
            "INTERCONNECTOR" => Some(&self.interconnector),
            "INTERCONNECTORCONSTRAINT" => Some(&self.interconnectorconstraint),
            "LOSSMODEL" => Some(&self.lossmodel),
            "LOSSFACTORMODEL" => Some(&self.lossfactormodel),
            "DISPATCHINTERCONNECTORRES" => Some(&self.dispatchinterconnectorres),
            "MNSP_INTERCONNECTOR" => Some(&self.mnsp_interconnector),
            _ => None,
        }
    }

    /// Refreshes the active tables (or `selection` when given) over `range`.
    /// A failing table is logged and skipped so one broken source cannot
    /// abort a long run.
    pub fn populate(
        &self,
        range: &DateRange,
        force_new: bool,
        selection: Option<&[String]>,
    ) -> Result<()> {
        // consistent categorical values across all tables
        enable_string_cache();
        info!(from = %range.start, to = %range.end, "populating database");
        if let Some(wanted) = selection {
            for name in unknown_tables(wanted) {
                warn!(table = name, "selection does not match any active table");
            }
        }
        for name in Self::active_tables() {
            if let Some(wanted) = selection {
                if !wanted.iter().any(|w| w.eq_ignore_ascii_case(name)) {
                    continue;
                }
            }
            let outcome = if *name == "ZONE_SUBSTATION" {
                self.zone_substation.populate(range, force_new)
            } else {
                match self.table(name) {
                    Some(table) => table.populate(range, force_new),
                    None => continue,
                }
            };
            if let Err(err) = outcome {
                error!(table = name, %err, "failed to populate table");
            }
        }
        Ok(())
    }

    /// Unit volume bids for the day of `date`, with ramp rates derived from
    /// the per-minute rate-of-change columns.
    ///
    /// Bid zips are cached locally but not persisted into a dataset because
    /// of their size.
    pub fn get_unit_volume_bids(&self, date: &str) -> Result<DataFrame> {
        let day = parse_bid_date(date)?;
        let (_, volume) = mmsdm::read_bids(&self.config, day.year(), day.month(), day.day())?;
        let columns = [
            "INTERVAL_DATETIME",
            "DUID",
            "BIDTYPE",
            "MAXAVAIL",
            "FIXEDLOAD",
            "ENABLEMENTMIN",
            "ENABLEMENTMAX",
            "LOWBREAKPOINT",
            "HIGHBREAKPOINT",
            "BANDAVAIL1",
            "BANDAVAIL2",
            "BANDAVAIL3",
            "BANDAVAIL4",
            "BANDAVAIL5",
            "BANDAVAIL6",
            "BANDAVAIL7",
            "BANDAVAIL8",
            "BANDAVAIL9",
            "BANDAVAIL10",
            "RAMPUPRATE",
            "RAMPDOWNRATE",
        ];
        Ok(volume
            .lazy()
            .with_columns([
                (col("ROCUP") * lit(60)).alias("RAMPUPRATE"),
                (col("ROCDOWN") * lit(60)).alias("RAMPDOWNRATE"),
            ])
            .select([cols(columns.to_vec())])
            .collect()?)
    }

    /// Unit price bids for the day of `date`.
    pub fn get_unit_price_bids(&self, date: &str) -> Result<DataFrame> {
        let day = parse_bid_date(date)?;
        let (price, _) = mmsdm::read_bids(&self.config, day.year(), day.month(), day.day())?;
        let columns = [
            "SETTLEMENTDATE",
            "DUID",
            "BIDTYPE",
            "PRICEBAND1",
            "PRICEBAND2",
            "PRICEBAND3",
            "PRICEBAND4",
            "PRICEBAND5",
            "PRICEBAND6",
            "PRICEBAND7",
            "PRICEBAND8",
            "PRICEBAND9",
            "PRICEBAND10",
        ];
        Ok(price.lazy().select([cols(columns.to_vec())]).collect()?)
    }
}

/// Selection entries that name no active table, usually typos.
fn unknown_tables(selection: &[String]) -> Vec<&str> {
    selection
        .iter()
        .map(String::as_str)
        .filter(|name| !ACTIVE_TABLES.iter().any(|t| t.eq_ignore_ascii_case(name)))
        .collect()
}

fn parse_bid_date(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, mmsdm::STRPTIME).map_err(|source| {
        NemdbError::InvalidDate {
            value: value.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_active_table_is_reachable() {
        for name in NemwebDb::active_tables() {
            if *name == "ZONE_SUBSTATION" {
                continue;
            }
            let spec = match *name {
                "DISPATCHREGIONSUM" => DISPATCHREGIONSUM,
                "BIDDAYOFFER_D" => BIDDAYOFFER_D,
                "BIDPEROFFER_D" => BIDPEROFFER_D,
                "DUDETAILSUMMARY" => DUDETAILSUMMARY,
                "DUDETAIL" => DUDETAIL,
                "GENUNITS" => GENUNITS,
                "DISPATCHLOAD" => DISPATCHLOAD,
                "DISPATCHPRICE" => DISPATCHPRICE,
                "MNSP_INTERCONNECTOR" => MNSP_INTERCONNECTOR,
                "RESERVE" => RESERVE,
                other => panic!("unknown active table {other}"),
            };
            assert_eq!(spec.name, *name);
            // every primary key must be a stored column
            for key in spec.primary_keys {
                assert!(spec.columns.contains(key), "{name} is missing key {key}");
            }
        }
    }

    #[test]
    fn misspelled_selection_entries_are_reported() {
        let selection = vec![
            "dispatchprice".to_string(),
            "DISPATCHPRCE".to_string(),
            "zone_substation".to_string(),
        ];
        assert_eq!(unknown_tables(&selection), vec!["DISPATCHPRCE"]);
        assert!(unknown_tables(&[]).is_empty());
    }

    #[test]
    fn low_memory_only_for_the_period_offers() {
        assert!(BIDPEROFFER_D.low_memory);
        assert!(!DISPATCHLOAD.low_memory);
    }
}

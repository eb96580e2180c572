//! Hive-partitioned parquet datasets for MMSDM and zone substation tables.

use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::io::HiveOptions;
use polars::prelude::*;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::dates::DateRange;
use crate::error::{NemdbError, Result};
use crate::mmsdm;

/// Maps an MMSDM column name to its storage dtype. Identifier-like columns
/// become categoricals, timestamps parse from the archive's strptime format
/// and everything else is a 32-bit float.
pub fn mmsdm_dtype(column: &str) -> DataType {
    match column {
        "ENTRYTYPE" | "PARTICIPANTID" | "DIRECTION" | "DUID" | "BIDTYPE" | "REGIONID"
        | "DISPATCHTYPE" | "CONNECTIONPOINTID" | "CONSTRAINTID" | "GENCONID" | "GENSETID"
        | "CONSTRAINTTYPE" | "INTERCONNECTORID" | "REGIONFROM" | "REGIONTO" | "SCHEDULE_TYPE"
        | "ICTYPE" | "LINKID" | "FROMREGION" | "TOREGION" | "CASESUBTYPE" => {
            DataType::Categorical(None, CategoricalOrdering::Physical)
        }
        "INTERVAL_DATETIME" | "LASTCHANGED" | "SETTLEMENTDATE" => {
            DataType::Datetime(TimeUnit::Microseconds, None)
        }
        "START_DATE" | "END_DATE" | "EFFECTIVEDATE" | "GENCONID_EFFECTIVEDATE" => DataType::Date,
        "DISPATCHMODE" | "AGCSTATUS" | "SOLUTIONSTATUS" | "INTERVENTION" => DataType::Int8,
        "VERSIONNO" | "GENCONID_VERSIONNO" | "LOSSSEGMENT" | "PERIODID" => DataType::Int32,
        "IS_AGGREGATED" => DataType::Boolean,
        "NORMALSTATUS" | "CO2E_ENERGY_SOURCE" | "CO2E_DATA_SOURCE" | "GENSETNAME"
        | "GENSETTYPE" | "STARTTYPE" | "STATIONID" => DataType::String,
        _ => DataType::Float32,
    }
}

pub fn is_temporal(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// How `get_data` interprets its date argument for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// No filtering; the whole dataset is returned.
    Full,
    /// Exact match on SETTLEMENTDATE for a 5 minute dispatch interval.
    BySettlementDate,
    /// Exact match on INTERVAL_DATETIME.
    ByIntervalDateTime,
    /// Market-day match on SETTLEMENTDATE; times before 04:00 belong to the
    /// previous market day.
    BySettlementDay,
    /// START_DATE/END_DATE window containing the date.
    ByStartEnd,
    /// Latest version effective at the date, per remaining primary keys.
    ByEffectiveDateVersionNo,
}

/// Static description of one MMSDM table mirror.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub primary_keys: &'static [&'static str],
    pub extra_partitions: &'static [&'static str],
    pub query: QueryKind,
    pub low_memory: bool,
}

/// One MMSDM table stored as a year/month hive-partitioned parquet dataset.
pub struct DataSource {
    config: Config,
    spec: TableSpec,
}

impl DataSource {
    pub fn new(config: Config, spec: TableSpec) -> Result<Self> {
        fs::create_dir_all(config.table_dir(spec.name))?;
        Ok(DataSource { config, spec })
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    pub fn path(&self) -> PathBuf {
        self.config.table_dir(self.spec.name)
    }

    fn partition_cols(&self) -> Vec<String> {
        let mut cols: Vec<String> = self
            .spec
            .extra_partitions
            .iter()
            .map(|c| c.to_string())
            .collect();
        cols.push("year".to_string());
        cols.push("month".to_string());
        cols
    }

    pub fn scan(&self) -> Result<LazyFrame> {
        scan_hive_partitioned(&self.path())
    }

    /// Collects the whole dataset. Kept for interface parity; prefer
    /// [`Self::scan`] since tables can be large.
    pub fn read(&self) -> Result<DataFrame> {
        Ok(self.scan()?.collect()?)
    }

    /// Fetches archives for every month in `range` that is not already
    /// present, or for all of them when `force_new` is set.
    pub fn populate(&self, range: &DateRange, force_new: bool) -> Result<()> {
        info!(
            table = self.spec.name,
            from = %range.start,
            to = %range.end,
            "populating dataset"
        );
        for (year, month) in range.month_starts() {
            if !force_new && self.has_data(year, month) {
                info!(
                    table = self.spec.name,
                    year, month, "data already present, skipping download"
                );
                continue;
            }
            self.add_data(year, month)?;
        }
        Ok(())
    }

    fn has_data(&self, year: i32, month: u32) -> bool {
        let Ok(lf) = self.scan() else { return false };
        lf.filter(
            col("year")
                .eq(lit(year as i64))
                .and(col("month").eq(lit(month as i64))),
        )
        .limit(1)
        .collect()
        .map(|df| df.height() > 0)
        .unwrap_or(false)
    }

    /// Downloads one month of the table and writes it into the dataset.
    /// A month missing from the archive is logged and skipped.
    pub fn add_data(&self, year: i32, month: u32) -> Result<()> {
        match mmsdm::read_table(&self.config, &self.spec, year, month) {
            Ok(df) => self.insert_frame(df, year, month),
            Err(err @ NemdbError::MissingData { .. }) => {
                error!(table = self.spec.name, %err, "no data available");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Stamps partition columns onto `df`, sorts it and writes it under the
    /// dataset root. Split out of [`Self::add_data`] so callers can load
    /// frames obtained elsewhere.
    pub fn insert_frame(&self, df: DataFrame, year: i32, month: u32) -> Result<()> {
        let partition_cols = self.partition_cols();
        let mut sort_cols = partition_cols.clone();
        sort_cols.extend(self.spec.primary_keys.iter().map(|c| c.to_string()));

        let stamped = df
            .lazy()
            .with_columns([
                lit(year).cast(DataType::Int32).alias("year"),
                lit(month as i32).cast(DataType::Int8).alias("month"),
            ])
            .sort(sort_cols, SortMultipleOptions::default())
            .collect()?;

        debug!(table = self.spec.name, year, month, "writing partitions");
        write_hive_partitioned(&stamped, &self.path(), &partition_cols, self.spec.name)
    }

    /// Retrieves rows for `date`, interpreted according to the table's
    /// [`QueryKind`].
    pub fn get_data(&self, date: &str) -> Result<DataFrame> {
        match self.spec.query {
            QueryKind::Full => self.read(),
            QueryKind::BySettlementDate => {
                let stamp = parse_datetime(date)?;
                Ok(self
                    .scan()?
                    .filter(col("SETTLEMENTDATE").eq(lit(stamp)))
                    .collect()?)
            }
            QueryKind::ByIntervalDateTime => {
                let stamp = parse_datetime(date)?;
                Ok(self
                    .scan()?
                    .filter(col("INTERVAL_DATETIME").eq(lit(stamp)))
                    .collect()?)
            }
            QueryKind::BySettlementDay => {
                // Times up to 04:00 settle on the previous market day.
                let stamp = parse_datetime(date).or_else(|_| {
                    parse_date(date).map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
                })?;
                let day = (stamp - Duration::hours(4) - Duration::seconds(1)).date();
                Ok(self
                    .scan()?
                    .filter(col("SETTLEMENTDATE").eq(lit(day)))
                    .collect()?)
            }
            QueryKind::ByStartEnd => {
                let day = parse_date(date)?;
                Ok(self
                    .scan()?
                    .filter(
                        col("START_DATE")
                            .lt_eq(lit(day))
                            .and(col("END_DATE").is_null().or(col("END_DATE").gt_eq(lit(day)))),
                    )
                    .collect()?)
            }
            QueryKind::ByEffectiveDateVersionNo => {
                let day = parse_date(date)?;
                let ids: Vec<PlSmallStr> = self
                    .spec
                    .primary_keys
                    .iter()
                    .filter(|key| !matches!(**key, "EFFECTIVEDATE" | "VERSIONNO"))
                    .map(|key| PlSmallStr::from(*key))
                    .collect();
                let sort_cols: Vec<String> = self
                    .spec
                    .primary_keys
                    .iter()
                    .map(|key| key.to_string())
                    .collect();
                Ok(self
                    .scan()?
                    .filter(col("EFFECTIVEDATE").lt_eq(lit(day)))
                    .sort(sort_cols, SortMultipleOptions::default())
                    .unique_stable(Some(ids), UniqueKeepStrategy::Last)
                    .collect()?)
            }
        }
    }
}

/// Zone substation loads across every distribution network, partitioned by
/// network and year. Networks publish yearly, so there is no month level.
pub struct DnspDataSource {
    config: Config,
    spec: TableSpec,
}

impl DnspDataSource {
    pub fn new(config: Config, spec: TableSpec) -> Result<Self> {
        fs::create_dir_all(config.table_dir(spec.name))?;
        Ok(DnspDataSource { config, spec })
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    pub fn path(&self) -> PathBuf {
        self.config.table_dir(self.spec.name)
    }

    fn partition_cols(&self) -> Vec<String> {
        let mut cols: Vec<String> = self
            .spec
            .extra_partitions
            .iter()
            .map(|c| c.to_string())
            .collect();
        cols.push("year".to_string());
        cols
    }

    pub fn scan(&self) -> Result<LazyFrame> {
        scan_hive_partitioned(&self.path())
    }

    pub fn read(&self) -> Result<DataFrame> {
        Ok(self.scan()?.collect()?)
    }

    pub fn populate(&self, range: &DateRange, force_new: bool) -> Result<()> {
        info!(
            table = self.spec.name,
            from = %range.start,
            to = %range.end,
            "populating dataset"
        );
        for year in range.years() {
            if !force_new && self.has_data(year) {
                info!(
                    table = self.spec.name,
                    year, "data already present, skipping download"
                );
                continue;
            }
            self.add_data(year)?;
        }
        Ok(())
    }

    fn has_data(&self, year: i32) -> bool {
        let Ok(lf) = self.scan() else { return false };
        lf.filter(col("year").eq(lit(year as i64)))
            .limit(1)
            .collect()
            .map(|df| df.height() > 0)
            .unwrap_or(false)
    }

    pub fn add_data(&self, year: i32) -> Result<()> {
        for (network, df) in nemdb_dnsp::read_all_zss(year) {
            self.insert_frame(network, df, year)?;
        }
        Ok(())
    }

    pub fn insert_frame(&self, network: &str, df: DataFrame, year: i32) -> Result<()> {
        let partition_cols = self.partition_cols();
        let mut sort_cols = partition_cols.clone();
        sort_cols.extend(self.spec.primary_keys.iter().map(|c| c.to_string()));

        let stamped = df
            .lazy()
            .with_columns([
                lit(network).alias("network"),
                lit(year).cast(DataType::Int32).alias("year"),
            ])
            .sort(sort_cols, SortMultipleOptions::default())
            .collect()?;

        debug!(table = self.spec.name, network, year, "writing partitions");
        write_hive_partitioned(&stamped, &self.path(), &partition_cols, self.spec.name)
    }
}

/// Scans a dataset root written by [`write_hive_partitioned`], deriving the
/// partition columns from the directory names.
pub(crate) fn scan_hive_partitioned(root: &Path) -> Result<LazyFrame> {
    let pattern = root.join("**").join("*.parquet");
    let args = ScanArgsParquet {
        hive_options: HiveOptions {
            enabled: Some(true),
            ..Default::default()
        },
        allow_missing_columns: true,
        ..Default::default()
    };
    Ok(LazyFrame::scan_parquet(pattern, args)?)
}

/// Writes `df` as a `col=value` directory tree under `root`, replacing any
/// file already present for a partition.
pub(crate) fn write_hive_partitioned(
    df: &DataFrame,
    root: &Path,
    partition_cols: &[String],
    basename: &str,
) -> Result<()> {
    let by: Vec<PlSmallStr> = partition_cols
        .iter()
        .map(|c| PlSmallStr::from_str(c))
        .collect();
    for part in df.partition_by_stable(by, true)? {
        let mut dir = root.to_path_buf();
        for column in partition_cols {
            let casted = part.column(column)?.cast(&DataType::String)?;
            let value = casted
                .str()?
                .get(0)
                .map(str::to_string)
                .unwrap_or_else(|| "__null__".to_string());
            dir.push(format!("{column}={value}"));
        }
        fs::create_dir_all(&dir)?;
        let mut out = part.drop_many(partition_cols.iter().map(String::as_str));
        let file = File::create(dir.join(format!("{basename}-0.parquet")))?;
        ParquetWriter::new(file).finish(&mut out)?;
    }
    Ok(())
}

fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, mmsdm::STRPTIME).map_err(|source| {
        NemdbError::InvalidDate {
            value: value.to_string(),
            source,
        }
    })
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y/%m/%d").map_err(|source| NemdbError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

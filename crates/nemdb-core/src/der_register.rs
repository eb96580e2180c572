//! Combines the monthly AEMO DER register exports into one dataset.
//!
//! The postcode-level exports arrive as a mix of CSV and XLSX files whose
//! column headings drifted over the years. Each file is renamed onto a
//! stable schema, stamped with the date taken from its filename, and the
//! lot is stacked diagonally into a single parquet file.

use std::fs;
use std::fs::File;
use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use polars::prelude::*;
use tracing::info;

use crate::error::{NemdbError, Result};
use crate::isp::range_to_dataframe;

/// Header drift across export vintages, mapped onto the stable schema.
const RENAME: [(&str, &str); 14] = [
    ("NMI_Bus_res", "nmi_bus_res"),
    ("Sum of Num_DER_Connections", "sum_der_connections"),
    ("Sum of Installed_DER_capacity_kVA", "sum_der_kva"),
    ("Sum of Solar_Connections", "sum_pv_count"),
    ("Sum of Solar_Devices", "sum_pv_devices"),
    ("Sum of Solar_capacity_kVA", "sum_pv_kva"),
    ("Sum of Battery_Connections", "sum_ess_count"),
    ("Sum of Battery_Devices", "sum_ess_devices"),
    ("Sum of Battery_capacity_kVA", "sum_ess_kva"),
    ("Sum of Battery_Storage_kVAh", "sum_ess_kvah"),
    ("Sum of Num_Other_Connections", "sum_install_other"),
    ("Sum of Installed_OtherDER_capacity_kVA", "sum_kva_other"),
    ("post_code", "postcode"),
    ("Sum of Num_DER_Sites", "sum_der_connections"),
];

/// Renames whatever drifted headings are present onto the stable schema.
pub fn normalize_columns(mut df: DataFrame) -> Result<DataFrame> {
    for (from, to) in RENAME {
        if df.get_column_names_str().contains(&from) {
            df.rename(from, to.into())?;
        }
    }
    Ok(df)
}

/// Export date, as named in the file: `"Jan 2025 DERR data.csv"` -> `"Jan 2025"`.
pub fn date_from_filename(name: &str) -> String {
    let stem = name
        .strip_suffix(".csv")
        .or_else(|| name.strip_suffix(".xlsx"))
        .unwrap_or(name);
    let stem = stem
        .strip_suffix(" DERR data")
        .or_else(|| stem.strip_suffix(" DERR-data"))
        .unwrap_or(stem);
    stem.to_string()
}

/// Reads every CSV and XLSX export under `dir`, stacks them and writes
/// the combined frame to `output`.
pub fn build_der_register(dir: &Path, output: &Path) -> Result<DataFrame> {
    let mut frames = Vec::new();
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".csv") || name.ends_with(".xlsx"))
        .collect();
    names.sort();
    for name in names {
        let path = dir.join(&name);
        info!(file = name, "reading DER register export");
        let df = if name.ends_with(".csv") {
            read_export_csv(&path)?
        } else {
            read_export_xlsx(&path)?
        };
        let date = date_from_filename(&name);
        let stamped = normalize_columns(df)?
            .lazy()
            .with_column(lit(date.as_str()).alias("date"))
            .collect()?;
        frames.push(stamped.lazy());
    }
    if frames.is_empty() {
        return Err(NemdbError::processing(format!(
            "no DER register exports under {}",
            dir.display()
        )));
    }
    let mut combined = concat(
        frames,
        UnionArgs {
            diagonal: true,
            to_supertypes: true,
            ..Default::default()
        },
    )?
    .collect()?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    ParquetWriter::new(File::create(output)?).finish(&mut combined)?;
    Ok(combined)
}

fn read_export_csv(path: &Path) -> Result<DataFrame> {
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .with_ignore_errors(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?)
}

fn read_export_xlsx(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| NemdbError::processing(format!("{} has no sheets", path.display())))?;
    let range = workbook.worksheet_range(&sheet)?;
    range_to_dataframe(&range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_dates_survive_both_suffix_spellings() {
        assert_eq!(date_from_filename("Jan 2025 DERR data.csv"), "Jan 2025");
        assert_eq!(date_from_filename("Sep 2022 DERR-data.xlsx"), "Sep 2022");
        assert_eq!(date_from_filename("odd-name.csv"), "odd-name");
    }

    #[test]
    fn drifted_headings_land_on_the_stable_schema() {
        let df = df!(
            "post_code" => ["2000"],
            "Sum of Num_DER_Sites" => [41i64],
            "state" => ["NSW"],
        )
        .unwrap();
        let out = normalize_columns(df).unwrap();
        assert_eq!(
            out.get_column_names_str(),
            vec!["postcode", "sum_der_connections", "state"]
        );
    }

    #[test]
    fn exports_stack_diagonally_with_a_date_stamp() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Jan 2025 DERR data.csv"),
            "postcode,Sum of Num_DER_Sites\n2000,41\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("Feb 2025 DERR data.csv"),
            "postcode,sum_der_connections,state\n2000,44,NSW\n",
        )
        .unwrap();
        let output = dir.path().join("out").join("der.parquet");

        let combined = build_der_register(dir.path(), &output).unwrap();
        assert_eq!(combined.height(), 2);
        assert!(output.exists());
        let dates = combined.column("date").unwrap().str().unwrap();
        assert!(dates.into_iter().flatten().any(|d| d == "Jan 2025"));
        let counts = combined.column("sum_der_connections").unwrap();
        assert_eq!(counts.null_count(), 0);
        assert_eq!(combined.column("state").unwrap().null_count(), 1);
    }
}

//! Readers for the AEMO Integrated System Plan assumptions workbook.

use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use polars::prelude::*;

use crate::config::Config;
use crate::error::Result;

const ISP_FILE_VAR: &str = "ISP_FILE";

/// Default workbook location, unless `ISP_FILE` points elsewhere.
pub fn workbook_path(config: &Config) -> PathBuf {
    resolve_workbook_path(config, env::var_os(ISP_FILE_VAR))
}

fn resolve_workbook_path(config: &Config, override_path: Option<OsString>) -> PathBuf {
    match override_path {
        Some(path) => PathBuf::from(path),
        None => config.cache_dir.join("artefacts").join("ISP_2024.xlsx"),
    }
}

/// Handle over the assumptions workbook, one sheet per table.
pub struct IspAssumptions {
    workbook: Sheets<BufReader<File>>,
}

impl IspAssumptions {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(IspAssumptions {
            workbook: open_workbook_auto(path)?,
        })
    }

    /// Names of the tables in the workbook.
    pub fn tables(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Reads one sheet into a frame, first row as headers.
    pub fn read_table(&mut self, table_name: &str) -> Result<DataFrame> {
        let range = self.workbook.worksheet_range(table_name)?;
        range_to_dataframe(&range)
    }
}

/// Coal price trajectories, long format: one row per generator, coal
/// price scenario and financial year.
pub fn read_coal_prices(path: &Path) -> Result<DataFrame> {
    let mut assumptions = IspAssumptions::open(path)?;
    let df = assumptions.read_table("Coal prices")?;
    unpivot_coal_prices(df)
}

fn unpivot_coal_prices(df: DataFrame) -> Result<DataFrame> {
    let index = ["Scenario", "Generator", "Coal Price Scenario"];
    let on: Vec<String> = df
        .get_column_names_str()
        .into_iter()
        .filter(|name| !index.contains(name))
        .map(|name| name.to_string())
        .collect();
    let mut long = df.unpivot(on, index.to_vec())?;
    long.rename("variable", "fy".into())?;
    long.rename("value", "price".into())?;
    Ok(long.drop("Scenario")?)
}

/// First row becomes the header; a column whose cells are all numeric
/// (or empty) becomes Float64, anything else String.
pub fn range_to_dataframe(range: &Range<Data>) -> Result<DataFrame> {
    let rows: Vec<_> = range.rows().collect();
    let Some((header, body)) = rows.split_first() else {
        return Ok(DataFrame::empty());
    };
    let mut columns = Vec::with_capacity(header.len());
    for (idx, name) in header.iter().enumerate() {
        let name = cell_to_string(name).unwrap_or_else(|| format!("column_{idx}"));
        let cells: Vec<&Data> = body.iter().map(|row| &row[idx]).collect();
        let numeric = cells
            .iter()
            .all(|cell| matches!(cell, Data::Float(_) | Data::Int(_) | Data::Empty));
        let column: Column = if numeric {
            let values: Vec<Option<f64>> = cells.iter().map(|cell| cell_to_f64(cell)).collect();
            Series::new(name.into(), values).into()
        } else {
            let values: Vec<Option<String>> =
                cells.iter().map(|cell| cell_to_string(cell)).collect();
            Series::new(name.into(), values).into()
        };
        columns.push(column);
    }
    Ok(DataFrame::new(columns)?)
}

fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(v) => Some(*v),
        Data::Int(v) => Some(*v as f64),
        _ => None,
    }
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.trim().to_string()),
        Data::Float(v) => Some(v.to_string()),
        Data::Int(v) => Some(v.to_string()),
        Data::Bool(v) => Some(v.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Filesystem;

    fn coal_sheet() -> Range<Data> {
        let mut range = Range::new((0, 0), (2, 4));
        for (col, name) in [
            "Scenario",
            "Generator",
            "Coal Price Scenario",
            "2024-25",
            "2025-26",
        ]
        .iter()
        .enumerate()
        {
            range.set_value((0, col as u32), Data::String(name.to_string()));
        }
        for (row, (generator, a, b)) in
            [("Bayswater", 3.1, 3.2), ("Eraring", 2.8, 2.9)].iter().enumerate()
        {
            let row = row as u32 + 1;
            range.set_value((row, 0), Data::String("Step Change".into()));
            range.set_value((row, 1), Data::String(generator.to_string()));
            range.set_value((row, 2), Data::String("Central".into()));
            range.set_value((row, 3), Data::Float(*a));
            range.set_value((row, 4), Data::Float(*b));
        }
        range
    }

    #[test]
    fn sheets_infer_numeric_and_string_columns() {
        let df = range_to_dataframe(&coal_sheet()).unwrap();
        assert_eq!(
            df.get_column_names_str(),
            vec!["Scenario", "Generator", "Coal Price Scenario", "2024-25", "2025-26"]
        );
        assert_eq!(df.column("Generator").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("2024-25").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn coal_prices_go_long_with_fy_and_price() {
        let df = range_to_dataframe(&coal_sheet()).unwrap();
        let long = unpivot_coal_prices(df).unwrap();
        assert_eq!(
            long.get_column_names_str(),
            vec!["Generator", "Coal Price Scenario", "fy", "price"]
        );
        assert_eq!(long.height(), 4);
        let fy = long.column("fy").unwrap().str().unwrap();
        assert!(fy.into_iter().flatten().all(|v| v.ends_with("-25") || v.ends_with("-26")));
    }

    #[test]
    fn override_wins_over_the_default_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path(), Filesystem::Local);
        assert!(
            resolve_workbook_path(&config, None).ends_with("artefacts/ISP_2024.xlsx")
        );
        assert_eq!(
            resolve_workbook_path(&config, Some(OsString::from("/tmp/other.xlsx"))),
            PathBuf::from("/tmp/other.xlsx")
        );
    }
}

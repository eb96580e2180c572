//! Local mirror of Australian National Electricity Market publications.
//!
//! MMSDM archive tables, distribution network zone substation loads,
//! transmission GIS layers, ISP assumption workbooks and the DER register
//! are fetched on demand and cached as hive-partitioned parquet datasets
//! under a single cache directory.

pub mod cache;
pub mod config;
pub mod dates;
pub mod der_register;
pub mod error;
pub mod fetch;
pub mod geodata;
pub mod isp;
pub mod manager;
pub mod mmsdm;
pub mod store;

pub use config::{Config, Filesystem};
pub use dates::DateRange;
pub use error::{NemdbError, Result};
pub use manager::NemwebDb;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NemdbError>;

#[derive(Debug, Error)]
pub enum NemdbError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid date '{value}': {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("request failed: {0}")]
    Http(#[source] Box<ureq::Error>),

    #[error("{url} returned HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("no archive published for table {table} in {year}-{month:02}")]
    MissingData {
        table: String,
        year: i32,
        month: u32,
    },

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("dataframe error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("geojson error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    #[error(transparent)]
    Dnsp(#[from] nemdb_dnsp::DnspError),

    #[error("{0}")]
    Processing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NemdbError {
    pub fn processing(message: impl Into<String>) -> Self {
        NemdbError::Processing(message.into())
    }
}

use polars::error::PolarsError;
use thiserror::Error;

/// Errors raised while fetching or decoding a distribution network's
/// zone substation load publication.
#[derive(Debug, Error)]
pub enum DnspError {
    #[error("{network}: no published archive for year {year}")]
    NoUrlForYear { network: &'static str, year: i32 },

    #[error("{network}: manual download required: {instructions}")]
    ManualDownload {
        network: &'static str,
        instructions: &'static str,
    },

    #[error("{network}: request to {url} failed: {source}")]
    Http {
        network: &'static str,
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("{network}: {url} returned HTTP {status}")]
    Download {
        network: &'static str,
        url: String,
        status: u16,
    },

    #[error("{network}: archive error: {source}")]
    Zip {
        network: &'static str,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{network}: workbook error: {source}")]
    Workbook {
        network: &'static str,
        #[source]
        source: calamine::XlsxError,
    },

    #[error("{network}: dataframe error: {source}")]
    Frame {
        network: &'static str,
        #[source]
        source: PolarsError,
    },

    #[error("{network}: entry '{entry}' not understood: {message}")]
    Entry {
        network: &'static str,
        entry: String,
        message: String,
    },

    #[error("{network}: missing required column '{column}'")]
    MissingColumn {
        network: &'static str,
        column: String,
    },

    #[error("{network}: archive contained no load rows")]
    Empty { network: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DnspError {
    pub(crate) fn frame(network: &'static str) -> impl Fn(PolarsError) -> DnspError {
        move |source| DnspError::Frame { network, source }
    }

    pub(crate) fn zip(network: &'static str) -> impl Fn(zip::result::ZipError) -> DnspError {
        move |source| DnspError::Zip { network, source }
    }

    pub(crate) fn workbook(network: &'static str) -> impl Fn(calamine::XlsxError) -> DnspError {
        move |source| DnspError::Workbook { network, source }
    }

    pub(crate) fn entry(network: &'static str, entry: &str, message: impl Into<String>) -> DnspError {
        DnspError::Entry {
            network,
            entry: entry.to_string(),
            message: message.into(),
        }
    }
}

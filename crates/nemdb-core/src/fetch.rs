use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{NemdbError, Result};

/// Retries `op` up to `tries` times, sleeping `delay` between attempts.
pub fn with_retry<T>(
    tries: u32,
    delay: Duration,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut remaining = tries.max(1);
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if remaining > 1 => {
                remaining -= 1;
                warn!(%err, "retrying after failure");
                sleep(delay);
            }
            Err(err) => return Err(err),
        }
    }
}

pub fn http_get_bytes(url: &str) -> Result<Vec<u8>> {
    match ureq::get(url).call() {
        Ok(response) => {
            let mut bytes = Vec::new();
            response.into_reader().read_to_end(&mut bytes)?;
            Ok(bytes)
        }
        Err(ureq::Error::Status(status, _)) => Err(NemdbError::Download {
            url: url.to_string(),
            status,
        }),
        Err(err) => Err(NemdbError::Http(Box::new(err))),
    }
}

pub fn http_get_string(url: &str) -> Result<String> {
    match ureq::get(url).call() {
        Ok(response) => Ok(response.into_string()?),
        Err(ureq::Error::Status(status, _)) => Err(NemdbError::Download {
            url: url.to_string(),
            status,
        }),
        Err(err) => Err(NemdbError::Http(Box::new(err))),
    }
}

/// Downloads `url` to `path` unless it is already there.
pub fn download_file(url: &str, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        info!(path = %path.display(), "file already downloaded");
        return Ok(path.to_path_buf());
    }
    info!(url, path = %path.display(), "downloading");
    let bytes = http_get_bytes(url)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(path.to_path_buf())
}

/// Downloads a zip publication into the cache directory, keyed by its
/// basename, and returns the cached path.
pub fn cache_response_zip(config: &Config, url: &str) -> Result<PathBuf> {
    let base_name = url.rsplit('/').next().unwrap_or(url);
    let path = config.cache_dir.join(base_name);
    if path.exists() {
        info!(path = %path.display(), "reading from cache");
        return Ok(path);
    }
    info!(url, "requesting");
    let bytes = http_get_bytes(url)?;
    config.ensure_cache_dir()?;
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Scrapes an NEMWEB report index page for links to files containing
/// `extension` and returns their absolute URLs.
pub fn list_available_files(url: &str, extension: &str) -> Result<Vec<String>> {
    let body = http_get_string(url)?;
    let files = extract_links(&body, extension)
        .into_iter()
        .map(|name| format!("{}/{}", url.trim_end_matches('/'), name))
        .collect::<Vec<_>>();
    if files.is_empty() {
        return Err(NemdbError::processing(format!(
            "no {extension} files listed at {url}"
        )));
    }
    Ok(files)
}

fn extract_links(body: &str, extension: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let Ok(anchors) = Selector::parse("a") else {
        return Vec::new();
    };
    document
        .select(&anchors)
        .map(|a| a.text().collect::<String>())
        .filter(|name| name.contains(extension))
        .map(|name| name.trim().rsplit('/').next().unwrap_or("").to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

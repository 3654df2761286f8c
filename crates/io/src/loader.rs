//! Resource loaders.
//!
//! A location is either a filesystem path or an `http://`/`https://` URL.
//! Loaders return raw bytes; decoding happens in `json` and `spreadsheet`.

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::SourceError;

const USER_AGENT: &str = concat!("lboard/", env!("CARGO_PKG_VERSION"));

pub trait ResourceLoader {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError>;
}

pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Reads paths; relative ones resolve against `base_dir`.
#[derive(Debug, Clone)]
pub struct FsLoader {
    base_dir: PathBuf,
}

impl FsLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl ResourceLoader for FsLoader {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.resolve(location);
        debug!(path = %path.display(), "reading resource");
        fs::read(&path).map_err(|source| SourceError::Io {
            location: path.display().to_string(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Blocking GET with a per-request timeout. No retries.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    http: reqwest::blocking::Client,
}

impl HttpLoader {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| SourceError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { http })
    }
}

impl ResourceLoader for HttpLoader {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError> {
        debug!(url = location, "fetching resource");
        let http_error = |source| SourceError::Http {
            url: location.to_string(),
            source,
        };

        let resp = self.http.get(location).send().map_err(http_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: location.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().map_err(http_error)?;
        Ok(body.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// URLs go to [`HttpLoader`], everything else to [`FsLoader`].
///
/// The HTTP client is built on the first URL fetch. A client that cannot be
/// built fails that fetch only; filesystem locations keep working.
#[derive(Debug, Clone)]
pub struct AutoLoader {
    fs: FsLoader,
    timeout: Duration,
    http: OnceCell<HttpLoader>,
}

impl AutoLoader {
    pub fn new(base_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            fs: FsLoader::new(base_dir),
            timeout,
            http: OnceCell::new(),
        }
    }

    fn http(&self) -> Result<&HttpLoader, SourceError> {
        if let Some(http) = self.http.get() {
            return Ok(http);
        }
        let http = HttpLoader::new(self.timeout)?;
        Ok(self.http.get_or_init(|| http))
    }
}

impl ResourceLoader for AutoLoader {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError> {
        if is_url(location) {
            self.http()?.fetch(location)
        } else {
            self.fs.fetch(location)
        }
    }
}

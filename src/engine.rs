//! Locating and binding the pdfium rendering library.
//!
//! Resolution order, first match wins:
//!
//! 1. [`EngineConfig::library_path`]
//! 2. `PDFIUM_LIB_PATH`
//! 3. `{cache}/pdfium-{VERSION}/{libname}` (cache overridable through
//!    `HEKWERK_PDFIUM_CACHE_DIR`)
//! 4. download from bblanchon/pdfium-binaries into the cache, when
//!    [`EngineConfig::auto_download`] is set
//! 5. the system library search path
//!
//! The resolved path is remembered for the lifetime of the process, and so
//! is the bound library: [`pdfium`] hands out one shared instance.

use crate::config::EngineConfig;
use pdfium_render::prelude::Pdfium;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

const BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Errors from locating, downloading or binding pdfium.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Archive extraction failed: {0}")]
    Extract(String),

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },

    #[error("PDFium not found in the cache or on the system library path: {0}")]
    NotFound(String),
}

/// Where the bound library came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "path", rename_all = "snake_case")]
pub enum LibrarySource {
    Configured(PathBuf),
    Cached(PathBuf),
    Downloaded(PathBuf),
    System,
}

/// Outcome of [`probe`], reported by `/healthz` and at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RendererStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibrarySource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

struct Platform {
    archive_name: &'static str,
    lib_path_in_archive: &'static str,
    lib_name: &'static str,
}

fn detect_platform() -> Result<Platform, EngineError> {
    let (archive_name, lib_path_in_archive, lib_name) =
        match (std::env::consts::OS, std::env::consts::ARCH) {
            ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
            ("macos", "x86_64") => ("pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
            ("linux", "x86_64") => ("pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
            ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
            ("windows", "x86_64") => ("pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
            ("windows", "aarch64") => ("pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
            (os, arch) => {
                return Err(EngineError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };
    Ok(Platform {
        archive_name,
        lib_path_in_archive,
        lib_name,
    })
}

/// Per-version cache directory for the pdfium library.
pub fn cache_dir(config: &EngineConfig) -> PathBuf {
    let base = config
        .cache_dir
        .clone()
        .or_else(|| std::env::var_os("HEKWERK_PDFIUM_CACHE_DIR").map(PathBuf::from))
        .unwrap_or_else(|| {
            dirs::cache_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
                .unwrap_or_else(std::env::temp_dir)
                .join("hekwerk")
        });
    base.join(format!("pdfium-{PDFIUM_VERSION}"))
}

static RESOLVED: OnceLock<LibrarySource> = OnceLock::new();

/// Find the library without touching the network.
fn locate_offline(config: &EngineConfig) -> Option<LibrarySource> {
    let explicit = config
        .library_path
        .clone()
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));
    if let Some(p) = explicit {
        if p.exists() {
            return Some(LibrarySource::Configured(p));
        }
        warn!("Configured pdfium library '{}' does not exist", p.display());
    }

    let platform = detect_platform().ok()?;
    let cached = cache_dir(config).join(platform.lib_name);
    cached.exists().then_some(LibrarySource::Cached(cached))
}

/// Resolve the library, downloading it when allowed. A failed download
/// degrades to the system library.
///
/// `on_progress` receives `(bytes_downloaded, total_bytes)` during a download.
pub fn ensure_library(
    config: &EngineConfig,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<LibrarySource, EngineError> {
    if let Some(source) = RESOLVED.get() {
        return Ok(source.clone());
    }

    let source = match locate_offline(config) {
        Some(source) => source,
        None if config.auto_download => match download_library(config, on_progress) {
            Ok(source) => source,
            Err(e) => {
                warn!("pdfium download failed, trying the system library: {}", e);
                LibrarySource::System
            }
        },
        None => LibrarySource::System,
    };

    // A concurrent caller may have won the race; both results are equivalent.
    let _ = RESOLVED.set(source.clone());
    Ok(source)
}

/// Make sure a library file is on disk, downloading it when needed.
///
/// Unlike [`ensure_library`] a failed download is returned as an error.
pub fn fetch(
    config: &EngineConfig,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<LibrarySource, EngineError> {
    match locate_offline(config) {
        Some(source) => Ok(source),
        None => download_library(config, on_progress),
    }
}

static PDFIUM: OnceLock<Pdfium> = OnceLock::new();
static BIND_LOCK: Mutex<()> = Mutex::new(());

/// The process-wide pdfium instance, bound on first use.
///
/// Dropping a `Pdfium` destroys the library for every thread, so this
/// instance is never dropped and all renders borrow it. A failed bind is not
/// remembered; the next call tries again.
pub fn pdfium(config: &EngineConfig) -> Result<&'static Pdfium, EngineError> {
    if let Some(pdfium) = PDFIUM.get() {
        return Ok(pdfium);
    }
    let _guard = BIND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(pdfium) = PDFIUM.get() {
        return Ok(pdfium);
    }
    let pdfium = bind(config)?;
    info!("pdfium bound");
    Ok(PDFIUM.get_or_init(|| pdfium))
}

/// Bind pdfium, resolving the library first.
fn bind(config: &EngineConfig) -> Result<Pdfium, EngineError> {
    match ensure_library(config, None)? {
        LibrarySource::Configured(p) | LibrarySource::Cached(p) | LibrarySource::Downloaded(p) => {
            bind_from_path(&p)
        }
        LibrarySource::System => Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| EngineError::NotFound(e.to_string())),
    }
}

/// Bind pdfium from an explicit library file.
fn bind_from_path(path: &Path) -> Result<Pdfium, EngineError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| EngineError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Try to bind pdfium once and report the outcome.
pub fn probe(config: &EngineConfig) -> RendererStatus {
    let library = match ensure_library(config, None) {
        Ok(source) => source,
        Err(e) => return unavailable(e),
    };
    match pdfium(config) {
        Ok(_) => {
            debug!("pdfium bound from {:?}", library);
            RendererStatus {
                available: true,
                library: Some(library),
                reason: None,
            }
        }
        Err(e) => unavailable(e),
    }
}

fn unavailable(e: EngineError) -> RendererStatus {
    warn!("PDF rendering unavailable: {}", e);
    RendererStatus {
        available: false,
        library: None,
        reason: Some(e.to_string()),
    }
}

fn download_library(
    config: &EngineConfig,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<LibrarySource, EngineError> {
    let platform = detect_platform()?;
    let dir = cache_dir(config);
    let lib_path = dir.join(platform.lib_name);
    let url = format!(
        "{}/chromium%2F{}/{}",
        BASE_URL, PDFIUM_VERSION, platform.archive_name
    );

    info!("Downloading pdfium {} from {}", PDFIUM_VERSION, url);
    std::fs::create_dir_all(&dir).map_err(EngineError::CacheDir)?;

    let archive = download_bytes(&url, on_progress)?;
    extract_library(&archive, platform.lib_path_in_archive, &lib_path)?;

    info!("pdfium cached at {}", lib_path.display());
    Ok(LibrarySource::Downloaded(lib_path))
}

fn download_bytes(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, EngineError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("hekwerk/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| EngineError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| EngineError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(EngineError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(32 * 1024 * 1024) as usize);
    let mut chunk = vec![0u8; 64 * 1024];
    let mut downloaded: u64 = 0;

    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                downloaded += n as u64;
                if let Some(cb) = on_progress {
                    cb(downloaded, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EngineError::Download(format!("Read error: {e}"))),
        }
    }

    Ok(buf)
}

/// Extract one file from a gzipped tarball into `dest`.
fn extract_library(archive: &[u8], member: &str, dest: &Path) -> Result<(), EngineError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let mut tarball = Archive::new(GzDecoder::new(archive));
    let entries = tarball
        .entries()
        .map_err(|e| EngineError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| EngineError::Extract(e.to_string()))?;
        let matches = entry
            .path()
            .map_err(|e| EngineError::Extract(e.to_string()))?
            .to_string_lossy()
            .trim_start_matches("./")
            == member;
        if matches {
            entry
                .unpack(dest)
                .map_err(|e| EngineError::Extract(format!("Unpack failed: {e}")))?;
            return Ok(());
        }
    }

    Err(EngineError::Extract(format!(
        "'{member}' not found in archive"
    )))
}

//! Configuration types for loading drawings, measuring and serving.
//!
//! Loading and measuring behaviour is controlled through [`CalculatorConfig`],
//! built via its [`CalculatorConfigBuilder`]. The HTTP surface has its own
//! [`ServerConfig`] so the library can be used without a server.

use crate::error::HekwerkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for loading and measuring fence drawings.
///
/// Built via [`CalculatorConfig::builder()`] or using
/// [`CalculatorConfig::default()`].
///
/// # Example
/// ```rust
/// use hekwerk::CalculatorConfig;
///
/// let config = CalculatorConfig::builder()
///     .dpi(150)
///     .coat_both_sides(false)
///     .default_post_diameter_mm(48.3)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct CalculatorConfig {
    /// Rendering DPI used when rasterising PDF pages. Range: 72–600. Default: 200.
    ///
    /// Calibration happens on the rendered pixels, so a higher DPI gives a
    /// finer scale line at the cost of larger page images.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 8000.
    ///
    /// Caps A0-size sheets so pdfium never allocates more than roughly
    /// `max_rendered_pixels²` pixels per page.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted drawings.
    pub password: Option<String>,

    /// Count both faces of every panel. Default: true.
    pub coat_both_sides: bool,

    /// Post diameter used when no per-post override exists. Default: 60.0 mm.
    pub default_post_diameter_mm: f64,

    /// Real length pre-filled for a new calibration line. Default: 1000.0 mm.
    pub default_scale_length_mm: f64,

    /// Largest accepted upload in bytes. Default: 100 MiB.
    pub max_upload_bytes: usize,

    /// Where to find the pdfium library.
    pub engine: EngineConfig,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 8000,
            password: None,
            coat_both_sides: true,
            default_post_diameter_mm: 60.0,
            default_scale_length_mm: 1000.0,
            max_upload_bytes: 100 * 1024 * 1024,
            engine: EngineConfig::default(),
        }
    }
}

impl fmt::Debug for CalculatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculatorConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("coat_both_sides", &self.coat_both_sides)
            .field("default_post_diameter_mm", &self.default_post_diameter_mm)
            .field("default_scale_length_mm", &self.default_scale_length_mm)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("engine", &self.engine)
            .finish()
    }
}

impl CalculatorConfig {
    /// Create a new builder for `CalculatorConfig`.
    pub fn builder() -> CalculatorConfigBuilder {
        CalculatorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Render scale factor applied to PDF points (1 pt = 1/72 inch).
    pub fn render_scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`CalculatorConfig`].
#[derive(Debug)]
pub struct CalculatorConfigBuilder {
    config: CalculatorConfig,
}

impl CalculatorConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn coat_both_sides(mut self, v: bool) -> Self {
        self.config.coat_both_sides = v;
        self
    }

    pub fn default_post_diameter_mm(mut self, mm: f64) -> Self {
        self.config.default_post_diameter_mm = mm;
        self
    }

    pub fn default_scale_length_mm(mut self, mm: f64) -> Self {
        self.config.default_scale_length_mm = mm;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.config.engine = engine;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CalculatorConfig, HekwerkError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(HekwerkError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if !(c.default_post_diameter_mm.is_finite() && c.default_post_diameter_mm > 0.0) {
            return Err(HekwerkError::InvalidConfig(format!(
                "Default post diameter must be > 0 mm, got {}",
                c.default_post_diameter_mm
            )));
        }
        if !(c.default_scale_length_mm.is_finite() && c.default_scale_length_mm >= 0.0) {
            return Err(HekwerkError::InvalidConfig(format!(
                "Default scale length must be ≥ 0 mm, got {}",
                c.default_scale_length_mm
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(HekwerkError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

/// How the pdfium shared library is located.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Explicit path to `libpdfium`. Falls back to `PDFIUM_LIB_PATH`.
    pub library_path: Option<PathBuf>,

    /// Cache directory override. Falls back to `HEKWERK_PDFIUM_CACHE_DIR`,
    /// then the platform cache directory.
    pub cache_dir: Option<PathBuf>,

    /// Download the library when it is not cached. Default: true.
    pub auto_download: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            cache_dir: None,
            auto_download: true,
        }
    }
}

/// Configuration of the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Default: `127.0.0.1`.
    pub address: String,

    /// Bind port. Default: 8501.
    pub port: u16,

    /// Allow any origin, method and header. Default: false.
    pub cors_permissive: bool,

    /// Idle time after which an uploaded document is dropped. Default: 3600 s.
    pub session_ttl_secs: u64,

    /// Maximum number of live documents. Default: 64.
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8501,
            cors_permissive: false,
            session_ttl_secs: 3600,
            max_sessions: 64,
        }
    }
}

impl ServerConfig {
    /// `address:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Check the values a builder would otherwise clamp.
    pub fn validate(&self) -> Result<(), HekwerkError> {
        if self.max_sessions == 0 {
            return Err(HekwerkError::InvalidConfig(
                "max_sessions must be ≥ 1".into(),
            ));
        }
        if self.session_ttl_secs == 0 {
            return Err(HekwerkError::InvalidConfig(
                "session_ttl_secs must be ≥ 1".into(),
            ));
        }
        Ok(())
    }
}

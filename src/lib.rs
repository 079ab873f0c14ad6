//! ogcard
//!
//! Open Graph share-image generator: a flat query string goes in, a 1200x630
//! PNG card comes out.
//!
//! # Pipeline
//!
//! 1. **Decode** ([`params`]): the query is decoded with the schema of the
//!    deployment's [`TemplateMode`]. Decoding never fails; missing or unknown
//!    values become defaults.
//! 2. **Layout** ([`rendering`]): a pure template turns the parameters into a
//!    [`LayoutTree`] and the list of font faces it needs.
//! 3. **Fonts** ([`fonts`]): the required faces are fetched concurrently. Any
//!    failure fails the request; nothing is substituted.
//! 4. **Raster** ([`rendering::raster`]): the tree and the fonts are painted to
//!    a PNG by a [`Rasterizer`].
//!
//! # Features
//!
//! - **fetch**: HTTP font loader built on reqwest
//! - **server** (default): the HTTP listener and the `ogcard` binary
//!
//! # Example
//!
//! ```
//! use ogcard::params::{decode, encode, QueryParams};
//! use ogcard::rendering::layout::ElementType;
//! use ogcard::TemplateMode;
//!
//! let query = QueryParams::parse("title=Hello+World&theme=blog&fontSize=sm");
//! let params = decode(&query, TemplateMode::Themed);
//! let tree = ogcard::rendering::render(&params);
//! assert_eq!(tree.count(ElementType::Rule), 2);
//!
//! let url = encode(&params, "https://blog.example.com").unwrap();
//! assert_eq!(url.path(), "/api/og");
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod fonts;
pub mod params;
pub mod rendering;
pub mod service;
pub mod theme;

// HTTP boundary (listener and worker pool)
#[cfg(feature = "server")]
pub mod server;

pub use params::{ImageParams, QueryParams, TemplateMode};
pub use rendering::layout::LayoutTree;
pub use rendering::raster::{PixmapRasterizer, Rasterizer};
pub use rendering::RenderedImage;
pub use service::{GeneratedImage, ImageService};

/// Configuration for the image service
///
/// Every field has a default, so a configuration file only needs to name
/// the values it changes.
///
/// # Examples
///
/// ```
/// let cfg = ogcard::ServiceConfig::default();
/// assert_eq!(cfg.endpoint_path, "/api/og");
/// assert_eq!(cfg.template, ogcard::TemplateMode::Post);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener address
    pub bind_addr: String,
    /// Path of the image endpoint
    pub endpoint_path: String,
    /// Card served by this deployment
    pub template: TemplateMode,
    /// Worker threads; 0 means one per CPU
    pub workers: usize,
    /// Timeout for a single font fetch in milliseconds
    pub fetch_timeout_ms: u64,
    /// User agent sent with font fetches
    pub user_agent: String,
    /// Face used for text in the generic sans-serif family
    pub fallback_font: Option<PathBuf>,
    /// `Cache-Control` value sent with images
    pub cache_control: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            endpoint_path: params::ENDPOINT_PATH.to_string(),
            template: TemplateMode::Post,
            workers: 0,
            fetch_timeout_ms: 30000,
            user_agent: format!("ogcard/{}", env!("CARGO_PKG_VERSION")),
            fallback_font: Some(PathBuf::from(
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            )),
            cache_control: "public, immutable, no-transform, max-age=31536000".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load a configuration from a JSON file. Missing fields keep their
    /// defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: ServiceConfig = serde_json::from_str(&raw).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.endpoint_path.starts_with('/') {
            return Err(Error::ConfigError(format!(
                "endpoint_path must start with '/': {:?}",
                self.endpoint_path
            )));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(Error::ConfigError("fetch_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    /// Number of worker threads to start.
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }

    /// Shareable image URL for `params` on this deployment's endpoint.
    pub fn share_url(&self, params: &ImageParams, base: &str) -> Result<url::Url> {
        params::encode_at(params, base, &self.endpoint_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ogcard-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn default_config() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.bind_addr, "127.0.0.1:3000");
        assert_eq!(cfg.fetch_timeout_ms, 30000);
        assert!(cfg.user_agent.starts_with("ogcard/"));
        assert!(cfg.cache_control.contains("immutable"));
        assert!(cfg.validate().is_ok());
        assert!(cfg.worker_count() >= 1);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let path = write_temp(
            "partial.json",
            r#"{ "template": "themed", "workers": 3, "fallback_font": null }"#,
        );
        let cfg = ServiceConfig::from_json_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(cfg.template, TemplateMode::Themed);
        assert_eq!(cfg.worker_count(), 3);
        assert_eq!(cfg.fallback_font, None);
        assert_eq!(cfg.endpoint_path, "/api/og");
    }

    #[test]
    fn invalid_files_are_config_errors() {
        let path = write_temp("bad.json", "{ not json");
        let err = ServiceConfig::from_json_file(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, Error::ConfigError(_)));

        let path = write_temp("badpath.json", r#"{ "endpoint_path": "api/og" }"#);
        let err = ServiceConfig::from_json_file(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, Error::ConfigError(_)));

        let err = ServiceConfig::from_json_file(Path::new("/nonexistent/ogcard.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn share_url_uses_the_configured_endpoint() {
        let query = QueryParams::parse("title=Hi&theme=blog");
        let params = params::decode(&query, TemplateMode::Themed);

        let cfg = ServiceConfig {
            endpoint_path: "/og/card.png".to_string(),
            ..Default::default()
        };
        let url = cfg.share_url(&params, "https://example.com/blog/").unwrap();
        assert_eq!(url.path(), "/og/card.png");
        assert!(url.query().unwrap().starts_with("title=Hi"));

        let url = ServiceConfig::default()
            .share_url(&params, "https://example.com")
            .unwrap();
        assert_eq!(url.path(), "/api/og");

        assert!(matches!(
            cfg.share_url(&params, "not a url"),
            Err(Error::UrlError(_))
        ));
    }
}

//! Font catalog and font asset loading.
//!
//! Templates name the faces they need as [`FontRequest`]s; a [`FontLoader`]
//! turns each request into bytes. [`fetch_fonts`] issues all loads of a
//! request concurrently and fails as soon as any of them fails. There is no
//! fallback face: text in a face that could not be loaded would render with
//! the wrong glyph coverage, so the whole image fails instead.

use futures::future::{try_join_all, BoxFuture};
use serde::Serialize;

use crate::{Error, Result};

/// Face used by the post card
pub const PRETENDARD: &str = "Pretendard";
pub const PRETENDARD_BOLD_URL: &str =
    "https://cdn.jsdelivr.net/gh/orioncactus/pretendard@v1.3.9/packages/pretendard/dist/public/static/Pretendard-Bold.otf";
pub const PRETENDARD_MEDIUM_URL: &str =
    "https://cdn.jsdelivr.net/gh/orioncactus/pretendard@v1.3.9/packages/pretendard/dist/public/static/Pretendard-Medium.otf";

/// Serif display face used by the blog theme
pub const SERIF_DISPLAY: &str = "Noto Serif KR";
pub const SERIF_BOLD_URL: &str =
    "https://cdn.jsdelivr.net/gh/notofonts/noto-cjk@main/Serif/OTF/Korean/NotoSerifKR-Bold.otf";
pub const SERIF_LIGHT_URL: &str =
    "https://cdn.jsdelivr.net/gh/notofonts/noto-cjk@main/Serif/OTF/Korean/NotoSerifKR-Light.otf";

/// A font face a layout needs before it can be rasterized
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FontRequest {
    pub face_name: String,
    /// Where the asset bytes come from (an `http(s)` URL)
    pub source: String,
    pub weight: u16,
}

impl FontRequest {
    pub fn new(face_name: &str, source: &str, weight: u16) -> Self {
        Self {
            face_name: face_name.to_string(),
            source: source.to_string(),
            weight,
        }
    }
}

/// Loaded font bytes together with the face they were requested as
#[derive(Clone, PartialEq, Eq)]
pub struct FontAsset {
    pub face_name: String,
    pub weight: u16,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for FontAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAsset")
            .field("face_name", &self.face_name)
            .field("weight", &self.weight)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Source of font bytes.
pub trait FontLoader: Send + Sync {
    fn load<'a>(&'a self, request: &'a FontRequest) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Load every requested face concurrently.
///
/// Results keep the order of `requests`. The first failure cancels the
/// remaining loads and is returned.
pub async fn fetch_fonts(loader: &dyn FontLoader, requests: &[FontRequest]) -> Result<Vec<FontAsset>> {
    let loads = requests.iter().map(|req| async move {
        log::debug!("fetching font {} {} from {}", req.face_name, req.weight, req.source);
        let data = loader.load(req).await?;
        Ok::<_, Error>(FontAsset {
            face_name: req.face_name.clone(),
            weight: req.weight,
            data,
        })
    });
    try_join_all(loads).await
}

/// Loads fonts over HTTP(S) with reqwest.
#[cfg(feature = "fetch")]
pub struct HttpFontLoader {
    client: reqwest::Client,
}

#[cfg(feature = "fetch")]
impl HttpFontLoader {
    pub fn new(user_agent: &str, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "fetch")]
impl FontLoader for HttpFontLoader {
    fn load<'a>(&'a self, request: &'a FontRequest) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let url = request.source.as_str();
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| Error::FontFetchError(format!("GET {} failed: {}", url, e)))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(Error::FontFetchError(format!("GET {} returned {}", url, status)));
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| Error::FontFetchError(format!("Failed to read {}: {}", url, e)))?;
            if bytes.is_empty() {
                return Err(Error::FontFetchError(format!("GET {} returned an empty body", url)));
            }
            Ok(bytes.to_vec())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapLoader {
        assets: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl FontLoader for MapLoader {
        fn load<'a>(&'a self, request: &'a FontRequest) -> BoxFuture<'a, Result<Vec<u8>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                self.assets
                    .get(&request.source)
                    .cloned()
                    .ok_or_else(|| Error::FontFetchError(format!("missing {}", request.source)))
            })
        }
    }

    fn loader(entries: &[(&str, &str)]) -> MapLoader {
        MapLoader {
            assets: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn fetch_keeps_request_order() {
        let l = loader(&[("a://bold", "B"), ("a://light", "L")]);
        let reqs = vec![
            FontRequest::new("Serif", "a://bold", 700),
            FontRequest::new("Serif", "a://light", 300),
        ];
        let assets = fetch_fonts(&l, &reqs).await.unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].weight, 700);
        assert_eq!(assets[0].data, b"B");
        assert_eq!(assets[1].weight, 300);
        assert_eq!(assets[1].data, b"L");
    }

    #[tokio::test]
    async fn one_failed_load_fails_everything() {
        let l = loader(&[("a://bold", "B")]);
        let reqs = vec![
            FontRequest::new("Serif", "a://bold", 700),
            FontRequest::new("Serif", "a://light", 300),
        ];
        let err = fetch_fonts(&l, &reqs).await.unwrap_err();
        assert!(matches!(err, Error::FontFetchError(_)));
    }

    #[tokio::test]
    async fn no_requests_means_no_loads() {
        let l = loader(&[]);
        let assets = fetch_fonts(&l, &[]).await.unwrap();
        assert!(assets.is_empty());
        assert_eq!(l.calls.load(Ordering::SeqCst), 0);
    }
}

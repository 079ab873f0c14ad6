//! Per-request pipeline: decode, lay out, fetch fonts, rasterize.

use std::sync::Arc;

use crate::fonts::{fetch_fonts, FontLoader};
use crate::params::{decode, ImageParams, QueryParams};
use crate::rendering::layout::LayoutTree;
use crate::rendering::raster::Rasterizer;
use crate::rendering::{self, RenderedImage};
use crate::{Result, ServiceConfig};

/// A rasterized card and its entity tag
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub image: RenderedImage,
    /// Quoted hex digest of the layout tree
    pub etag: String,
}

/// Stateless image service.
///
/// Holds only configuration and the two I/O seams; every request builds its
/// parameters, tree and font assets from scratch, so one service can be
/// shared by any number of concurrent requests.
pub struct ImageService {
    config: ServiceConfig,
    loader: Arc<dyn FontLoader>,
    rasterizer: Arc<dyn Rasterizer>,
}

impl ImageService {
    /// Service with the HTTP font loader and the tiny-skia backend.
    #[cfg(feature = "fetch")]
    pub fn new(config: ServiceConfig) -> Result<Self> {
        use crate::fonts::HttpFontLoader;
        use crate::rendering::raster::PixmapRasterizer;

        config.validate()?;
        let loader = HttpFontLoader::new(&config.user_agent, config.fetch_timeout_ms)?;
        let rasterizer = PixmapRasterizer::from_fallback_path(config.fallback_font.as_deref());
        Ok(Self::with_components(config, Arc::new(loader), Arc::new(rasterizer)))
    }

    pub fn with_components(
        config: ServiceConfig,
        loader: Arc<dyn FontLoader>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        Self {
            config,
            loader,
            rasterizer,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Decode `query` with this deployment's template mode.
    pub fn decode(&self, query: &str) -> ImageParams {
        decode(&QueryParams::parse(query), self.config.template)
    }

    pub fn layout_for_query(&self, query: &str) -> LayoutTree {
        let params = self.decode(query);
        log::debug!("decoded {:?}", params);
        rendering::render(&params)
    }

    /// Produce the card for `query`.
    pub async fn generate(&self, query: &str) -> Result<GeneratedImage> {
        let tree = self.layout_for_query(query);
        self.generate_tree(&tree).await
    }

    /// Fetch the fonts `tree` needs and rasterize it.
    pub async fn generate_tree(&self, tree: &LayoutTree) -> Result<GeneratedImage> {
        let etag = etag_for(tree)?;
        let fonts = fetch_fonts(self.loader.as_ref(), &tree.fonts).await?;
        log::debug!("rasterizing {} with {} font(s)", etag, fonts.len());
        let image = self.rasterizer.rasterize(tree, &fonts)?;
        Ok(GeneratedImage { image, etag })
    }
}

/// Entity tag for a layout: its digest in double quotes.
pub fn etag_for(tree: &LayoutTree) -> Result<String> {
    Ok(format!("\"{}\"", tree.digest()?))
}

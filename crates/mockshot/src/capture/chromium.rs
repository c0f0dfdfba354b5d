//! DOM capture through the Chrome DevTools Protocol.

use super::{Rasterizer, Region};
use crate::bitmap::RasterBitmap;
use crate::result::CaptureError;
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::dom::Rgba;
use chromiumoxide::cdp::browser_protocol::emulation::SetDefaultBackgroundColorOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, Viewport,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Browser launch options for [`ChromiumRasterizer`]
#[derive(Debug, Clone)]
pub struct ChromiumRasterizerConfig {
    /// Page that holds the mockup
    pub url: String,
    /// Run without a window
    pub headless: bool,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Window width
    pub viewport_width: u32,
    /// Window height
    pub viewport_height: u32,
}

impl Default for ChromiumRasterizerConfig {
    fn default() -> Self {
        Self {
            url: String::from("about:blank"),
            headless: true,
            chromium_path: None,
            sandbox: true,
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

impl ChromiumRasterizerConfig {
    /// Config for a page URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set window size
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }
}

/// Rasterizer backed by a live Chromium page.
///
/// Regions are CSS selectors; each capture clips a screenshot to the
/// element's bounding box.
#[derive(Debug)]
pub struct ChromiumRasterizer {
    page: Arc<Mutex<CdpPage>>,
    _browser: CdpBrowser,
    handle: tokio::task::JoinHandle<()>,
}

fn cdp_error(context: &str, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::rasterizer(format!("{context}: {err}"))
}

impl ChromiumRasterizer {
    /// Launch chromium and open `config.url`
    pub async fn launch(config: ChromiumRasterizerConfig) -> Result<Self, CaptureError> {
        let mut builder =
            CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(|e| cdp_error("browser config", e))?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| cdp_error("browser launch", e))?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page(config.url.as_str())
            .await
            .map_err(|e| cdp_error("open page", e))?;
        tracing::info!(url = %config.url, headless = config.headless, "chromium ready");

        Ok(Self {
            page: Arc::new(Mutex::new(page)),
            _browser: browser,
            handle,
        })
    }

    /// Measure the element matching `selector` and return it as a region
    pub async fn region(&self, selector: &str) -> Result<Region, CaptureError> {
        let page = self.page.lock().await;
        let element = page
            .find_element(selector)
            .await
            .map_err(|e| cdp_error(selector, e))?;
        let bounds = element
            .bounding_box()
            .await
            .map_err(|e| cdp_error(selector, e))?;
        Ok(Region::new(selector, bounds.width, bounds.height))
    }
}

impl Drop for ChromiumRasterizer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[async_trait]
impl Rasterizer for ChromiumRasterizer {
    async fn rasterize(
        &self,
        region: &Region,
        scale: f64,
        transparent_background: bool,
    ) -> Result<RasterBitmap, CaptureError> {
        let page = self.page.lock().await;
        let element = page
            .find_element(region.id.as_str())
            .await
            .map_err(|e| cdp_error(&region.id, e))?;
        let bounds = element
            .bounding_box()
            .await
            .map_err(|e| cdp_error(&region.id, e))?;

        if transparent_background {
            let clear = SetDefaultBackgroundColorOverrideParams {
                color: Some(Rgba {
                    r: 0,
                    g: 0,
                    b: 0,
                    a: Some(0.0),
                }),
            };
            page.execute(clear)
                .await
                .map_err(|e| cdp_error("background override", e))?;
        }

        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(Viewport {
                x: bounds.x,
                y: bounds.y,
                width: region.width,
                height: region.height,
                scale,
            })
            .capture_beyond_viewport(true)
            .build();
        let shot = page.execute(params).await;

        if transparent_background {
            if let Err(e) = page
                .execute(SetDefaultBackgroundColorOverrideParams::default())
                .await
            {
                tracing::warn!(error = %e, "failed to restore page background");
            }
        }

        let shot = shot.map_err(|e| cdp_error("screenshot", e))?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| cdp_error("screenshot payload", e))?;
        let bitmap = RasterBitmap::decode(&png).map_err(|e| cdp_error("screenshot decode", e))?;

        // CDP rounds the clip on its own; snap to round(css * scale)
        let (width, height) = region.pixel_size(scale);
        Ok(bitmap.resized(width, height))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ChromiumRasterizerConfig::new("http://localhost:5173/editor")
            .with_headless(false)
            .with_no_sandbox()
            .with_viewport(390, 844)
            .with_chromium_path("/usr/bin/chromium");
        assert_eq!(config.url, "http://localhost:5173/editor");
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!((config.viewport_width, config.viewport_height), (390, 844));
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
    }

    #[test]
    fn test_default_is_headless() {
        let config = ChromiumRasterizerConfig::default();
        assert!(config.headless);
        assert!(config.sandbox);
    }

    #[tokio::test]
    #[ignore = "Launches a local chromium"]
    async fn test_rasterize_element_at_scale() {
        let html = "data:text/html,<div id='post' style='width:120px;height:40px;background:red'></div>";
        let rasterizer = ChromiumRasterizer::launch(ChromiumRasterizerConfig::new(html).with_no_sandbox())
            .await
            .unwrap();
        let region = rasterizer.region("#post").await.unwrap();
        assert_eq!((region.width, region.height), (120.0, 40.0));

        let bitmap = rasterizer.rasterize(&region, 2.0, true).await.unwrap();
        assert_eq!(bitmap.dimensions(), (240, 80));
        assert_eq!(bitmap.pixel(120, 40).unwrap(), [255, 0, 0, 255]);
    }
}

//! Declarative scenes rasterized in-process.
//!
//! A scene is a page background plus a list of painted boxes, enough to
//! stand in for a mockup DOM in tests and in the CLI.

use super::{Rasterizer, Region};
use crate::bitmap::RasterBitmap;
use crate::geometry::{blend_over, with_coverage, RoundedRect};
use crate::result::{CaptureError, MockshotError, MockshotResult};
use async_trait::async_trait;
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const PAGE_WHITE: [u8; 4] = [255, 255, 255, 255];

/// A painted box, in CSS pixels relative to the scene origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneElement {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Fill colour, straight RGBA
    pub color: [u8; 4],
    /// Corner radius
    #[serde(default)]
    pub radius: f64,
}

impl SceneElement {
    /// Create a square-cornered box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64, color: [u8; 4]) -> Self {
        Self {
            x,
            y,
            width,
            height,
            color,
            radius: 0.0,
        }
    }

    /// Round the corners
    #[must_use]
    pub const fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }
}

/// Layout of one capturable region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Layout width in CSS pixels
    pub width: f64,
    /// Layout height in CSS pixels
    pub height: f64,
    /// Page background; white when absent
    #[serde(default)]
    pub background: Option<[u8; 4]>,
    /// Boxes painted in order
    #[serde(default)]
    pub elements: Vec<SceneElement>,
}

impl Scene {
    /// Create an empty scene
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: None,
            elements: Vec::new(),
        }
    }

    /// Set the page background
    #[must_use]
    pub const fn with_background(mut self, color: [u8; 4]) -> Self {
        self.background = Some(color);
        self
    }

    /// Add a box
    #[must_use]
    pub fn with_element(mut self, element: SceneElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Region handle for this scene under `id`
    #[must_use]
    pub fn region(&self, id: impl Into<String>) -> Region {
        Region::new(id, self.width, self.height)
    }

    /// Parse a YAML scene
    pub fn from_yaml(yaml: &str) -> MockshotResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a scene file; `.json` is parsed as JSON, anything else as YAML
    pub fn load(path: &Path) -> MockshotResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&text)?)
        } else {
            Self::from_yaml(&text)
        }
    }

    fn paint(&self, width: u32, height: u32, scale: f64, transparent: bool) -> RasterBitmap {
        let mut bitmap = if transparent {
            RasterBitmap::new(width, height)
        } else {
            RasterBitmap::filled(width, height, self.background.unwrap_or(PAGE_WHITE))
        };

        let canvas = bitmap.as_image_mut();
        for element in &self.elements {
            if element.color[3] == 0 {
                continue;
            }
            let rect = RoundedRect::new(
                (element.x * scale) as f32,
                (element.y * scale) as f32,
                (element.width * scale) as f32,
                (element.height * scale) as f32,
                (element.radius * scale) as f32,
            );
            let color = Rgba(element.color);
            let (x0, y0, x1, y1) = rect.pixel_bounds(width, height);
            for y in y0..y1 {
                for x in x0..x1 {
                    let coverage = rect.coverage(x, y);
                    if coverage > 0.0 {
                        let dst = *canvas.get_pixel(x, y);
                        canvas.put_pixel(x, y, blend_over(dst, with_coverage(color, coverage)));
                    }
                }
            }
        }
        bitmap
    }
}

/// Software [`Rasterizer`] over named scenes.
#[derive(Debug, Clone, Default)]
pub struct SceneRasterizer {
    scenes: HashMap<String, Scene>,
}

impl SceneRasterizer {
    /// Create a rasterizer with no scenes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scene under a region id
    #[must_use]
    pub fn with_scene(mut self, id: impl Into<String>, scene: Scene) -> Self {
        self.insert(id, scene);
        self
    }

    /// Register a scene under a region id
    pub fn insert(&mut self, id: impl Into<String>, scene: Scene) {
        self.scenes.insert(id.into(), scene);
    }

    /// Look up a scene
    #[must_use]
    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    /// Region handle of a registered scene
    pub fn region(&self, id: &str) -> MockshotResult<Region> {
        self.scene(id)
            .map(|scene| scene.region(id))
            .ok_or_else(|| MockshotError::from(unknown_region(id)))
    }
}

fn unknown_region(id: &str) -> CaptureError {
    CaptureError::rasterizer(format!("no scene registered for '{id}'"))
}

#[async_trait]
impl Rasterizer for SceneRasterizer {
    async fn rasterize(
        &self,
        region: &Region,
        scale: f64,
        transparent_background: bool,
    ) -> Result<RasterBitmap, CaptureError> {
        let scene = self.scene(&region.id).ok_or_else(|| unknown_region(&region.id))?;
        let (width, height) = region.pixel_size(scale);
        Ok(scene.paint(width, height, scale, transparent_background))
    }
}

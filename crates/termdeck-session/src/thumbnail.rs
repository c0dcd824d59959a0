//! Thumbnail images derived from a surface's visible text.

use termdeck_core::{Dimensions, ThumbnailSettings};

/// 8-bit grayscale preview image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Thumbnail {
    /// Wrap a pixel buffer. Missing pixels are filled black, extra ones dropped.
    pub fn new(width: u32, height: u32, mut pixels: Vec<u8>) -> Self {
        pixels.resize(width as usize * height as usize, 0);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x < self.width && y < self.height {
            self.pixels
                .get(y as usize * self.width as usize + x as usize)
                .copied()
        } else {
            None
        }
    }

    /// Number of non-black pixels.
    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p > 0).count()
    }
}

/// Turns the visible text of a surface into a thumbnail.
pub trait ThumbnailRenderer: Send {
    /// Render `text` (visible rows joined with `\n`) laid out on a grid of
    /// `dimensions`.
    fn render(&self, text: &str, dimensions: Dimensions) -> Thumbnail;
}

/// Maps every pixel onto a character cell and lights it when the cell holds
/// a visible character.
#[derive(Debug, Clone)]
pub struct TextThumbnailRenderer {
    width: u32,
    height: u32,
}

impl TextThumbnailRenderer {
    /// Renderer producing images of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

impl From<&ThumbnailSettings> for TextThumbnailRenderer {
    fn from(settings: &ThumbnailSettings) -> Self {
        Self::new(settings.width, settings.height)
    }
}

impl Default for TextThumbnailRenderer {
    fn default() -> Self {
        Self::from(&ThumbnailSettings::default())
    }
}

impl ThumbnailRenderer for TextThumbnailRenderer {
    fn render(&self, text: &str, dimensions: Dimensions) -> Thumbnail {
        let rows: Vec<Vec<char>> = text.lines().map(|l| l.chars().collect()).collect();
        let grid_rows = u64::from(dimensions.rows.max(1));
        let grid_cols = u64::from(dimensions.cols.max(1));

        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            let row = (u64::from(y) * grid_rows / u64::from(self.height)) as usize;
            for x in 0..self.width {
                let col = (u64::from(x) * grid_cols / u64::from(self.width)) as usize;
                let lit = rows
                    .get(row)
                    .and_then(|r| r.get(col))
                    .is_some_and(|c| !c.is_whitespace());
                pixels.push(if lit { 255 } else { 0 });
            }
        }

        Thumbnail::new(self.width, self.height, pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_new_pads_pixels() {
        let thumb = Thumbnail::new(2, 2, vec![1]);
        assert_eq!(thumb.pixels(), &[1, 0, 0, 0]);
        assert_eq!(thumb.pixel(0, 0), Some(1));
        assert_eq!(thumb.pixel(2, 0), None);
    }

    #[test]
    fn test_blank_text_renders_black() {
        let renderer = TextThumbnailRenderer::new(16, 8);
        let thumb = renderer.render("", Dimensions::new(24, 80));
        assert_eq!(thumb.width(), 16);
        assert_eq!(thumb.height(), 8);
        assert_eq!(thumb.lit_pixels(), 0);
    }

    #[test]
    fn test_one_to_one_mapping() {
        // Same size as the grid: every pixel is exactly one cell
        let renderer = TextThumbnailRenderer::new(4, 2);
        let thumb = renderer.render("a b\n  cd", Dimensions::new(2, 4));
        assert_eq!(thumb.pixels(), &[255, 0, 255, 0, 0, 0, 255, 255]);
    }

    #[test]
    fn test_more_text_lights_more_pixels() {
        let renderer = TextThumbnailRenderer::new(40, 12);
        let dims = Dimensions::new(24, 80);
        let short = renderer.render("$ ls", dims);
        let long = renderer.render(&"x".repeat(80 * 10), dims);
        assert!(long.lit_pixels() > short.lit_pixels());
    }

    #[test]
    fn test_from_settings() {
        let settings = ThumbnailSettings {
            width: 32,
            height: 20,
        };
        let thumb = TextThumbnailRenderer::from(&settings).render("x", Dimensions::new(1, 1));
        assert_eq!((thumb.width(), thumb.height()), (32, 20));
        assert_eq!(thumb.lit_pixels(), 32 * 20);
    }
}

//! Geometry types for display regions and terminal grids.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Largest row or column count a checked geometry accepts.
pub const MAX_GRID_CELLS: u16 = 4096;

/// Dimensions of a terminal grid in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Dimensions {
    /// Number of rows
    pub rows: u16,
    /// Number of columns
    pub cols: u16,
}

impl Dimensions {
    /// Create new dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Total cell count (rows * cols).
    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

/// Rectangle in the host window, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DisplayRegion {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl DisplayRegion {
    /// Create a new display region.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region of the given size anchored at the origin.
    pub fn sized(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Size of one character cell in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct CellMetrics {
    /// Cell width in pixels
    pub width: u16,
    /// Cell height in pixels
    pub height: u16,
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self {
            width: 8,
            height: 16,
        }
    }
}

/// Geometry handed to the engine: pixel size plus the derived cell grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SurfaceGeometry {
    /// Width in pixels
    pub pixel_width: u32,
    /// Height in pixels
    pub pixel_height: u32,
    /// Cell grid that fits in the pixel area
    pub cells: Dimensions,
}

impl SurfaceGeometry {
    /// Derive the geometry for a region. The grid is never smaller than 1x1.
    pub fn from_region(region: DisplayRegion, metrics: CellMetrics) -> Self {
        let cell_w = u32::from(metrics.width.max(1));
        let cell_h = u32::from(metrics.height.max(1));
        let cols = (region.width / cell_w).clamp(1, u32::from(u16::MAX)) as u16;
        let rows = (region.height / cell_h).clamp(1, u32::from(u16::MAX)) as u16;

        Self {
            pixel_width: region.width,
            pixel_height: region.height,
            cells: Dimensions::new(rows, cols),
        }
    }

    /// Like [`from_region`](Self::from_region), but a region that cannot
    /// hold a single cell, or whose grid exceeds [`MAX_GRID_CELLS`] on
    /// either axis, is an error.
    pub fn checked_from_region(region: DisplayRegion, metrics: CellMetrics) -> Result<Self> {
        let cell_w = u32::from(metrics.width.max(1));
        let cell_h = u32::from(metrics.height.max(1));
        let cols = (region.width / cell_w).min(u32::from(u16::MAX)) as u16;
        let rows = (region.height / cell_h).min(u32::from(u16::MAX)) as u16;

        if rows == 0 || cols == 0 || rows > MAX_GRID_CELLS || cols > MAX_GRID_CELLS {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        Ok(Self::from_region(region, metrics))
    }
}

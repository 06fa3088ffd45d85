/// Axis-aligned rectangle in image pixel coordinates, top-left origin.
///
/// Region rectangles are always expressed in the coordinate space of the
/// original page image and are never re-derived after merging.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RectPx {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectPx {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.w
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.h
    }

    pub fn mid_y(&self) -> f32 {
        self.y + self.h * 0.5
    }

    pub fn union(&self, other: &RectPx) -> RectPx {
        let x1 = self.min_x().min(other.min_x());
        let y1 = self.min_y().min(other.min_y());
        let x2 = self.max_x().max(other.max_x());
        let y2 = self.max_y().max(other.max_y());
        RectPx {
            x: x1,
            y: y1,
            w: x2 - x1,
            h: y2 - y1,
        }
    }

    /// Expands outward by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> RectPx {
        RectPx {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + margin * 2.0,
            h: self.h + margin * 2.0,
        }
    }

    /// Intersects with the image bounds, returning integer pixel extents.
    /// Degenerate rectangles collapse to a zero-sized result.
    pub fn clamped(&self, width: u32, height: u32) -> ClampedRect {
        let x1 = self.min_x().max(0.0).min(width as f32) as u32;
        let y1 = self.min_y().max(0.0).min(height as f32) as u32;
        let x2 = self.max_x().max(0.0).min(width as f32) as u32;
        let y2 = self.max_y().max(0.0).min(height as f32) as u32;
        ClampedRect {
            x: x1,
            y: y1,
            w: x2.saturating_sub(x1),
            h: y2.saturating_sub(y1),
        }
    }
}

/// Integer pixel extents of a rectangle after clamping to image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl ClampedRect {
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

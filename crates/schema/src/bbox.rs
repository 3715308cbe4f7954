/// Axis-aligned pixel rectangle, top-left origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box from a normalized center/size record against a frame of
    /// `frame_width` x `frame_height` pixels.
    ///
    /// Pixel values are truncated toward zero and a negative top-left corner
    /// is clamped to 0. Width and height are left untouched.
    pub fn from_normalized_center(
        cx: f32,
        cy: f32,
        width: f32,
        height: f32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let center_x = (cx * frame_width as f32) as i32;
        let center_y = (cy * frame_height as f32) as i32;
        let box_width = (width * frame_width as f32) as i32;
        let box_height = (height * frame_height as f32) as i32;

        Self {
            x: (center_x - box_width / 2).max(0),
            y: (center_y - box_height / 2).max(0),
            width: box_width,
            height: box_height,
        }
    }

    pub fn area(&self) -> i64 {
        if self.width <= 0 || self.height <= 0 {
            return 0;
        }
        self.width as i64 * self.height as i64
    }

    pub fn bottom_right(&self) -> (i32, i32) {
        (self.x + self.width, self.y + self.height)
    }

    pub fn intersection_area(&self, other: &Self) -> i64 {
        let (ax2, ay2) = self.bottom_right();
        let (bx2, by2) = other.bottom_right();

        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = ax2.min(bx2);
        let y2 = ay2.min(by2);

        if x2 <= x1 || y2 <= y1 {
            return 0;
        }
        (x2 - x1) as i64 * (y2 - y1) as i64
    }

    /// Intersection over union. Two empty boxes have an IoU of 0.
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0 {
            return 0.0;
        }
        intersection as f32 / union as f32
    }

    /// Clamp the bottom-right corner to `limit` on both axes, shrinking the
    /// box. The top-left corner is not moved.
    pub fn clamp_bottom_right(&self, limit: u32) -> Self {
        let limit = limit as i32;
        let (x2, y2) = self.bottom_right();
        Self {
            x: self.x,
            y: self.y,
            width: x2.min(limit) - self.x,
            height: y2.min(limit) - self.y,
        }
    }
}

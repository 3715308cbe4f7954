use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use schema::{BoundingBox, Frame};

/// BGR (0, 170, 50)
pub const BOX_COLOR: Rgb<u8> = Rgb([50, 170, 0]);
pub const BOX_THICKNESS: i32 = 3;

/// Draw a hollow rectangle along the box edges, centered on the outline.
/// Empty boxes draw nothing; pixels outside the frame are clipped.
pub fn draw_detection(frame: &mut Frame, bbox: &BoundingBox) {
    if bbox.width <= 0 || bbox.height <= 0 {
        return;
    }

    let half = BOX_THICKNESS / 2;
    for offset in -half..=(BOX_THICKNESS - 1 - half) {
        let width = bbox.width - 2 * offset;
        let height = bbox.height - 2 * offset;
        if width <= 0 || height <= 0 {
            continue;
        }
        let rect = Rect::at(bbox.x + offset, bbox.y + offset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(frame, rect, BOX_COLOR);
    }
}

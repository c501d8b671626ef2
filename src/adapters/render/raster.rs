use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use super::glyphs::{glyph_bits, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::application::ports::Canvas;
use crate::domain::detection::BoundingBox;
use crate::domain::stream::Frame;

/// Frames are drawn on in place; the overlay lands in the displayed pixels.
impl Canvas for Frame {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn stroke_rect(&mut self, rect: BoundingBox, color: Rgb<u8>, thickness: u32) {
        // corners may lie far outside the frame; keep the border just off-canvas
        let pad = thickness.min(i32::MAX as u32) as i32;
        let (w, h) = (self.image.width() as i32, self.image.height() as i32);
        let cx = |v: i32| v.clamp(-pad, w.saturating_add(pad));
        let cy = |v: i32| v.clamp(-pad, h.saturating_add(pad));
        let rect = BoundingBox::new(cx(rect.x1), cy(rect.y1), cx(rect.x2), cy(rect.y2));

        for inset in 0..pad {
            let w = rect.width() - 2 * inset;
            let h = rect.height() - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let r = Rect::at(rect.x1 + inset, rect.y1 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut self.image, r, color);
        }
    }

    fn shade_rect(&mut self, rect: BoundingBox, color: Rgb<u8>, alpha: f32) {
        let Some((x0, y0, x1, y1)) = clip(&self.image, rect) else {
            return;
        };
        let alpha = alpha.clamp(0.0, 1.0);
        for y in y0..y1 {
            for x in x0..x1 {
                let px = self.image.get_pixel_mut(x, y);
                for c in 0..3 {
                    let blended = color[c] as f32 * alpha + px[c] as f32 * (1.0 - alpha);
                    px[c] = blended.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb<u8>, scale: u32) {
        draw_label(&mut self.image, x, y, text, color, scale.max(1));
    }

    fn text_size(&self, text: &str, scale: u32) -> (u32, u32) {
        let scale = scale.max(1);
        let chars = text.chars().count() as u32;
        let width = if chars == 0 { 0 } else { (chars - 1) * ADVANCE + GLYPH_WIDTH };
        (width * scale, GLYPH_HEIGHT * scale)
    }
}

/// Rect clipped to the image as half-open pixel ranges.
fn clip(image: &RgbImage, rect: BoundingBox) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let x0 = rect.x1.clamp(0, w);
    let x1 = rect.x2.clamp(0, w);
    let y0 = rect.y1.clamp(0, h);
    let y1 = rect.y2.clamp(0, h);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

fn draw_label(image: &mut RgbImage, mut x: i32, y: i32, text: &str, color: Rgb<u8>, scale: u32) {
    let (width, height) = (image.width() as i32, image.height() as i32);
    let s = scale as i32;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    for dy in 0..s {
                        for dx in 0..s {
                            let px = x + col as i32 * s + dx;
                            let py = y + row as i32 * s + dy;
                            if px >= 0 && px < width && py >= 0 && py < height {
                                image.put_pixel(px as u32, py as u32, color);
                            }
                        }
                    }
                }
            }
        }
        x += ADVANCE as i32 * s;
    }
}

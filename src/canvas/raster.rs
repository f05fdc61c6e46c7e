//! RGBA drawing surface and its wire encoding

use super::geometry::Point;
use crate::error::CanvasError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};

pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Prefix the server strips before base64-decoding a frame
pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// The drawing surface, owned by the stroke pipeline
#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    /// Create a surface filled with the background colour
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    /// Paint the whole surface with the background colour
    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = BACKGROUND;
        }
    }

    /// Filled disc, used for taps
    pub fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba<u8>) {
        self.stroke_line(center, center, radius * 2.0, color);
    }

    /// Line with round caps: every pixel whose center lies within
    /// `width / 2` of the segment is painted
    pub fn stroke_line(&mut self, from: Point, to: Point, width: f32, color: Rgba<u8>) {
        let radius = (width / 2.0).max(0.5);
        let (w, h) = (self.width() as f32, self.height() as f32);

        let min_x = (from.x.min(to.x) - radius).floor().max(0.0);
        let min_y = (from.y.min(to.y) - radius).floor().max(0.0);
        let max_x = (from.x.max(to.x) + radius).ceil().min(w);
        let max_y = (from.y.max(to.y) + radius).ceil().min(h);
        if min_x >= max_x || min_y >= max_y {
            return;
        }

        for y in min_y as u32..max_y as u32 {
            for x in min_x as u32..max_x as u32 {
                let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if distance_to_segment(center, from, to) <= radius {
                    self.image.put_pixel(x, y, color);
                }
            }
        }
    }

    /// Darkest luma in the block `[x0, x1) x [y0, y1)`, clipped to the surface
    ///
    /// Used to downsample for the terminal so thin strokes stay visible.
    pub fn darkest(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> u8 {
        let x1 = x1.min(self.width());
        let y1 = y1.min(self.height());
        let mut darkest = u8::MAX;
        for y in y0..y1 {
            for x in x0..x1 {
                darkest = darkest.min(luma(self.pixel(x, y)));
            }
        }
        darkest
    }

    /// Encode as a PNG data URL
    pub fn encode_data_url(&self) -> Result<String, CanvasError> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            self.image.as_raw(),
            self.width(),
            self.height(),
            ColorType::Rgba8,
        )?;
        Ok(format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(&png)))
    }
}

fn luma(pixel: Rgba<u8>) -> u8 {
    let [r, g, b, _] = pixel.0;
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface_is_background() {
        let surface = Surface::new(40, 30);
        assert_eq!((surface.width(), surface.height()), (40, 30));
        assert_eq!(surface.pixel(0, 0), BACKGROUND);
        assert_eq!(surface.pixel(39, 29), BACKGROUND);
    }

    #[test]
    fn test_fill_circle_radius() {
        let mut surface = Surface::new(400, 400);
        surface.fill_circle(Point::new(200.0, 200.0), 4.0, INK);
        assert_eq!(surface.pixel(200, 200), INK);
        assert_eq!(surface.pixel(203, 200), INK);
        assert_eq!(surface.pixel(196, 200), INK);
        assert_eq!(surface.pixel(205, 200), BACKGROUND);
        assert_eq!(surface.pixel(200, 206), BACKGROUND);
    }

    #[test]
    fn test_stroke_line_covers_segment() {
        let mut surface = Surface::new(100, 100);
        surface.stroke_line(Point::new(10.0, 50.0), Point::new(90.0, 50.0), 8.0, INK);
        for x in [10, 30, 50, 70, 89] {
            assert_eq!(surface.pixel(x, 50), INK, "x = {}", x);
        }
        assert_eq!(surface.pixel(50, 40), BACKGROUND);
    }

    #[test]
    fn test_stroke_clipped_at_edges() {
        let mut surface = Surface::new(20, 20);
        surface.stroke_line(Point::new(-10.0, -10.0), Point::new(30.0, 30.0), 4.0, INK);
        assert_eq!(surface.pixel(0, 0), INK);
        assert_eq!(surface.pixel(19, 19), INK);
    }

    #[test]
    fn test_clear_restores_background() {
        let mut surface = Surface::new(20, 20);
        surface.fill_circle(Point::new(10.0, 10.0), 5.0, INK);
        surface.clear();
        assert_eq!(surface.pixel(10, 10), BACKGROUND);
    }

    #[test]
    fn test_darkest_finds_thin_ink() {
        let mut surface = Surface::new(40, 40);
        surface.stroke_line(Point::new(0.0, 3.5), Point::new(40.0, 3.5), 1.0, INK);
        assert_eq!(surface.darkest(0, 0, 8, 8), 0);
        assert_eq!(surface.darkest(0, 8, 8, 16), 255);
    }

    #[test]
    fn test_data_url_decodes_to_png() {
        let mut surface = Surface::new(16, 8);
        surface.fill_circle(Point::new(4.0, 4.0), 2.0, INK);
        let url = surface.encode_data_url().unwrap();
        let encoded = url.strip_prefix(DATA_URL_PREFIX).unwrap();
        let png = STANDARD.decode(encoded).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 8));
        assert_eq!(*decoded.get_pixel(4, 4), INK);
        assert_eq!(*decoded.get_pixel(15, 0), BACKGROUND);
    }
}

//! Pointer coordinates and display-to-backing mapping

/// A point in canvas or client coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Where the canvas is displayed, in client coordinates
///
/// The displayed size may differ from the backing resolution (a scaled
/// canvas, or a terminal cell grid).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rect of a terminal cell area, two pixel rows per cell
    pub fn from_cells(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self::new(
            x as f32,
            2.0 * y as f32,
            width as f32,
            2.0 * height as f32,
        )
    }

    pub fn contains(&self, client: Point) -> bool {
        client.x >= self.x
            && client.y >= self.y
            && client.x < self.x + self.width
            && client.y < self.y + self.height
    }

    /// Map a client point to backing coordinates:
    /// `(client - origin) * backing / displayed`
    pub fn to_backing(&self, client: Point, backing_width: u32, backing_height: u32) -> Point {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Point::new(0.0, 0.0);
        }
        let scale_x = backing_width as f32 / self.width;
        let scale_y = backing_height as f32 / self.height;
        Point::new(
            (client.x - self.x) * scale_x,
            (client.y - self.y) * scale_y,
        )
    }
}

/// Center of a terminal cell in half-block pixel space
pub fn cell_to_client(column: u16, row: u16) -> Point {
    Point::new(column as f32 + 0.5, 2.0 * row as f32 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mapping() {
        let rect = DisplayRect::new(0.0, 0.0, 400.0, 400.0);
        assert_eq!(rect.to_backing(Point::new(10.0, 20.0), 400, 400), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_scaled_down_display_maps_into_bounds() {
        // 400x400 canvas shown at 200x200, offset on the page
        let rect = DisplayRect::new(300.0, 300.0, 200.0, 200.0);
        let client = Point::new(450.0, 450.0);
        assert!(client.x > 400.0 && client.y > 400.0);
        assert!(rect.contains(client));

        let backing = rect.to_backing(client, 400, 400);
        assert_eq!(backing, Point::new(300.0, 300.0));
        assert!(backing.x < 400.0 && backing.y < 400.0);
    }

    #[test]
    fn test_terminal_cells_map_to_backing() {
        // 50x25 cells at (10, 2) displays 50x50 half-block pixels
        let rect = DisplayRect::from_cells(10, 2, 50, 25);
        assert_eq!(rect, DisplayRect::new(10.0, 4.0, 50.0, 50.0));

        let client = cell_to_client(10, 2);
        let backing = rect.to_backing(client, 400, 400);
        assert_eq!(backing, Point::new(4.0, 8.0));

        let last = cell_to_client(59, 26);
        assert!(rect.contains(last));
        let backing = rect.to_backing(last, 400, 400);
        assert!(backing.x < 400.0 && backing.y < 400.0);
    }

    #[test]
    fn test_contains_excludes_far_edge() {
        let rect = DisplayRect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Point::new(9.9, 0.0)));
        assert!(!rect.contains(Point::new(10.0, 5.0)));
        assert!(!rect.contains(Point::new(-0.1, 5.0)));
    }
}

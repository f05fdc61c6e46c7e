//! Half-block canvas widget
//!
//! Each terminal cell shows two vertical pixels with `▀`: the foreground is
//! the upper pixel, the background the lower one.

use crate::canvas::Surface;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Widget;

const UPPER_HALF: &str = "▀";

/// Darker than this counts as ink
const INK_THRESHOLD: u8 = 128;

pub struct CanvasWidget<'a> {
    surface: &'a Surface,
}

impl<'a> CanvasWidget<'a> {
    pub fn new(surface: &'a Surface) -> Self {
        Self { surface }
    }

    /// Colour of half-block pixel `(column, pixel_row)` in an area of
    /// `columns` x `pixel_rows`
    fn sample(&self, column: u16, pixel_row: u16, columns: u16, pixel_rows: u16) -> Color {
        let (x0, x1) = span(column, columns, self.surface.width());
        let (y0, y1) = span(pixel_row, pixel_rows, self.surface.height());
        if self.surface.darkest(x0, y0, x1, y1) < INK_THRESHOLD {
            Color::Black
        } else {
            Color::White
        }
    }
}

/// Backing range covered by display cell `index` of `count`
fn span(index: u16, count: u16, backing: u32) -> (u32, u32) {
    let count = count.max(1) as u32;
    let start = index as u32 * backing / count;
    let end = ((index as u32 + 1) * backing / count).max(start + 1);
    (start, end.min(backing))
}

impl Widget for CanvasWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let pixel_rows = area.height.saturating_mul(2);
        for row in 0..area.height {
            for column in 0..area.width {
                let top = self.sample(column, row * 2, area.width, pixel_rows);
                let bottom = self.sample(column, row * 2 + 1, area.width, pixel_rows);
                if let Some(cell) = buf.cell_mut((area.x + column, area.y + row)) {
                    cell.set_symbol(UPPER_HALF).set_fg(top).set_bg(bottom);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::raster::INK;
    use crate::canvas::Point;

    #[test]
    fn test_span_covers_backing() {
        assert_eq!(span(0, 50, 400), (0, 8));
        assert_eq!(span(49, 50, 400), (392, 400));
        // More cells than pixels still yields a non-empty range
        assert_eq!(span(3, 800, 400), (1, 2));
    }

    #[test]
    fn test_renders_ink_in_matching_cell() {
        let mut surface = Surface::new(40, 40);
        // Top-left quadrant pixel block
        surface.fill_circle(Point::new(2.0, 2.0), 2.0, INK);

        let area = Rect::new(0, 0, 10, 5);
        let mut buf = Buffer::empty(area);
        CanvasWidget::new(&surface).render(area, &mut buf);

        let corner = &buf[(0, 0)];
        assert_eq!(corner.symbol(), UPPER_HALF);
        assert_eq!(corner.fg, Color::Black);
        assert_eq!(corner.bg, Color::White);

        let far = &buf[(9, 4)];
        assert_eq!(far.fg, Color::White);
        assert_eq!(far.bg, Color::White);
    }
}

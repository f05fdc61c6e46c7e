//! Stroke pipeline: pointer input to local rendering and outbound frames
//!
//! Every movement is rendered immediately. While a stroke is in progress a
//! fixed-interval limiter emits throttled frames; lifting the pointer always
//! emits exactly one final frame.

pub mod geometry;
pub mod raster;

pub use geometry::{cell_to_client, DisplayRect, Point};
pub use raster::Surface;

use crate::error::CanvasError;
use image::Rgba;
use std::time::{Duration, Instant};

/// Default backing resolution
pub const DEFAULT_WIDTH: u32 = 400;
pub const DEFAULT_HEIGHT: u32 = 400;

/// Default interval between throttled frames
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(150);

pub const PEN_WIDTH: f32 = 8.0;
pub const ERASER_WIDTH: f32 = 20.0;

/// One pointer-down-to-pointer-up gesture
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeSegment {
    pub points: Vec<Point>,
    pub stroke_width: f32,
    pub is_eraser: bool,
}

impl StrokeSegment {
    fn color(&self) -> Rgba<u8> {
        if self.is_eraser {
            raster::BACKGROUND
        } else {
            raster::INK
        }
    }
}

/// Why a frame was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Rate-limited snapshot of a stroke in progress
    Throttled,
    /// Snapshot taken when the stroke ends
    Final,
}

/// An encoded canvas snapshot ready for `draw_update`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub kind: FrameKind,
    pub canvas_data: String,
}

/// Canvas owner and frame producer
pub struct StrokePipeline {
    surface: Surface,
    throttle: Duration,
    eraser: bool,
    /// Stroke in progress
    stroke: Option<StrokeSegment>,
    /// Whether the current stroke has moved since `begin`
    moved: bool,
    /// Pointer left the canvas mid-stroke
    paused: bool,
    last_point: Option<Point>,
    /// When the last frame was produced, across strokes
    last_sent: Option<Instant>,
}

impl StrokePipeline {
    pub fn new(width: u32, height: u32, throttle: Duration) -> Self {
        Self {
            surface: Surface::new(width, height),
            throttle,
            eraser: false,
            stroke: None,
            moved: false,
            paused: false,
            last_point: None,
            last_sent: None,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn is_eraser(&self) -> bool {
        self.eraser
    }

    /// Width the next stroke will use
    pub fn stroke_width(&self) -> f32 {
        if self.eraser {
            ERASER_WIDTH
        } else {
            PEN_WIDTH
        }
    }

    /// Open a stroke at `point` (backing coordinates)
    pub fn begin(&mut self, point: Point) {
        self.stroke = Some(StrokeSegment {
            points: vec![point],
            stroke_width: self.stroke_width(),
            is_eraser: self.eraser,
        });
        self.moved = false;
        self.paused = false;
        self.last_point = Some(point);
    }

    /// Continue the stroke to `point`; may yield a throttled frame
    pub fn extend(
        &mut self,
        point: Point,
        now: Instant,
    ) -> Result<Option<OutboundFrame>, CanvasError> {
        if self.paused || self.last_point == Some(point) {
            return Ok(None);
        }
        let (Some(stroke), Some(from)) = (self.stroke.as_mut(), self.last_point) else {
            return Ok(None);
        };

        stroke.points.push(point);
        self.surface
            .stroke_line(from, point, stroke.stroke_width, stroke.color());
        self.moved = true;
        self.last_point = Some(point);

        let due = self
            .last_sent
            .map(|sent| now.saturating_duration_since(sent) >= self.throttle)
            .unwrap_or(true);
        if !due {
            return Ok(None);
        }
        self.frame(FrameKind::Throttled, now).map(Some)
    }

    /// Finish the stroke; a tap leaves a dot. Always one final frame.
    pub fn end(&mut self, now: Instant) -> Result<Option<OutboundFrame>, CanvasError> {
        let Some(stroke) = self.stroke.take() else {
            return Ok(None);
        };
        if !self.moved {
            if let Some(&start) = stroke.points.first() {
                self.surface
                    .fill_circle(start, stroke.stroke_width / 2.0, stroke.color());
            }
        }
        self.moved = false;
        self.paused = false;
        self.last_point = None;
        self.frame(FrameKind::Final, now).map(Some)
    }

    /// Pointer left the canvas; the path breaks until re-entry
    pub fn leave(&mut self) {
        if self.stroke.is_some() {
            self.paused = true;
        }
    }

    /// Pointer re-entered with the button held; continue from `point`
    pub fn reenter(&mut self, point: Point) {
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.points.push(point);
            self.last_point = Some(point);
            self.paused = false;
        }
    }

    /// Encode the current canvas for scoring; does not clear
    pub fn submit(&self) -> Result<String, CanvasError> {
        self.surface.encode_data_url()
    }

    /// Paint the background and return to the pen
    pub fn clear(&mut self) {
        self.surface.clear();
        self.eraser = false;
    }

    /// Switch between pen and eraser; returns whether the eraser is on
    pub fn toggle_eraser(&mut self) -> bool {
        self.eraser = !self.eraser;
        self.eraser
    }

    fn frame(&mut self, kind: FrameKind, now: Instant) -> Result<OutboundFrame, CanvasError> {
        let canvas_data = self.surface.encode_data_url()?;
        self.last_sent = Some(now);
        Ok(OutboundFrame { kind, canvas_data })
    }
}

impl Default for StrokePipeline {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, DEFAULT_THROTTLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster::{BACKGROUND, INK};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_tap_yields_one_final_frame_and_dot() {
        let mut pipeline = StrokePipeline::default();
        let t0 = Instant::now();
        pipeline.begin(Point::new(100.0, 100.0));
        // Pointer jitter without movement
        assert!(pipeline
            .extend(Point::new(100.0, 100.0), t0 + ms(400))
            .unwrap()
            .is_none());
        let frame = pipeline.end(t0 + ms(500)).unwrap().unwrap();

        assert_eq!(frame.kind, FrameKind::Final);
        assert!(frame.canvas_data.starts_with(raster::DATA_URL_PREFIX));
        let surface = pipeline.surface();
        assert_eq!(surface.pixel(100, 100), INK);
        assert_eq!(surface.pixel(103, 100), INK);
        assert_eq!(surface.pixel(105, 100), BACKGROUND);
    }

    #[test]
    fn test_continuous_stroke_throttles() {
        let mut pipeline = StrokePipeline::default();
        let t0 = Instant::now();
        pipeline.begin(Point::new(0.0, 200.0));

        let mut throttled = 0;
        // 1000 ms of movement, one sample every 10 ms
        for step in 1..=100u64 {
            let point = Point::new(step as f32 * 3.0, 200.0);
            if let Some(frame) = pipeline.extend(point, t0 + ms(step * 10)).unwrap() {
                assert_eq!(frame.kind, FrameKind::Throttled);
                throttled += 1;
            }
        }
        // Sent at once, then at 160, 310, ..., 910
        assert_eq!(throttled, 1 + 990 / 150);

        let last = pipeline.end(t0 + ms(1000)).unwrap().unwrap();
        assert_eq!(last.kind, FrameKind::Final);
        assert!(pipeline.end(t0 + ms(1001)).unwrap().is_none());
    }

    #[test]
    fn test_first_move_sends_immediately() {
        let mut pipeline = StrokePipeline::default();
        let t0 = Instant::now();
        pipeline.begin(Point::new(10.0, 10.0));
        let frame = pipeline.extend(Point::new(20.0, 10.0), t0 + ms(10)).unwrap();
        assert_eq!(frame.map(|f| f.kind), Some(FrameKind::Throttled));
    }

    #[test]
    fn test_interval_counts_from_last_frame_across_strokes() {
        let mut pipeline = StrokePipeline::default();
        let t0 = Instant::now();
        pipeline.begin(Point::new(10.0, 10.0));
        pipeline.end(t0).unwrap();

        // New stroke right after the final frame is still held back
        pipeline.begin(Point::new(20.0, 20.0));
        assert!(pipeline
            .extend(Point::new(30.0, 30.0), t0 + ms(100))
            .unwrap()
            .is_none());
        assert!(pipeline
            .extend(Point::new(40.0, 40.0), t0 + ms(150))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_move_after_idle_sends_immediately() {
        let mut pipeline = StrokePipeline::default();
        let t0 = Instant::now();
        pipeline.begin(Point::new(10.0, 10.0));
        pipeline.end(t0).unwrap();

        pipeline.begin(Point::new(20.0, 20.0));
        let frame = pipeline.extend(Point::new(30.0, 30.0), t0 + ms(1010)).unwrap();
        assert!(frame.is_some());
    }

    #[test]
    fn test_leave_breaks_path() {
        let mut pipeline = StrokePipeline::default();
        let t0 = Instant::now();
        pipeline.begin(Point::new(50.0, 50.0));
        pipeline.extend(Point::new(60.0, 50.0), t0 + ms(10)).unwrap();
        pipeline.leave();
        assert!(pipeline
            .extend(Point::new(200.0, 50.0), t0 + ms(20))
            .unwrap()
            .is_none());
        pipeline.reenter(Point::new(300.0, 50.0));
        pipeline.extend(Point::new(310.0, 50.0), t0 + ms(30)).unwrap();
        pipeline.end(t0 + ms(40)).unwrap();

        let surface = pipeline.surface();
        // Nothing between the exit and re-entry points
        assert_eq!(surface.pixel(150, 50), BACKGROUND);
        assert_eq!(surface.pixel(55, 50), INK);
        assert_eq!(surface.pixel(305, 50), INK);
    }

    #[test]
    fn test_eraser_paints_background_wider() {
        let mut pipeline = StrokePipeline::default();
        let t0 = Instant::now();
        pipeline.begin(Point::new(0.0, 100.0));
        pipeline.extend(Point::new(399.0, 100.0), t0 + ms(10)).unwrap();
        pipeline.end(t0 + ms(20)).unwrap();
        assert_eq!(pipeline.surface().pixel(200, 100), INK);

        assert!(pipeline.toggle_eraser());
        assert_eq!(pipeline.stroke_width(), ERASER_WIDTH);
        pipeline.begin(Point::new(200.0, 100.0));
        pipeline.end(t0 + ms(40)).unwrap();

        let surface = pipeline.surface();
        assert_eq!(surface.pixel(200, 100), BACKGROUND);
        assert_eq!(surface.pixel(208, 100), BACKGROUND);
        assert_eq!(surface.pixel(215, 100), INK);
    }

    #[test]
    fn test_clear_resets_canvas_and_eraser() {
        let mut pipeline = StrokePipeline::default();
        let t0 = Instant::now();
        pipeline.begin(Point::new(100.0, 100.0));
        pipeline.end(t0).unwrap();
        pipeline.toggle_eraser();

        pipeline.clear();
        assert!(!pipeline.is_eraser());
        assert_eq!(pipeline.surface().pixel(100, 100), BACKGROUND);
    }

    #[test]
    fn test_submit_does_not_clear() {
        let mut pipeline = StrokePipeline::default();
        let t0 = Instant::now();
        pipeline.begin(Point::new(100.0, 100.0));
        pipeline.end(t0).unwrap();

        let data = pipeline.submit().unwrap();
        assert!(data.starts_with(raster::DATA_URL_PREFIX));
        assert_eq!(pipeline.surface().pixel(100, 100), INK);
    }

    #[test]
    fn test_extend_without_begin_is_ignored() {
        let mut pipeline = StrokePipeline::default();
        let now = Instant::now();
        assert!(pipeline.extend(Point::new(1.0, 1.0), now).unwrap().is_none());
        assert!(pipeline.end(now).unwrap().is_none());
    }
}

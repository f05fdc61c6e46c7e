//! Terminal UI components using ratatui

mod canvas;
mod feedback;
mod terminal;
mod ui;

pub use feedback::{Bell, FeedbackLevel};
pub use terminal::Tui;
pub use ui::{canvas_area, render, Chrome};

use crate::app::{Notification, Prompt, Snapshot, View};
use ratatui::layout::Rect;
use std::io;

/// The terminal view: draws snapshots and keeps the open prompt and the
/// latest notice
pub struct TuiView {
    tui: Tui,
    pub prompt: Option<Prompt>,
    pub sound_on: bool,
    notice: Option<String>,
}

impl TuiView {
    pub fn new(tui: Tui, sound_on: bool) -> Self {
        Self {
            tui,
            prompt: None,
            sound_on,
            notice: None,
        }
    }

    /// Screen rect holding the canvas cells
    pub fn canvas_rect(&self) -> io::Result<Rect> {
        Ok(canvas_area(self.tui.area()?))
    }

    /// Restore the terminal before exiting
    pub fn close(&mut self) -> io::Result<()> {
        self.tui.exit()
    }
}

impl View for TuiView {
    fn render(&mut self, snapshot: &Snapshot<'_>) -> io::Result<()> {
        let chrome = Chrome {
            prompt: self.prompt.as_ref(),
            notice: self.notice.as_deref(),
            sound_on: self.sound_on,
        };
        self.tui.draw(|frame| render(frame, snapshot, &chrome))
    }

    fn notify(&mut self, notification: &Notification) {
        if let Notification::CommandSent { .. } = notification {
            return;
        }
        self.notice = Some(notification.summary());
    }
}

//! Application state and core logic

pub mod clock;
pub mod controls;
pub mod session;

pub use clock::TimeLevel;
pub use controls::{intent_for, Answer, Intent, Prompt, PromptEvent, PromptKind};
pub use session::{
    Cue, Feedback, LogLevel, Notification, Phase, Session, SessionOptions, Snapshot, View,
};

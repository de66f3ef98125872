//! Session memory: tool-call observation, anti-pattern detection and the engine facade

pub mod detector;
pub mod engine;
pub mod observer;
pub mod state;
pub mod tools;

pub use detector::AntiPatternDetector;
pub use engine::{Engine, WatchEvent};
pub use observer::{ObserverError, SessionObserver};
pub use state::SessionState;
pub use tools::{ToolCall, ToolKind};

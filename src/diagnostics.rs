//! Leveled debug diagnostics threaded through the compiler and matcher.
//!
//! Mirrors the teacher library's `util::Log` — a cheap, `cfg(debug_assertions)`-gated
//! leveled logger that production code can ignore entirely in release builds.

use std::fmt::Debug;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Debug verbosity assigned to a grammar element, token class, or matcher run.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

impl<T> Log<T> {
    /// Relative ordering used to decide whether a given message should be printed
    /// at the configured level. Higher orders are more verbose.
    pub fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl<T: Debug> std::fmt::Display for Log<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => write!(f, "None"),
            Log::Default(t) | Log::Success(t) | Log::Result(t) | Log::Verbose(t) => {
                write!(f, "{:?}", t)
            }
        }
    }
}

/// Implemented by grammar elements and matcher components that want uniform,
/// level-gated logging without threading a logger instance through every call.
pub trait Logger {
    fn debug_label(&self) -> Option<Log<&'static str>>;

    #[cfg(debug_assertions)]
    fn log_entry(&self) {
        if let Some(label) = self.debug_label() {
            if label.order() >= Log::Verbose(()).order() {
                println!("[{}] entering", label);
            }
        }
    }

    #[cfg(debug_assertions)]
    fn log_line(&self, msg: std::fmt::Arguments) {
        if let Some(label) = self.debug_label() {
            if label.order() >= Log::Default(()).order() {
                println!("[{}] {}", label, msg);
            }
        }
    }
}

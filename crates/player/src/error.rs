use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::surface::PlayRejection;

/// Result type used by the player crate.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Errors produced by player commands and clip handling.
///
/// None of these are fatal to the host: every variant leaves the player in a
/// paused, inspectable state.
#[derive(Debug)]
pub enum PlayerError {
    AutoplayBlocked {
        reason: PlayRejection,
    },
    DegenerateWindow {
        start_sec: f64,
        end_sec: f64,
    },
    SurfaceUnavailable,
    NoActiveClip,
    ResultIndexOutOfRange {
        index: usize,
        len: usize,
    },
    DocumentIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    DocumentFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for PlayerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoplayBlocked { reason } => {
                write!(f, "media surface declined playback: {reason}")
            }
            Self::DegenerateWindow { start_sec, end_sec } => {
                write!(f, "degenerate clip window: {start_sec}..{end_sec}")
            }
            Self::SurfaceUnavailable => write!(f, "media surface is not attached"),
            Self::NoActiveClip => write!(f, "no clip is mounted"),
            Self::ResultIndexOutOfRange { index, len } => {
                write!(f, "search result {index} out of range (have {len})")
            }
            Self::DocumentIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::DocumentFormat { path, source } => {
                write!(f, "malformed document at {} ({source})", path.display())
            }
        }
    }
}

impl std::error::Error for PlayerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DocumentIo { source, .. } => Some(source),
            Self::DocumentFormat { source, .. } => Some(source),
            _ => None,
        }
    }
}

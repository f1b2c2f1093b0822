use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clip::MIN_CLIP_DURATION_SEC;
use crate::error::{PlayerError, Result};

const DEFAULT_AUTOPLAY_GRACE_MS: u64 = 100;
const DEFAULT_FRAME_INTERVAL_MS: u64 = 50;
const DEFAULT_COMMAND_CAPACITY: usize = 32;
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Tunables of one player instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Settling time granted to a freshly loaded source before autoplay.
    pub autoplay_grace_ms: u64,
    /// Floor for the progress denominator of degenerate windows.
    pub min_clip_duration_sec: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            autoplay_grace_ms: DEFAULT_AUTOPLAY_GRACE_MS,
            min_clip_duration_sec: MIN_CLIP_DURATION_SEC,
        }
    }
}

/// Tunables of the threaded host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostConfig {
    /// Pacing of [`crate::MediaSurface::on_frame`] calls.
    pub frame_interval_ms: u64,
    pub command_capacity: usize,
    pub event_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl HostConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Combined configuration document, as read by the command-line tools.
///
/// Missing keys fall back to defaults, so `{}` is a valid document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub player: PlayerConfig,
    pub host: HostConfig,
}

impl Settings {
    /// Loads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| PlayerError::DocumentIo {
            context: "failed to read settings",
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| PlayerError::DocumentFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    fn partial_document_keeps_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"player": {"autoplayGraceMs": 0}}"#)
            .expect("settings should parse");

        assert_eq!(settings.player.autoplay_grace_ms, 0);
        assert_eq!(settings.player.min_clip_duration_sec, 0.1);
        assert_eq!(settings.host.frame_interval_ms, 50);
    }
}

use serde::Serialize;

use crate::clip::ClipWindow;
use crate::time::format_timecode;

/// Lifecycle state of a mounted player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    /// Seeked to the window start, waiting for autoplay.
    Seeking,
    Playing,
    Paused,
    /// The surface declined the last play request; a new request may retry.
    Blocked,
}

/// Runtime state bound to one clip window.
///
/// A session is never retargeted: loading another clip builds a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub(crate) clip: ClipWindow,
    pub(crate) state: PlaybackState,
    pub(crate) is_muted: bool,
    pub(crate) current_time_sec: f64,
    pub(crate) progress_percent: f64,
    pub(crate) autoplay_requested: bool,
}

impl PlaybackSession {
    pub(crate) fn new(clip: ClipWindow, autoplay: bool, is_muted: bool) -> Self {
        let current_time_sec = clip.start_sec();
        Self {
            clip,
            state: if autoplay {
                PlaybackState::Seeking
            } else {
                PlaybackState::Paused
            },
            is_muted,
            current_time_sec,
            progress_percent: 0.0,
            autoplay_requested: autoplay,
        }
    }

    pub fn clip(&self) -> &ClipWindow {
        &self.clip
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Records one surface clock reading and recomputes progress.
    pub(crate) fn observe(&mut self, surface_time_sec: f64, min_duration_sec: f64) {
        self.current_time_sec = surface_time_sec;
        self.progress_percent = self.clip.progress_percent(surface_time_sec, min_duration_sec);
    }

    pub(crate) fn rewind(&mut self) {
        self.current_time_sec = self.clip.start_sec();
        self.progress_percent = 0.0;
    }

    /// Moves to `state`, returning true when it differs from the current one.
    pub(crate) fn transition(&mut self, state: PlaybackState) -> bool {
        if self.state == state {
            return false;
        }
        self.state = state;
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            clip: self.clip.clone(),
            state: self.state,
            is_playing: self.is_playing(),
            is_muted: self.is_muted,
            current_time_sec: self.current_time_sec,
            progress_percent: self.progress_percent,
            autoplay_requested: self.autoplay_requested,
        }
    }
}

/// Immutable copy of a session for renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub clip: ClipWindow,
    pub state: PlaybackState,
    pub is_playing: bool,
    pub is_muted: bool,
    pub current_time_sec: f64,
    pub progress_percent: f64,
    pub autoplay_requested: bool,
}

impl SessionSnapshot {
    /// Control-bar label: current time over window end.
    ///
    /// # Example
    /// ```
    /// use player::{ClipWindow, Command, Player, SimulatedSurface};
    ///
    /// let mut player = Player::with_surface(SimulatedSurface::new(120.0));
    /// player
    ///     .handle_command(Command::Mount {
    ///         clip: ClipWindow::new(62.0, 75.0, "clip.mp4"),
    ///         autoplay: false,
    ///     })
    ///     .expect("mount");
    ///
    /// let snapshot = player.snapshot().expect("mounted");
    /// assert_eq!(snapshot.timecode_label(), "01:02 / 01:15");
    /// ```
    pub fn timecode_label(&self) -> String {
        format!(
            "{} / {}",
            format_timecode(self.current_time_sec),
            format_timecode(self.clip.end_sec())
        )
    }
}

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::Command;

/// Why a play request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayOrigin {
    /// Delayed play after a mount with autoplay.
    Autoplay,
    /// Explicit host request.
    User,
    /// Restart after a boundary crossing.
    Loop,
}

/// Handle for one asynchronous play request.
///
/// The surface hands it back through [`Command::PlaySettled`] (or
/// [`SurfaceNotification::PlaySettled`]); tickets from an older generation or
/// superseded request are ignored by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTicket {
    pub generation: u64,
    pub request: u64,
    pub origin: PlayOrigin,
}

/// Reason a surface declined to start playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayRejection {
    AutoplayPolicy,
    MissingSource,
    Aborted,
    Other(String),
}

impl Display for PlayRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoplayPolicy => write!(f, "autoplay policy"),
            Self::MissingSource => write!(f, "missing media source"),
            Self::Aborted => write!(f, "play request aborted"),
            Self::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// Outcome of one play request.
pub type PlayOutcome = std::result::Result<(), PlayRejection>;

/// Notification produced by a surface between commands.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceNotification {
    TimeUpdate { surface_time_sec: f64 },
    PlaySettled { ticket: PlayTicket, outcome: PlayOutcome },
}

impl From<SurfaceNotification> for Command {
    fn from(value: SurfaceNotification) -> Self {
        match value {
            SurfaceNotification::TimeUpdate { surface_time_sec } => {
                Command::TimeUpdate { surface_time_sec }
            }
            SurfaceNotification::PlaySettled { ticket, outcome } => {
                Command::PlaySettled { ticket, outcome }
            }
        }
    }
}

/// Playback capability of one media element.
///
/// Every method except [`MediaSurface::play`] completes synchronously.
pub trait MediaSurface {
    /// Moves the playhead; the surface clamps to its own media duration.
    fn seek(&mut self, time_sec: f64);

    /// Requests playback. The outcome is delivered later, tagged with `ticket`.
    fn play(&mut self, ticket: PlayTicket);

    /// Pauses playback. Never fails.
    fn pause(&mut self);

    fn set_muted(&mut self, muted: bool);

    /// Current media clock in seconds.
    fn current_time_sec(&self) -> f64;

    /// Advances surfaces that are paced by the host loop.
    fn on_frame(&mut self, _elapsed: Duration) {}

    /// Returns queued time updates and play settlements, oldest first.
    fn drain_notifications(&mut self) -> Vec<SurfaceNotification> {
        Vec::new()
    }
}

/// How a [`SimulatedSurface`] answers play requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayPolicy {
    #[default]
    Allow,
    Reject(PlayRejection),
    /// Rejects autoplay until one user-initiated play went through.
    RequireInteraction,
}

/// In-process media surface with a virtual clock.
///
/// The clock only moves in [`MediaSurface::on_frame`]; time updates are queued
/// at `update_interval` granularity, the way a browser media element throttles
/// its `timeupdate` notifications.
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use player::{MediaSurface, SimulatedSurface};
///
/// let mut surface = SimulatedSurface::new(60.0);
/// surface.seek(10.0);
/// surface.on_frame(Duration::from_millis(500));
/// assert_eq!(surface.current_time_sec(), 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedSurface {
    duration_sec: f64,
    policy: PlayPolicy,
    update_interval: Duration,
    current_sec: f64,
    playing: bool,
    muted: bool,
    interacted: bool,
    since_update: Duration,
    pending: VecDeque<SurfaceNotification>,
}

const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

impl SimulatedSurface {
    /// Creates a paused surface over media of `duration_sec` seconds.
    pub fn new(duration_sec: f64) -> Self {
        Self {
            duration_sec: duration_sec.max(0.0),
            policy: PlayPolicy::Allow,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            current_sec: 0.0,
            playing: false,
            muted: false,
            interacted: false,
            since_update: Duration::ZERO,
            pending: VecDeque::new(),
        }
    }

    pub fn with_policy(mut self, policy: PlayPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn decide(&mut self, origin: PlayOrigin) -> PlayOutcome {
        match &self.policy {
            PlayPolicy::Allow => Ok(()),
            PlayPolicy::Reject(reason) => Err(reason.clone()),
            PlayPolicy::RequireInteraction => {
                if origin == PlayOrigin::User {
                    self.interacted = true;
                }
                if self.interacted {
                    Ok(())
                } else {
                    Err(PlayRejection::AutoplayPolicy)
                }
            }
        }
    }

    fn queue_time_update(&mut self) {
        self.since_update = Duration::ZERO;
        self.pending.push_back(SurfaceNotification::TimeUpdate {
            surface_time_sec: self.current_sec,
        });
    }
}

impl MediaSurface for SimulatedSurface {
    fn seek(&mut self, time_sec: f64) {
        self.current_sec = time_sec.clamp(0.0, self.duration_sec);
        self.queue_time_update();
    }

    fn play(&mut self, ticket: PlayTicket) {
        let outcome = self.decide(ticket.origin);
        if outcome.is_ok() {
            self.playing = true;
        }
        debug!(?ticket, ?outcome, "simulated surface play");
        self.pending
            .push_back(SurfaceNotification::PlaySettled { ticket, outcome });
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn current_time_sec(&self) -> f64 {
        self.current_sec
    }

    fn on_frame(&mut self, elapsed: Duration) {
        if !self.playing {
            return;
        }

        self.current_sec = (self.current_sec + elapsed.as_secs_f64()).min(self.duration_sec);
        if self.current_sec >= self.duration_sec {
            self.playing = false;
        }

        self.since_update += elapsed;
        if self.since_update >= self.update_interval || !self.playing {
            self.queue_time_update();
        }
    }

    fn drain_notifications(&mut self) -> Vec<SurfaceNotification> {
        self.pending.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{
        MediaSurface, PlayOrigin, PlayPolicy, PlayRejection, PlayTicket, SimulatedSurface,
        SurfaceNotification,
    };

    fn ticket(origin: PlayOrigin) -> PlayTicket {
        PlayTicket {
            generation: 1,
            request: 1,
            origin,
        }
    }

    #[test]
    fn seek_clamps_to_media_duration() {
        let mut surface = SimulatedSurface::new(20.0);
        surface.seek(25.0);
        assert_eq!(surface.current_time_sec(), 20.0);
        surface.seek(-1.0);
        assert_eq!(surface.current_time_sec(), 0.0);
    }

    #[test]
    fn clock_advances_only_while_playing_and_throttles_updates() {
        let mut surface =
            SimulatedSurface::new(60.0).with_update_interval(Duration::from_millis(250));
        surface.seek(10.0);
        let _ = surface.drain_notifications();

        surface.play(ticket(PlayOrigin::User));
        surface.on_frame(Duration::from_millis(100));
        surface.on_frame(Duration::from_millis(100));
        surface.on_frame(Duration::from_millis(100));

        let notifications = surface.drain_notifications();
        assert_eq!(notifications.len(), 2);
        assert!(matches!(
            notifications[0],
            SurfaceNotification::PlaySettled { outcome: Ok(()), .. }
        ));
        let SurfaceNotification::TimeUpdate { surface_time_sec } = notifications[1] else {
            panic!("second notification must be a time update");
        };
        assert!((surface_time_sec - 10.3).abs() < 1e-9);

        surface.pause();
        surface.on_frame(Duration::from_secs(1));
        assert!((surface.current_time_sec() - 10.3).abs() < 1e-9);
    }

    #[test]
    fn require_interaction_rejects_autoplay_until_user_play() {
        let mut surface = SimulatedSurface::new(60.0).with_policy(PlayPolicy::RequireInteraction);

        surface.play(ticket(PlayOrigin::Autoplay));
        assert!(!surface.is_playing());
        surface.play(ticket(PlayOrigin::User));
        assert!(surface.is_playing());
        surface.play(ticket(PlayOrigin::Autoplay));
        assert!(surface.is_playing());

        let outcomes: Vec<_> = surface
            .drain_notifications()
            .into_iter()
            .map(|notification| match notification {
                SurfaceNotification::PlaySettled { outcome, .. } => outcome,
                SurfaceNotification::TimeUpdate { .. } => panic!("no time updates expected"),
            })
            .collect();
        assert_eq!(
            outcomes,
            vec![Err(PlayRejection::AutoplayPolicy), Ok(()), Ok(())]
        );
    }

    #[test]
    fn rejected_play_leaves_running_playback_alone() {
        let mut surface = SimulatedSurface::new(60.0).with_policy(PlayPolicy::RequireInteraction);
        surface.play(ticket(PlayOrigin::User));
        assert!(surface.is_playing());

        let mut surface = surface.with_policy(PlayPolicy::Reject(PlayRejection::Aborted));
        surface.play(ticket(PlayOrigin::Loop));
        assert!(surface.is_playing());

        surface.set_muted(true);
        surface.on_frame(Duration::from_millis(500));
        assert!(surface.is_muted());
        assert!((surface.current_time_sec() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn playback_stops_at_media_end() {
        let mut surface = SimulatedSurface::new(2.0);
        surface.seek(1.5);
        surface.play(ticket(PlayOrigin::User));
        surface.on_frame(Duration::from_secs(1));

        assert!(!surface.is_playing());
        assert_eq!(surface.current_time_sec(), 2.0);
    }
}

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clip::ClipWindow;
use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::session::{PlaybackSession, PlaybackState, SessionSnapshot};
use crate::surface::{MediaSurface, PlayOrigin, PlayOutcome, PlayTicket, SimulatedSurface};

/// Commands accepted by the player.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Binds a clip window, seeks to its start and optionally schedules autoplay.
    ///
    /// Mounting while another clip is loaded behaves like [`Command::ReplaceClip`].
    Mount {
        clip: ClipWindow,
        autoplay: bool,
    },
    /// Swaps in a new clip window, discarding the running session.
    ///
    /// Any autoplay or play request issued for the previous window is
    /// invalidated, so a burst of swaps never plays a stale window.
    ReplaceClip {
        clip: ClipWindow,
        autoplay: bool,
    },
    Play,
    Pause,
    ToggleMute,
    /// One clock reading from the surface's time-update stream.
    TimeUpdate {
        surface_time_sec: f64,
    },
    /// Fired by the host once the autoplay grace period elapsed.
    AutoplayDue {
        token: AutoplayToken,
    },
    /// Resolution of an asynchronous [`MediaSurface::play`] call.
    PlaySettled {
        ticket: PlayTicket,
        outcome: PlayOutcome,
    },
    Unmount,
}

/// Events emitted by the player.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SessionChanged(SessionSnapshot),
    StateChanged {
        state: PlaybackState,
    },
    Progress {
        current_time_sec: f64,
        progress_percent: f64,
    },
    /// The clock crossed the window end and was rewound to its start.
    Looped {
        start_sec: f64,
        resumed: bool,
    },
    /// The host must send [`Command::AutoplayDue`] with `token` after `delay_ms`.
    AutoplayScheduled {
        token: AutoplayToken,
        delay_ms: u64,
    },
    MuteChanged {
        muted: bool,
    },
    Unmounted,
    Error(PlaybackErrorEvent),
}

/// Handle for one scheduled autoplay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoplayToken {
    pub generation: u64,
}

/// Host-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackErrorKind {
    AutoplayBlocked,
    DegenerateWindow,
    SurfaceUnavailable,
    Other,
}

impl From<&PlayerError> for PlaybackErrorKind {
    fn from(value: &PlayerError) -> Self {
        match value {
            PlayerError::AutoplayBlocked { .. } => Self::AutoplayBlocked,
            PlayerError::DegenerateWindow { .. } => Self::DegenerateWindow,
            PlayerError::SurfaceUnavailable => Self::SurfaceUnavailable,
            _ => Self::Other,
        }
    }
}

/// User-facing error payload emitted as an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackErrorEvent {
    pub kind: PlaybackErrorKind,
    pub message: String,
}

impl PlaybackErrorEvent {
    pub fn from_error(error: &PlayerError) -> Self {
        Self {
            kind: PlaybackErrorKind::from(error),
            message: error.to_string(),
        }
    }
}

/// Bounded-clip playback controller over one media surface.
///
/// Turns a clip window into a looping preview: every mount seeks to the window
/// start, every clock reading at or past the window end rewinds to the start,
/// and playback resumes only if it was running when the boundary was crossed.
#[derive(Debug)]
pub struct Player<S> {
    surface: Option<S>,
    config: PlayerConfig,
    session: Option<PlaybackSession>,
    muted: bool,
    generation: u64,
    next_request: u64,
    scheduled_autoplay: Option<AutoplayToken>,
    pending_play: Option<PlayTicket>,
    play_queued: bool,
    /// Set by a boundary rewind until a tick inside the window confirms it.
    rewind_pending: bool,
}

impl Player<SimulatedSurface> {
    /// Creates a player over a simulated surface of `duration_sec` seconds.
    ///
    /// # Example
    /// ```
    /// use player::Player;
    ///
    /// let player = Player::simulated(30.0);
    /// assert!(player.snapshot().is_none());
    /// ```
    pub fn simulated(duration_sec: f64) -> Self {
        Self::with_surface(SimulatedSurface::new(duration_sec))
    }
}

impl<S> Player<S>
where
    S: MediaSurface,
{
    /// Creates a detached player; commands are deferred until [`Player::attach`].
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            surface: None,
            config,
            session: None,
            muted: false,
            generation: 0,
            next_request: 0,
            scheduled_autoplay: None,
            pending_play: None,
            play_queued: false,
            rewind_pending: false,
        }
    }

    /// Creates a player bound to `surface` with default configuration.
    pub fn with_surface(surface: S) -> Self {
        let mut player = Self::new(PlayerConfig::default());
        player.surface = Some(surface);
        player
    }

    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.session.as_ref().map(PlaybackSession::snapshot)
    }

    pub fn state(&self) -> PlaybackState {
        self.session
            .as_ref()
            .map_or(PlaybackState::Idle, PlaybackSession::state)
    }

    /// Autoplay attempt the host still has to fire, if any.
    pub fn scheduled_autoplay(&self) -> Option<AutoplayToken> {
        self.scheduled_autoplay
    }

    /// Play request still waiting for its settlement, if any.
    pub fn pending_play(&self) -> Option<PlayTicket> {
        self.pending_play
    }

    /// Binds a surface and replays a mount that happened while detached.
    pub fn attach(&mut self, surface: S) -> Result<Vec<Event>> {
        self.surface = Some(surface);
        if self.session.is_none() {
            return Ok(Vec::new());
        }
        debug!(generation = self.generation, "applying deferred mount");
        self.bind_session()
    }

    /// Applies one command and returns emitted events.
    pub fn handle_command(&mut self, command: Command) -> Result<Vec<Event>> {
        match command {
            Command::Mount { clip, autoplay } | Command::ReplaceClip { clip, autoplay } => {
                self.load_clip(clip, autoplay)
            }
            Command::Play => self.request_play(),
            Command::Pause => self.request_pause(),
            Command::ToggleMute => self.toggle_mute(),
            Command::TimeUpdate { surface_time_sec } => self.time_update(surface_time_sec),
            Command::AutoplayDue { token } => self.autoplay_due(token),
            Command::PlaySettled { ticket, outcome } => self.play_settled(ticket, outcome),
            Command::Unmount => self.unmount(),
        }
    }

    /// Advances the surface by `elapsed` and reconciles its queued notifications.
    pub fn pump_surface(&mut self, elapsed: std::time::Duration) -> Result<Vec<Event>> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(Vec::new());
        };
        surface.on_frame(elapsed);
        let notifications = surface.drain_notifications();

        let mut events = Vec::new();
        for notification in notifications {
            events.extend(self.handle_command(notification.into())?);
        }
        Ok(events)
    }

    fn load_clip(&mut self, clip: ClipWindow, autoplay: bool) -> Result<Vec<Event>> {
        if let Err(error) = clip.check() {
            debug!(%error, "clamping progress duration");
        }

        self.generation += 1;
        self.scheduled_autoplay = None;
        self.pending_play = None;
        self.rewind_pending = false;
        let autoplay = autoplay || std::mem::take(&mut self.play_queued);

        info!(
            generation = self.generation,
            start_sec = clip.start_sec(),
            end_sec = clip.end_sec(),
            source = clip.source(),
            autoplay,
            "clip mounted"
        );
        let session = PlaybackSession::new(clip, autoplay, self.muted);
        let mut events = vec![Event::SessionChanged(session.snapshot())];
        self.session = Some(session);

        if self.surface.is_some() {
            events.extend(self.bind_session()?);
        } else {
            debug!(error = %PlayerError::SurfaceUnavailable, "mount deferred");
        }
        Ok(events)
    }

    fn bind_session(&mut self) -> Result<Vec<Event>> {
        let session = self.session.as_ref().ok_or(PlayerError::NoActiveClip)?;
        let surface = self.surface.as_mut().ok_or(PlayerError::SurfaceUnavailable)?;

        surface.pause();
        surface.set_muted(self.muted);
        surface.seek(session.clip.start_sec());

        if !session.autoplay_requested {
            return Ok(Vec::new());
        }
        let token = AutoplayToken {
            generation: self.generation,
        };
        self.scheduled_autoplay = Some(token);
        Ok(vec![Event::AutoplayScheduled {
            token,
            delay_ms: self.config.autoplay_grace_ms,
        }])
    }

    fn request_play(&mut self) -> Result<Vec<Event>> {
        let Some(session) = self.session.as_mut() else {
            debug!("play queued until a clip is mounted");
            self.play_queued = true;
            return Ok(Vec::new());
        };

        if self.surface.is_none() {
            debug!(error = %PlayerError::SurfaceUnavailable, "play deferred to attach");
            session.autoplay_requested = true;
            return Ok(state_event(session, PlaybackState::Seeking));
        }

        self.scheduled_autoplay = None;
        self.start_playback(PlayOrigin::User)
    }

    fn start_playback(&mut self, origin: PlayOrigin) -> Result<Vec<Event>> {
        let session = self.session.as_mut().ok_or(PlayerError::NoActiveClip)?;
        let surface = self.surface.as_mut().ok_or(PlayerError::SurfaceUnavailable)?;

        if session.is_playing() || self.pending_play.is_some() {
            debug!(?origin, state = ?session.state, "play already in effect");
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        let surface_time_sec = surface.current_time_sec();
        if !session.clip.contains(surface_time_sec) {
            debug!(
                surface_time_sec,
                start_sec = session.clip.start_sec(),
                "surface outside window, reseeking before play"
            );
            surface.seek(session.clip.start_sec());
            session.rewind();
            events.push(progress_event(session));
        }

        self.next_request += 1;
        let ticket = PlayTicket {
            generation: self.generation,
            request: self.next_request,
            origin,
        };
        self.pending_play = Some(ticket);
        surface.play(ticket);
        Ok(events)
    }

    fn request_pause(&mut self) -> Result<Vec<Event>> {
        self.scheduled_autoplay = None;
        self.pending_play = None;
        self.play_queued = false;

        match self.surface.as_mut() {
            Some(surface) => surface.pause(),
            None => debug!(error = %PlayerError::SurfaceUnavailable, "pause is a no-op"),
        }

        let Some(session) = self.session.as_mut() else {
            return Ok(Vec::new());
        };
        session.autoplay_requested = false;
        Ok(state_event(session, PlaybackState::Paused))
    }

    fn toggle_mute(&mut self) -> Result<Vec<Event>> {
        self.muted = !self.muted;
        if let Some(surface) = self.surface.as_mut() {
            surface.set_muted(self.muted);
        }
        if let Some(session) = self.session.as_mut() {
            session.is_muted = self.muted;
        }
        Ok(vec![Event::MuteChanged { muted: self.muted }])
    }

    fn time_update(&mut self, surface_time_sec: f64) -> Result<Vec<Event>> {
        if !surface_time_sec.is_finite() {
            debug!(surface_time_sec, "ignoring non-finite time update");
            return Ok(Vec::new());
        }
        let (Some(session), Some(surface)) = (self.session.as_mut(), self.surface.as_mut()) else {
            debug!(surface_time_sec, "time update without a bound session");
            return Ok(Vec::new());
        };

        session.observe(surface_time_sec, self.config.min_clip_duration_sec);
        let end_sec = session.clip.end_sec();
        if surface_time_sec < end_sec {
            self.rewind_pending = false;
            return Ok(vec![progress_event(session)]);
        }

        let start_sec = session.clip.start_sec();
        session.rewind();
        let mut events = vec![progress_event(session)];

        // Ticks queued before the last rewind landed; the surface is already
        // heading back to the start.
        if self.rewind_pending {
            debug!(surface_time_sec, "stale tick past window end");
            return Ok(events);
        }

        surface.pause();
        surface.seek(start_sec);
        // A degenerate window never yields an in-window tick to confirm the rewind.
        self.rewind_pending = !session.clip.is_degenerate();

        let origin = session.is_playing().then_some(PlayOrigin::Loop);
        if origin.is_none() && self.pending_play.take().is_some() {
            debug!(surface_time_sec, "dropping play request cut off by the boundary");
            events.extend(state_event(session, PlaybackState::Paused));
        }
        info!(
            surface_time_sec,
            start_sec,
            end_sec,
            resumed = origin.is_some(),
            "clip looped"
        );
        events.push(Event::Looped {
            start_sec,
            resumed: origin.is_some(),
        });

        if let Some(origin) = origin {
            self.next_request += 1;
            let ticket = PlayTicket {
                generation: self.generation,
                request: self.next_request,
                origin,
            };
            self.pending_play = Some(ticket);
            surface.play(ticket);
        }
        Ok(events)
    }

    fn autoplay_due(&mut self, token: AutoplayToken) -> Result<Vec<Event>> {
        if self.scheduled_autoplay != Some(token) {
            debug!(
                token_generation = token.generation,
                generation = self.generation,
                "ignoring stale autoplay"
            );
            return Ok(Vec::new());
        }
        self.scheduled_autoplay = None;
        self.start_playback(PlayOrigin::Autoplay)
    }

    fn play_settled(&mut self, ticket: PlayTicket, outcome: PlayOutcome) -> Result<Vec<Event>> {
        if self.pending_play != Some(ticket) {
            debug!(?ticket, ?outcome, "ignoring stale play settlement");
            return Ok(Vec::new());
        }
        self.pending_play = None;
        let session = self.session.as_mut().ok_or(PlayerError::NoActiveClip)?;

        match outcome {
            Ok(()) => {
                debug!(?ticket, "play accepted");
                Ok(state_event(session, PlaybackState::Playing))
            }
            Err(reason) => {
                warn!(?ticket, %reason, "play rejected by surface");
                let mut events = state_event(session, PlaybackState::Blocked);
                events.push(Event::Error(PlaybackErrorEvent::from_error(
                    &PlayerError::AutoplayBlocked { reason },
                )));
                Ok(events)
            }
        }
    }

    fn unmount(&mut self) -> Result<Vec<Event>> {
        self.generation += 1;
        self.scheduled_autoplay = None;
        self.pending_play = None;
        self.play_queued = false;
        self.rewind_pending = false;

        if let Some(surface) = self.surface.as_mut() {
            surface.pause();
        }
        let Some(session) = self.session.take() else {
            return Ok(Vec::new());
        };
        info!(source = session.clip.source(), "clip unmounted");
        Ok(vec![Event::Unmounted])
    }
}

fn state_event(session: &mut PlaybackSession, state: PlaybackState) -> Vec<Event> {
    if session.transition(state) {
        vec![Event::StateChanged { state }]
    } else {
        Vec::new()
    }
}

fn progress_event(session: &PlaybackSession) -> Event {
    Event::Progress {
        current_time_sec: session.current_time_sec,
        progress_percent: session.progress_percent,
    }
}

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::api::{AutoplayToken, Command, Event, PlaybackErrorEvent, Player};
use crate::config::HostConfig;
use crate::error::Result;
use crate::surface::MediaSurface;

/// Sender used by the host view to dispatch commands to the player thread.
pub type PlayerCommandSender = mpsc::SyncSender<Command>;

/// Receiver used by the host view to read events emitted by the player thread.
pub type PlayerEventReceiver = mpsc::Receiver<Event>;

/// Spawns the event loop that owns `player` and its surface.
///
/// Every command, autoplay timer and surface notification is handled on the
/// one spawned thread, so reconciliation steps never overlap. The loop exits
/// when the command sender is dropped or the event receiver goes away.
pub fn spawn_player_host<S>(
    mut player: Player<S>,
    config: HostConfig,
) -> (PlayerCommandSender, PlayerEventReceiver)
where
    S: MediaSurface + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::sync_channel::<Command>(config.command_capacity);
    let (event_tx, event_rx) = mpsc::sync_channel::<Event>(config.event_capacity);

    thread::spawn(move || {
        let frame_interval = config.frame_interval();
        let mut timers = AutoplayTimers::default();
        let mut last_frame = Instant::now();

        loop {
            let next_frame = last_frame + frame_interval;
            let deadline = timers
                .next_deadline()
                .map_or(next_frame, |due| due.min(next_frame));
            let wait = deadline.saturating_duration_since(Instant::now());

            let result = match command_rx.recv_timeout(wait) {
                Ok(command) => player.handle_command(command),
                Err(RecvTimeoutError::Timeout) => Ok(Vec::new()),
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("command channel closed, stopping player host");
                    return;
                }
            };
            if !forward(&event_tx, &mut timers, result) {
                return;
            }

            let now = Instant::now();
            for token in timers.take_due(now) {
                let result = player.handle_command(Command::AutoplayDue { token });
                if !forward(&event_tx, &mut timers, result) {
                    return;
                }
            }

            if now >= next_frame {
                let elapsed = now.duration_since(last_frame);
                last_frame = now;
                let result = player.pump_surface(elapsed);
                if !forward(&event_tx, &mut timers, result) {
                    return;
                }
            }
        }
    });

    (command_tx, event_rx)
}

/// Sends events to the host and arms timers for scheduled autoplay.
///
/// Returns false once the host stopped listening.
fn forward(
    event_tx: &mpsc::SyncSender<Event>,
    timers: &mut AutoplayTimers,
    result: Result<Vec<Event>>,
) -> bool {
    let events = match result {
        Ok(events) => events,
        Err(error) => vec![Event::Error(PlaybackErrorEvent::from_error(&error))],
    };

    for event in events {
        if let Event::AutoplayScheduled { token, delay_ms } = &event {
            timers.arm(*token, Duration::from_millis(*delay_ms));
        }
        if event_tx.send(event).is_err() {
            return false;
        }
    }
    true
}

#[derive(Debug, Default)]
struct AutoplayTimers {
    armed: Vec<(Instant, AutoplayToken)>,
}

impl AutoplayTimers {
    fn arm(&mut self, token: AutoplayToken, delay: Duration) {
        self.armed.push((Instant::now() + delay, token));
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.armed.iter().map(|(due, _)| *due).min()
    }

    fn take_due(&mut self, now: Instant) -> Vec<AutoplayToken> {
        let mut due = Vec::new();
        self.armed.retain(|(at, token)| {
            if *at <= now {
                due.push(*token);
                false
            } else {
                true
            }
        });
        due
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{PlayerEventReceiver, spawn_player_host};
    use crate::api::{Command, Event, PlaybackErrorKind, Player};
    use crate::clip::ClipWindow;
    use crate::config::{HostConfig, PlayerConfig};
    use crate::session::PlaybackState;
    use crate::surface::{PlayPolicy, PlayRejection, SimulatedSurface};

    fn host_config() -> HostConfig {
        HostConfig {
            frame_interval_ms: 5,
            ..HostConfig::default()
        }
    }

    fn player_config() -> PlayerConfig {
        PlayerConfig {
            autoplay_grace_ms: 20,
            ..PlayerConfig::default()
        }
    }

    fn wait_for(
        event_rx: &PlayerEventReceiver,
        timeout: Duration,
        mut predicate: impl FnMut(&Event) -> bool,
    ) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match event_rx.recv_timeout(remaining) {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    #[test]
    fn host_fires_autoplay_after_grace_period() {
        let player =
            Player::with_surface(SimulatedSurface::new(60.0)).with_config(player_config());
        let (command_tx, event_rx) = spawn_player_host(player, host_config());

        command_tx
            .send(Command::Mount {
                clip: ClipWindow::new(10.0, 15.0, "demo.mp4"),
                autoplay: true,
            })
            .expect("send mount command");

        let playing = wait_for(&event_rx, Duration::from_secs(2), |event| {
            matches!(
                event,
                Event::StateChanged {
                    state: PlaybackState::Playing
                }
            )
        });
        assert!(playing.is_some(), "autoplay must start playback");
    }

    #[test]
    fn host_loops_clip_when_clock_reaches_window_end() {
        let surface = SimulatedSurface::new(60.0).with_update_interval(Duration::from_millis(5));
        let player = Player::with_surface(surface).with_config(player_config());
        let (command_tx, event_rx) = spawn_player_host(player, host_config());

        command_tx
            .send(Command::Mount {
                clip: ClipWindow::new(1.0, 1.1, "demo.mp4"),
                autoplay: true,
            })
            .expect("send mount command");

        let looped = wait_for(&event_rx, Duration::from_secs(3), |event| {
            matches!(event, Event::Looped { resumed: true, .. })
        });
        assert_eq!(
            looped,
            Some(Event::Looped {
                start_sec: 1.0,
                resumed: true
            })
        );
    }

    #[test]
    fn host_reports_blocked_autoplay_as_event() {
        let surface =
            SimulatedSurface::new(60.0).with_policy(PlayPolicy::Reject(PlayRejection::AutoplayPolicy));
        let player = Player::with_surface(surface).with_config(player_config());
        let (command_tx, event_rx) = spawn_player_host(player, host_config());

        command_tx
            .send(Command::Mount {
                clip: ClipWindow::new(0.0, 5.0, "demo.mp4"),
                autoplay: true,
            })
            .expect("send mount command");

        let error = wait_for(&event_rx, Duration::from_secs(2), |event| {
            matches!(event, Event::Error(_))
        });
        let Some(Event::Error(error)) = error else {
            panic!("expected an error event");
        };
        assert_eq!(error.kind, PlaybackErrorKind::AutoplayBlocked);
    }

    #[test]
    fn host_drops_autoplay_of_replaced_clip() {
        let player = Player::with_surface(SimulatedSurface::new(60.0)).with_config(PlayerConfig {
            autoplay_grace_ms: 50,
            ..PlayerConfig::default()
        });
        let (command_tx, event_rx) = spawn_player_host(player, host_config());

        command_tx
            .send(Command::Mount {
                clip: ClipWindow::new(0.0, 5.0, "first.mp4"),
                autoplay: true,
            })
            .expect("send mount command");
        command_tx
            .send(Command::ReplaceClip {
                clip: ClipWindow::new(20.0, 25.0, "second.mp4"),
                autoplay: false,
            })
            .expect("send replace command");

        let playing = wait_for(&event_rx, Duration::from_millis(300), |event| {
            matches!(
                event,
                Event::StateChanged {
                    state: PlaybackState::Playing
                }
            )
        });
        assert!(playing.is_none(), "stale autoplay must not fire");
    }

    #[test]
    fn host_stops_when_command_sender_is_dropped() {
        let player = Player::with_surface(SimulatedSurface::new(10.0));
        let (command_tx, event_rx) = spawn_player_host(player, host_config());

        drop(command_tx);

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match event_rx.recv_timeout(Duration::from_millis(50)) {
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                _ if Instant::now() > deadline => panic!("host thread did not stop"),
                _ => continue,
            }
        }
    }
}

use std::io::Write;
use std::path::Path;

use player::{
    ClipWindow, Command, Event, MediaSurface, PlayRejection, PlayTicket, Player, PlayerConfig,
    PlayerError, SessionSnapshot,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CliError;

/// Scripted player session.
///
/// ```json
/// {
///   "clip": {"startSec": 10, "endSec": 15, "source": "clip.mp4"},
///   "autoPlay": true,
///   "steps": ["autoplayDue", {"settle": "ok"}, {"tick": 15.02}, {"tick": 12}]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub clip: ClipWindow,
    #[serde(default)]
    pub auto_play: bool,
    pub steps: Vec<Step>,
}

/// One scripted action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    /// Moves the surface clock and delivers a time update.
    Tick(f64),
    /// Moves the surface clock silently.
    Clock(f64),
    Play,
    Pause,
    Mute,
    /// Fires the currently scheduled autoplay, if any.
    AutoplayDue,
    /// Resolves the most recent play request.
    Settle(Settlement),
    Replace {
        clip: ClipWindow,
        #[serde(default, rename = "autoPlay")]
        auto_play: bool,
    },
    Unmount,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Settlement {
    Ok,
    Reject(PlayRejection),
}

/// Reads a scenario document.
pub fn load_scenario(path: &Path) -> Result<Scenario, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PlayerError::DocumentIo {
        context: "failed to read scenario",
        path: path.to_path_buf(),
        source,
    })?;
    let scenario: Scenario =
        serde_json::from_str(&raw).map_err(|source| PlayerError::DocumentFormat {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(scenario)
}

/// Runs `scenario` step by step, writing every event as one JSON line.
///
/// Returns the session as it stands after the last step.
pub fn run_replay(
    scenario: Scenario,
    config: PlayerConfig,
    out: &mut impl Write,
) -> Result<Option<SessionSnapshot>, CliError> {
    let mut player = Player::with_surface(ReplaySurface::default()).with_config(config);

    let events = player.handle_command(Command::Mount {
        clip: scenario.clip,
        autoplay: scenario.auto_play,
    })?;
    write_events(out, &events)?;

    for (index, step) in scenario.steps.into_iter().enumerate() {
        debug!(index, ?step, "replay step");
        let Some(command) = step_command(&mut player, step) else {
            continue;
        };
        let events = player.handle_command(command)?;
        write_events(out, &events)?;
    }

    Ok(player.snapshot())
}

fn step_command(player: &mut Player<ReplaySurface>, step: Step) -> Option<Command> {
    match step {
        Step::Tick(t) => {
            set_clock(player, t);
            Some(Command::TimeUpdate {
                surface_time_sec: t,
            })
        }
        Step::Clock(t) => {
            set_clock(player, t);
            None
        }
        Step::Play => Some(Command::Play),
        Step::Pause => Some(Command::Pause),
        Step::Mute => Some(Command::ToggleMute),
        Step::AutoplayDue => {
            let token = player.scheduled_autoplay();
            if token.is_none() {
                warn!("autoplayDue step without a scheduled autoplay");
            }
            token.map(|token| Command::AutoplayDue { token })
        }
        Step::Settle(settlement) => {
            let ticket = player
                .surface_mut()
                .and_then(|surface| surface.requested.take());
            let Some(ticket) = ticket else {
                warn!("settle step without an outstanding play request");
                return None;
            };
            let outcome = match settlement {
                Settlement::Ok => Ok(()),
                Settlement::Reject(reason) => Err(reason),
            };
            Some(Command::PlaySettled { ticket, outcome })
        }
        Step::Replace { clip, auto_play } => Some(Command::ReplaceClip {
            clip,
            autoplay: auto_play,
        }),
        Step::Unmount => Some(Command::Unmount),
    }
}

fn set_clock(player: &mut Player<ReplaySurface>, t: f64) {
    if let Some(surface) = player.surface_mut() {
        surface.clock_sec = t;
    }
}

fn write_events(out: &mut impl Write, events: &[Event]) -> Result<(), CliError> {
    for event in events {
        serde_json::to_writer(&mut *out, event)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Surface whose clock and play resolutions come from the script.
#[derive(Debug, Default)]
struct ReplaySurface {
    clock_sec: f64,
    requested: Option<PlayTicket>,
}

impl MediaSurface for ReplaySurface {
    fn seek(&mut self, time_sec: f64) {
        debug!(time_sec, "surface seek");
        self.clock_sec = time_sec.max(0.0);
    }

    fn play(&mut self, ticket: PlayTicket) {
        debug!(?ticket, "surface play");
        self.requested = Some(ticket);
    }

    fn pause(&mut self) {
        debug!("surface pause");
    }

    fn set_muted(&mut self, muted: bool) {
        debug!(muted, "surface mute");
    }

    fn current_time_sec(&self) -> f64 {
        self.clock_sec
    }
}

#[cfg(test)]
mod tests {
    use player::{PlaybackState, PlayerConfig};

    use super::{Scenario, run_replay};

    #[test]
    fn replay_loops_autoplayed_clip_and_reports_progress() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "clip": {"startSec": 10, "endSec": 15, "source": "clip.mp4"},
                "autoPlay": true,
                "steps": ["autoplayDue", {"settle": "ok"}, {"tick": 15.02}, {"settle": "ok"}, {"tick": 12}]
            }"#,
        )
        .expect("scenario should parse");

        let mut out = Vec::new();
        let snapshot = run_replay(scenario, PlayerConfig::default(), &mut out)
            .expect("replay should succeed")
            .expect("clip stays mounted");

        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert!((snapshot.progress_percent - 40.0).abs() < 1e-9);

        let output = String::from_utf8(out).expect("utf-8 output");
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line is json"))
            .collect();
        assert_eq!(lines[0]["event"], "session_changed");
        assert!(
            lines
                .iter()
                .any(|line| line["event"] == "looped" && line["resumed"] == true)
        );
    }

    #[test]
    fn replay_reports_blocked_play() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "clip": {"startSec": 0, "endSec": 3, "source": "clip.mp4"},
                "steps": [{"clock": 3.5}, "play", {"settle": {"reject": "autoplay_policy"}}]
            }"#,
        )
        .expect("scenario should parse");

        let mut out = Vec::new();
        let snapshot = run_replay(scenario, PlayerConfig::default(), &mut out)
            .expect("replay should succeed")
            .expect("clip stays mounted");

        assert_eq!(snapshot.state, PlaybackState::Blocked);
        assert_eq!(snapshot.current_time_sec, 0.0);
        let output = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(output.matches("autoplay_blocked").count(), 1);
    }

    #[test]
    fn replay_skips_settle_without_request() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "clip": {"startSec": 0, "endSec": 3, "source": "clip.mp4"},
                "steps": [{"settle": "ok"}, "mute", "unmount"]
            }"#,
        )
        .expect("scenario should parse");

        let mut out = Vec::new();
        let snapshot =
            run_replay(scenario, PlayerConfig::default(), &mut out).expect("replay should succeed");

        assert!(snapshot.is_none());
        let output = String::from_utf8(out).expect("utf-8 output");
        assert!(output.contains("mute_changed"));
        assert!(output.contains("unmounted"));
    }
}

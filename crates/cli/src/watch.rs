use std::io::Write;
use std::path::Path;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use player::{
    ClipWindow, Command, PlayPolicy, Player, PlayerError, SearchResponse, Settings,
    SimulatedSurface, spawn_player_host,
};
use tracing::info;

use crate::error::CliError;

/// Media tail kept after the window end so the surface clock can overshoot it.
const MEDIA_TAIL_SEC: f64 = 30.0;

/// Options of a live simulated preview.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub clip: ClipWindow,
    pub run_for: Duration,
    pub autoplay: bool,
    pub policy: PlayPolicy,
    pub settings: Settings,
}

/// Loads a clip window, or the `index`-th hit of a search response.
pub fn load_clip(path: &Path, index: Option<usize>) -> Result<ClipWindow, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PlayerError::DocumentIo {
        context: "failed to read clip",
        path: path.to_path_buf(),
        source,
    })?;
    let format_error = |source| PlayerError::DocumentFormat {
        path: path.to_path_buf(),
        source,
    };

    let clip = match index {
        Some(index) => serde_json::from_str::<SearchResponse>(&raw)
            .map_err(format_error)?
            .clip_window(index)?,
        None => serde_json::from_str::<ClipWindow>(&raw).map_err(format_error)?,
    };
    Ok(clip)
}

/// Plays `options.clip` on a simulated surface in real time, writing every
/// event as one JSON line until `options.run_for` elapsed.
pub fn run_watch(options: WatchOptions, out: &mut impl Write) -> Result<(), CliError> {
    let media_duration_sec = options.clip.end_sec().max(options.clip.start_sec()) + MEDIA_TAIL_SEC;
    let surface = SimulatedSurface::new(media_duration_sec).with_policy(options.policy);
    let player = Player::with_surface(surface).with_config(options.settings.player);
    let (command_tx, event_rx) = spawn_player_host(player, options.settings.host);

    info!(
        source = options.clip.source(),
        start_sec = options.clip.start_sec(),
        end_sec = options.clip.end_sec(),
        "watching clip"
    );
    command_tx
        .send(Command::Mount {
            clip: options.clip,
            autoplay: options.autoplay,
        })
        .map_err(|_| CliError::HostStopped)?;

    let deadline = Instant::now() + options.run_for;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match event_rx.recv_timeout(remaining) {
            Ok(event) => {
                serde_json::to_writer(&mut *out, &event)?;
                writeln!(out)?;
            }
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => return Err(CliError::HostStopped),
        }
    }

    command_tx
        .send(Command::Unmount)
        .map_err(|_| CliError::HostStopped)?;
    out.flush()?;
    Ok(())
}

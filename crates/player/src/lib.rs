//! UI-agnostic bounded-clip preview player for search hits.

pub mod api;
pub mod clip;
pub mod config;
pub mod error;
pub mod host;
pub mod session;
pub mod surface;
pub mod time;

pub use api::{
    AutoplayToken, Command, Event, PlaybackErrorEvent, PlaybackErrorKind, Player,
};
pub use clip::{ClipWindow, MIN_CLIP_DURATION_SEC, MatchType, SearchResponse, SearchResultClip};
pub use config::{HostConfig, PlayerConfig, Settings};
pub use error::{PlayerError, Result};
pub use host::{PlayerCommandSender, PlayerEventReceiver, spawn_player_host};
pub use session::{PlaybackSession, PlaybackState, SessionSnapshot};
pub use surface::{
    MediaSurface, PlayOrigin, PlayOutcome, PlayPolicy, PlayRejection, PlayTicket,
    SimulatedSurface, SurfaceNotification,
};
pub use time::format_timecode;

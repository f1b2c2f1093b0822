use std::fmt::{Display, Formatter};

use player::PlayerError;

/// Errors surfaced by the command-line front end.
#[derive(Debug)]
pub enum CliError {
    Args(pico_args::Error),
    Usage(&'static str),
    UnexpectedArguments(Vec<String>),
    InvalidSeconds(f64),
    Player(PlayerError),
    Output(std::io::Error),
    Encode(serde_json::Error),
    HostStopped,
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Args(err) => write!(f, "invalid arguments: {err}"),
            Self::Usage(usage) => write!(f, "{usage}"),
            Self::UnexpectedArguments(rest) => {
                write!(f, "unexpected arguments: {}", rest.join(" "))
            }
            Self::InvalidSeconds(seconds) => {
                write!(f, "--seconds must be a finite duration, got {seconds}")
            }
            Self::Player(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to write output: {err}"),
            Self::Encode(err) => write!(f, "failed to encode event: {err}"),
            Self::HostStopped => write!(f, "player host stopped unexpectedly"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Args(err) => Some(err),
            Self::Player(err) => Some(err),
            Self::Output(err) => Some(err),
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<pico_args::Error> for CliError {
    fn from(value: pico_args::Error) -> Self {
        Self::Args(value)
    }
}

impl From<PlayerError> for CliError {
    fn from(value: PlayerError) -> Self {
        Self::Player(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Output(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

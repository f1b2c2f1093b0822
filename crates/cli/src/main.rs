mod error;
mod replay;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use player::{PlayPolicy, PlayRejection, Settings};

use crate::error::CliError;
use crate::watch::WatchOptions;

const USAGE: &str = "\
usage:
  clip-preview replay <scenario.json> [--config <settings.json>]
  clip-preview watch <clip.json> [--index <n>] [--seconds <s>] [--paused]
                     [--require-interaction | --reject] [--config <settings.json>]
";

const DEFAULT_WATCH_SECONDS: f64 = 10.0;

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), CliError> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{USAGE}");
        return Ok(());
    }

    let subcommand = args.subcommand()?;
    let settings = match args.opt_value_from_str::<_, PathBuf>("--config")? {
        Some(path) => Settings::load(&path)?,
        None => Settings::default(),
    };

    match subcommand.as_deref() {
        Some("replay") => {
            let path: PathBuf = args.free_from_str()?;
            finish(args)?;

            let scenario = replay::load_scenario(&path)?;
            let mut stdout = std::io::stdout().lock();
            replay::run_replay(scenario, settings.player, &mut stdout)?;
            Ok(())
        }
        Some("watch") => {
            let index: Option<usize> = args.opt_value_from_str("--index")?;
            let seconds: f64 = args
                .opt_value_from_str("--seconds")?
                .unwrap_or(DEFAULT_WATCH_SECONDS);
            let paused = args.contains("--paused");
            let policy = if args.contains("--reject") {
                PlayPolicy::Reject(PlayRejection::AutoplayPolicy)
            } else if args.contains("--require-interaction") {
                PlayPolicy::RequireInteraction
            } else {
                PlayPolicy::Allow
            };
            let path: PathBuf = args.free_from_str()?;
            finish(args)?;

            let options = WatchOptions {
                clip: watch::load_clip(&path, index)?,
                run_for: watch_duration(seconds)?,
                autoplay: !paused,
                policy,
                settings,
            };
            let mut stdout = std::io::stdout().lock();
            watch::run_watch(options, &mut stdout)
        }
        _ => Err(CliError::Usage(USAGE)),
    }
}

fn watch_duration(seconds: f64) -> Result<Duration, CliError> {
    Duration::try_from_secs_f64(seconds.max(0.0)).map_err(|_| CliError::InvalidSeconds(seconds))
}

fn finish(args: pico_args::Arguments) -> Result<(), CliError> {
    let rest = args.finish();
    if rest.is_empty() {
        return Ok(());
    }
    Err(CliError::UnexpectedArguments(
        rest.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect(),
    ))
}

use std::{fmt, sync::Arc};

use anyhow::{Context, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use forecast_core::{
    Config, ForecastPolicy, LocationSource, Session, SessionOptions, TemperatureUnit, UiState,
    config::MAX_DAYS, provider_from_config, render, resolver_from_config,
};
use inquire::{Confirm, CustomType, InquireError, Password, Select};
use tracing::{debug, info};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Local weather and a short forecast")]
pub struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the Weatherbit API key and display preferences.
    Configure,

    /// Show current conditions and the forecast for your location.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Latitude; use together with --lon to skip location lookup.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude; use together with --lat.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Number of forecast days to display.
    #[arg(long)]
    pub days: Option<usize>,

    /// Only list days after today.
    #[arg(long)]
    pub future_only: bool,

    /// Start in Fahrenheit.
    #[arg(long)]
    pub fahrenheit: bool,

    /// Render once and exit instead of offering refresh.
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Refresh,
    Retry,
    ToggleUnit,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Refresh => "Refresh",
            Action::Retry => "Retry",
            Action::ToggleUnit => "Toggle °C/°F",
            Action::Quit => "Quit",
        };
        f.write_str(label)
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show(args) => show(args).await,
        }
    }
}

impl ShowArgs {
    fn apply(&self, config: &mut Config) {
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            config.location.source = LocationSource::Fixed;
            config.location.latitude = Some(lat);
            config.location.longitude = Some(lon);
        }
        if let Some(days) = self.days {
            config.display.num_of_days = days;
        }
        if self.future_only {
            config.display.forecast_policy = ForecastPolicy::FutureOnly;
        }
        if self.fahrenheit {
            config.display.unit = TemperatureUnit::Fahrenheit;
        }
    }
}

async fn show(args: ShowArgs) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    args.apply(&mut config);
    config.validate()?;

    // Missing credentials stop here, before any request is made.
    let provider = provider_from_config(&config)?;

    if config.location.source == LocationSource::Ip
        && config.location.consent.is_none()
        && !args.once
    {
        ask_location_consent(&mut config)?;
    }

    let resolver = resolver_from_config(&config.location);
    let session = Session::new(
        Arc::from(resolver),
        Arc::from(provider),
        SessionOptions::from(&config.display),
    );

    print_state(&session, &session.state());
    let mut state = session.mount().await;
    print_state(&session, &state);

    if args.once {
        if let Some(message) = state.error_message() {
            bail!("{message}");
        }
        return Ok(());
    }

    loop {
        match prompt_action(&state)? {
            Action::Refresh | Action::Retry => {
                print_state(&session, &UiState::Loading);
                state = session.refresh().await;
                print_state(&session, &state);
            }
            Action::ToggleUnit => {
                let unit = session.toggle_unit();
                debug!(?unit, "display unit toggled");
                print_state(&session, &state);
            }
            Action::Quit => return Ok(()),
        }
    }
}

fn print_state(session: &Session, state: &UiState) {
    println!();
    for line in render(state, session.unit(), &chrono::Local) {
        println!("{line}");
    }
}

fn actions_for(state: &UiState) -> Vec<Action> {
    match state {
        UiState::Error(_) => vec![Action::Retry, Action::Quit],
        _ => vec![Action::Refresh, Action::ToggleUnit, Action::Quit],
    }
}

fn prompt_action(state: &UiState) -> anyhow::Result<Action> {
    match Select::new("What next?", actions_for(state)).prompt() {
        Ok(action) => Ok(action),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            Ok(Action::Quit)
        }
        Err(e) => Err(e).context("Failed to read selection"),
    }
}

fn ask_location_consent(config: &mut Config) -> anyhow::Result<()> {
    let allowed = Confirm::new("Allow looking up your approximate location from your IP address?")
        .with_default(true)
        .with_help_message("Your answer is remembered; change it with `forecast configure`.")
        .prompt()
        .context("Failed to read location permission")?;

    config.location.consent = Some(allowed);
    remember_consent(allowed)?;
    info!(allowed, "location permission recorded");
    Ok(())
}

/// Persist only the consent answer; CLI overrides must not leak into the file.
fn remember_consent(allowed: bool) -> anyhow::Result<()> {
    let mut stored = Config::load()?;
    stored.location.consent = Some(allowed);
    stored.save()
}

const SOURCE_IP: &str = "IP address lookup";
const SOURCE_FIXED: &str = "Fixed coordinates";
const SOURCE_NONE: &str = "None";

const POLICY_FIRST_N: &str = "First days as returned";
const POLICY_FUTURE_ONLY: &str = "Only days after today";

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("Weatherbit API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let source = Select::new("Where should your location come from?", vec![
        SOURCE_IP,
        SOURCE_FIXED,
        SOURCE_NONE,
    ])
    .prompt()
    .context("Failed to read location source")?;

    match source {
        SOURCE_FIXED => {
            config.location.source = LocationSource::Fixed;
            config.location.latitude = Some(
                CustomType::<f64>::new("Latitude:")
                    .with_error_message("Please type a number, e.g. 52.09")
                    .prompt()?,
            );
            config.location.longitude = Some(
                CustomType::<f64>::new("Longitude:")
                    .with_error_message("Please type a number, e.g. 5.12")
                    .prompt()?,
            );
        }
        SOURCE_IP => {
            config.location.source = LocationSource::Ip;
            config.location.consent = Some(
                Confirm::new("Allow looking up your approximate location from your IP address?")
                    .with_default(true)
                    .prompt()?,
            );
        }
        _ => config.location.source = LocationSource::None,
    }

    config.display.num_of_days = CustomType::<usize>::new("Forecast days to show:")
        .with_default(config.display.num_of_days)
        .with_error_message(&format!("Please type a number between 1 and {MAX_DAYS}"))
        .prompt()?;

    let policy = Select::new("Which forecast days?", vec![POLICY_FIRST_N, POLICY_FUTURE_ONLY])
        .prompt()
        .context("Failed to read forecast policy")?;
    config.display.forecast_policy = match policy {
        POLICY_FUTURE_ONLY => ForecastPolicy::FutureOnly,
        _ => ForecastPolicy::FirstN,
    };

    config.validate()?;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

//! Session controller: drives Resolver → Fetcher and owns the display state.
//!
//! Every load takes a generation ticket before it suspends. When it finishes,
//! its outcome is applied only if no newer load has started in the meantime,
//! so a slow request can never overwrite fresher data.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    config::DisplayConfig,
    error::WidgetError,
    location::LocationResolver,
    model::{Coordinates, TemperatureUnit, WeatherReport},
    presenter::{ForecastPolicy, ReadyView, UiState},
    provider::WeatherProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub num_of_days: usize,
    pub policy: ForecastPolicy,
    pub unit: TemperatureUnit,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

impl From<&DisplayConfig> for SessionOptions {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            num_of_days: display.num_of_days,
            policy: display.forecast_policy,
            unit: display.unit,
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: UiState,
    coordinates: Option<Coordinates>,
    generation: u64,
    unit: TemperatureUnit,
}

#[derive(Debug)]
struct Inner {
    resolver: Arc<dyn LocationResolver>,
    provider: Arc<dyn WeatherProvider>,
    num_of_days: usize,
    policy: ForecastPolicy,
    shared: Mutex<Shared>,
}

/// Clonable handle; clones share the same state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(
        resolver: Arc<dyn LocationResolver>,
        provider: Arc<dyn WeatherProvider>,
        options: SessionOptions,
    ) -> Self {
        let shared = Shared {
            state: UiState::Init,
            coordinates: None,
            generation: 0,
            unit: options.unit,
        };

        Self {
            inner: Arc::new(Inner {
                resolver,
                provider,
                num_of_days: options.num_of_days,
                policy: options.policy,
                shared: Mutex::new(shared),
            }),
        }
    }

    pub fn state(&self) -> UiState {
        self.inner.shared.lock().state.clone()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.inner.shared.lock().coordinates
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.inner.shared.lock().unit
    }

    /// Flip the display unit. Stored data stays in Celsius.
    pub fn toggle_unit(&self) -> TemperatureUnit {
        let mut shared = self.inner.shared.lock();
        shared.unit = shared.unit.toggled();
        shared.unit
    }

    /// First load. Later calls leave an already mounted session untouched.
    pub async fn mount(&self) -> UiState {
        {
            let shared = self.inner.shared.lock();
            if shared.state != UiState::Init {
                debug!("session already mounted");
                return shared.state.clone();
            }
        }

        self.load().await
    }

    /// Manual refresh / retry. Reuses cached coordinates when present.
    pub async fn refresh(&self) -> UiState {
        self.load().await
    }

    async fn load(&self) -> UiState {
        let (ticket, cached) = self.begin();
        let outcome = self.run(cached).await;
        self.finish(ticket, outcome)
    }

    fn begin(&self) -> (u64, Option<Coordinates>) {
        let mut shared = self.inner.shared.lock();
        shared.generation += 1;
        shared.state = UiState::Loading;
        debug!(generation = shared.generation, "loading weather");
        (shared.generation, shared.coordinates)
    }

    async fn run(&self, cached: Option<Coordinates>) -> Result<WeatherReport, WidgetError> {
        let at = match cached {
            Some(at) => at,
            None => {
                let at = self.inner.resolver.current_position().await?;
                self.inner.shared.lock().coordinates = Some(at);
                at
            }
        };

        Ok(self.inner.provider.fetch(at).await?)
    }

    fn finish(&self, ticket: u64, outcome: Result<WeatherReport, WidgetError>) -> UiState {
        let mut shared = self.inner.shared.lock();

        if ticket != shared.generation {
            warn!(ticket, latest = shared.generation, "discarding superseded weather load");
            return shared.state.clone();
        }

        shared.state = match outcome {
            Ok(report) => UiState::Ready(ReadyView::from_report(
                report,
                self.inner.num_of_days,
                self.inner.policy,
                Utc::now(),
            )),
            Err(err) => {
                debug!(error = %err, "weather load failed");
                UiState::Error(err.to_string())
            }
        };

        shared.state.clone()
    }
}

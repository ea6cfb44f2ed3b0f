//! Core library for the `forecast` widget.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Location resolving from the host
//! - The Weatherbit provider (current conditions + daily forecast)
//! - The session controller and presentation helpers
//!
//! It is used by `forecast-cli`, but any other host can drive a [`Session`].

pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod presenter;
pub mod provider;
pub mod session;

pub use config::{Config, DisplayConfig, LocationConfig, LocationSource, ProviderConfig};
pub use error::{FetchError, LocateError, WidgetError};
pub use location::{FixedLocation, IpLocation, LocationResolver, NoLocation, resolver_from_config};
pub use model::{
    Coordinates, CurrentConditions, ForecastDay, TemperatureUnit, WeatherReport, convert,
};
pub use presenter::{ForecastPolicy, ReadyView, UiState, render};
pub use provider::{WeatherProvider, provider_from_config, weatherbit::WeatherbitProvider};
pub use session::{Session, SessionOptions};

use anyhow::{Result, anyhow};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forward-looking window a forecast is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "30m")]
    ThirtyMin,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHour,
    #[serde(rename = "4h")]
    FourHour,
}

impl Horizon {
    /// Returns the duration of this horizon in minutes
    pub fn to_minutes(&self) -> i64 {
        match self {
            Horizon::ThirtyMin => 30,
            Horizon::OneHour => 60,
            Horizon::TwoHour => 120,
            Horizon::FourHour => 240,
        }
    }

    pub fn to_duration(&self) -> Duration {
        Duration::minutes(self.to_minutes())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::ThirtyMin => "30m",
            Horizon::OneHour => "1h",
            Horizon::TwoHour => "2h",
            Horizon::FourHour => "4h",
        }
    }

    /// Returns all horizons in ascending order
    pub fn all() -> Vec<Horizon> {
        vec![
            Horizon::ThirtyMin,
            Horizon::OneHour,
            Horizon::TwoHour,
            Horizon::FourHour,
        ]
    }
}

impl FromStr for Horizon {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "30m" | "30min" => Ok(Horizon::ThirtyMin),
            "1h" | "60m" => Ok(Horizon::OneHour),
            "2h" | "120m" => Ok(Horizon::TwoHour),
            "4h" | "240m" => Ok(Horizon::FourHour),
            _ => Err(anyhow!(
                "Invalid horizon: '{}'. Valid options: 30m, 1h, 2h, 4h",
                s
            )),
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

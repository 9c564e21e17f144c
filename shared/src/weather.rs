//! Dashboard data. Weather is canned until a forecast provider is wired in.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    pub temp: i32,
    pub condition: String,
    pub humidity: u8,
    pub wind_speed: u32,
}

impl WeatherData {
    #[must_use]
    pub fn mock() -> Self {
        Self {
            temp: 24,
            condition: "Partly Cloudy".to_string(),
            humidity: 65,
            wind_speed: 12,
        }
    }

    #[must_use]
    pub fn icon(&self) -> WeatherIcon {
        if self.condition.to_lowercase().contains("rain") {
            WeatherIcon::Rain
        } else {
            WeatherIcon::Sun
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeatherIcon {
    Sun,
    Rain,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertSeverity {
    Info,
    Warning,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub title_key: &'static str,
    pub body_key: &'static str,
    pub severity: AlertSeverity,
}

#[must_use]
pub fn current_alerts() -> Vec<Alert> {
    vec![Alert {
        title_key: "alert_blight_title",
        body_key: "alert_blight_body",
        severity: AlertSeverity::Warning,
    }]
}

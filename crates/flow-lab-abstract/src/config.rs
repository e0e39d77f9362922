use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest sampling period the microsecond event timeline can represent.
pub const MIN_SAMPLE_PERIOD_S: f64 = 1e-6;

/// Congestion-control variant applied to the simulated transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TcpVariant {
    TcpNewReno,
    TcpTahoe,
    TcpReno,
    TcpWestwood,
    TcpVegas,
}

impl TcpVariant {
    pub const ALL: [TcpVariant; 5] = [
        TcpVariant::TcpNewReno,
        TcpVariant::TcpTahoe,
        TcpVariant::TcpReno,
        TcpVariant::TcpWestwood,
        TcpVariant::TcpVegas,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TcpVariant::TcpNewReno => "TcpNewReno",
            TcpVariant::TcpTahoe => "TcpTahoe",
            TcpVariant::TcpReno => "TcpReno",
            TcpVariant::TcpWestwood => "TcpWestwood",
            TcpVariant::TcpVegas => "TcpVegas",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl fmt::Display for TcpVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of one experiment run, drawn once from a seed and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub variant: TcpVariant,
    /// One-way propagation delay of the point-to-point link.
    pub link_delay_ms: u64,
    /// Application payload per segment, in bytes.
    pub payload_size: u32,
    /// Client start, seconds after experiment start.
    pub client_start_s: u64,
    /// Client stop, seconds after experiment start.
    pub client_stop_s: u64,
    pub seed: u64,
}

/// Fixed experiment parameters that are not randomized per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Sampling period in seconds.
    pub sample_period_s: f64,
    /// Global stop time of the experiment in seconds.
    pub stop_time_s: f64,
    /// Percentile of the throughput history used as the low-throughput bar.
    pub throughput_percentile: f64,
    /// Percentile of the delay history used as the high-delay bar.
    pub delay_percentile: f64,
    pub link_rate_bps: u64,
    pub app_rate_bps: u64,
    /// The packet sink stops accepting data at this time (seconds).
    pub sink_stop_s: f64,
    pub server_port: u16,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            sample_period_s: 1.0,
            stop_time_s: 22.0,
            throughput_percentile: 0.25,
            delay_percentile: 0.75,
            link_rate_bps: 10_000_000,
            app_rate_bps: 5_000_000,
            sink_stop_s: 20.0,
            server_port: 50_000,
        }
    }
}

impl MonitorSettings {
    /// Rejects settings under which sampling could not advance or terminate.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.sample_period_s.is_finite() || self.sample_period_s < MIN_SAMPLE_PERIOD_S {
            return Err(SettingsError::SamplePeriod {
                value: self.sample_period_s,
                min: MIN_SAMPLE_PERIOD_S,
            });
        }
        if !self.stop_time_s.is_finite() || self.stop_time_s < 0.0 {
            return Err(SettingsError::StopTime(self.stop_time_s));
        }
        let percentiles = [
            ("throughput", self.throughput_percentile),
            ("delay", self.delay_percentile),
        ];
        for (name, value) in percentiles {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::Percentile { name, value });
            }
        }
        Ok(())
    }
}

/// Partial settings, typically loaded from a TOML file.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SettingsOverride {
    pub sample_period_s: Option<f64>,
    pub stop_time_s: Option<f64>,
    pub throughput_percentile: Option<f64>,
    pub delay_percentile: Option<f64>,
    pub link_rate_bps: Option<u64>,
    pub app_rate_bps: Option<u64>,
    pub sink_stop_s: Option<f64>,
    pub server_port: Option<u16>,
}

impl SettingsOverride {
    pub fn apply_to(&self, settings: &mut MonitorSettings) {
        if let Some(v) = self.sample_period_s {
            settings.sample_period_s = v;
        }
        if let Some(v) = self.stop_time_s {
            settings.stop_time_s = v;
        }
        if let Some(v) = self.throughput_percentile {
            settings.throughput_percentile = v;
        }
        if let Some(v) = self.delay_percentile {
            settings.delay_percentile = v;
        }
        if let Some(v) = self.link_rate_bps {
            settings.link_rate_bps = v;
        }
        if let Some(v) = self.app_rate_bps {
            settings.app_rate_bps = v;
        }
        if let Some(v) = self.sink_stop_s {
            settings.sink_stop_s = v;
        }
        if let Some(v) = self.server_port {
            settings.server_port = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_names_round_trip() {
        for variant in TcpVariant::ALL {
            assert_eq!(TcpVariant::from_name(variant.name()), Some(variant));
        }
        assert_eq!(TcpVariant::from_name("TcpCubic"), None);
    }

    #[test]
    fn override_only_touches_given_fields() {
        let mut settings = MonitorSettings::default();
        let patch = SettingsOverride {
            stop_time_s: Some(10.0),
            delay_percentile: Some(0.9),
            ..Default::default()
        };
        patch.apply_to(&mut settings);

        assert_eq!(settings.stop_time_s, 10.0);
        assert_eq!(settings.delay_percentile, 0.9);
        assert_eq!(settings.sample_period_s, 1.0);
        assert_eq!(settings.throughput_percentile, 0.25);
        assert_eq!(settings.server_port, 50_000);
    }

    #[test]
    fn defaults_are_valid() {
        assert!(MonitorSettings::default().validate().is_ok());
    }

    #[test]
    fn sub_microsecond_period_is_rejected() {
        for period in [0.0, -1.0, 1e-7, f64::NAN, f64::INFINITY] {
            let settings = MonitorSettings {
                sample_period_s: period,
                ..Default::default()
            };
            assert!(
                matches!(settings.validate(), Err(SettingsError::SamplePeriod { .. })),
                "period {period} accepted"
            );
        }
        let shortest = MonitorSettings {
            sample_period_s: MIN_SAMPLE_PERIOD_S,
            ..Default::default()
        };
        assert!(shortest.validate().is_ok());
    }

    #[test]
    fn stop_time_and_percentiles_are_checked() {
        let endless = MonitorSettings {
            stop_time_s: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(endless.validate(), Err(SettingsError::StopTime(_))));

        let over = MonitorSettings {
            delay_percentile: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            over.validate(),
            Err(SettingsError::Percentile { name: "delay", .. })
        ));

        let nan = MonitorSettings {
            throughput_percentile: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }
}

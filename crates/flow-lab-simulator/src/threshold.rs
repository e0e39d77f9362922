use crate::history::MetricHistory;
use flow_lab_abstract::{MetricKind, MonitorSettings};
use serde::Serialize;

/// Nearest-rank percentile of `values`, `p` in [0, 1].
///
/// The rank is `floor(p * n)` clamped to `n - 1`; the value at that rank is
/// found by selection, not by sorting. An empty slice yields 0.0.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((p * values.len() as f64) as usize).min(values.len() - 1);
    let mut scratch = values.to_vec();
    let (_, value, _) = scratch.select_nth_unstable_by(idx, |a, b| a.total_cmp(b));
    *value
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Threshold {
    pub kind: MetricKind,
    pub percentile: f64,
    pub value: f64,
}

/// The two bars a flow is judged against in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub low_throughput: Threshold,
    pub high_delay: Threshold,
}

/// Which percentiles of the history become the current thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    pub throughput_percentile: f64,
    pub delay_percentile: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            throughput_percentile: 0.25,
            delay_percentile: 0.75,
        }
    }
}

impl From<&MonitorSettings> for ThresholdPolicy {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            throughput_percentile: settings.throughput_percentile,
            delay_percentile: settings.delay_percentile,
        }
    }
}

impl ThresholdPolicy {
    /// Recomputes both thresholds from the whole history.
    pub fn compute(&self, history: &MetricHistory) -> Thresholds {
        let throughput = history.snapshot(MetricKind::Throughput);
        let delay = history.snapshot(MetricKind::Delay);
        Thresholds {
            low_throughput: Threshold {
                kind: MetricKind::Throughput,
                percentile: self.throughput_percentile,
                value: percentile(&throughput, self.throughput_percentile),
            },
            high_delay: Threshold {
                kind: MetricKind::Delay,
                percentile: self.delay_percentile,
                value: percentile(&delay, self.delay_percentile),
            },
        }
    }
}

use flow_lab_abstract::{DerivedMetric, MetricKind};
use tracing::debug;

/// Append-only record of every derived metric of a run, one sequence per
/// metric kind, shared across all flows.
///
/// Nothing is ever evicted, so memory and the per-tick threshold cost grow
/// with `ticks x flows` for the lifetime of the run.
#[derive(Debug, Default, Clone)]
pub struct MetricHistory {
    throughput: Vec<DerivedMetric>,
    delay: Vec<DerivedMetric>,
}

impl MetricHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, metric: DerivedMetric) {
        let series = self.series_mut(metric.kind);
        debug_assert!(
            series.last().is_none_or(|last| last.tick <= metric.tick),
            "history must be appended in tick order"
        );
        debug!(
            "history {:?} += {} (flow {}, t={})",
            metric.kind, metric.value, metric.flow.id, metric.tick
        );
        series.push(metric);
    }

    /// All values recorded so far for `kind`, in insertion order.
    pub fn snapshot(&self, kind: MetricKind) -> Vec<f64> {
        self.series(kind).iter().map(|m| m.value).collect()
    }

    pub fn entries(&self, kind: MetricKind) -> &[DerivedMetric] {
        self.series(kind)
    }

    pub fn len(&self, kind: MetricKind) -> usize {
        self.series(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.throughput.is_empty() && self.delay.is_empty()
    }

    fn series(&self, kind: MetricKind) -> &Vec<DerivedMetric> {
        match kind {
            MetricKind::Throughput => &self.throughput,
            MetricKind::Delay => &self.delay,
        }
    }

    fn series_mut(&mut self, kind: MetricKind) -> &mut Vec<DerivedMetric> {
        match kind {
            MetricKind::Throughput => &mut self.throughput,
            MetricKind::Delay => &mut self.delay,
        }
    }
}

use crate::classify::classify;
use crate::history::MetricHistory;
use crate::metrics::derive;
use crate::threshold::{ThresholdPolicy, Thresholds};
use flow_lab_abstract::{FlowKey, FlowStatus, RawFlowCounters};

/// Outcome of evaluating one flow at one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowEvaluation {
    pub throughput: f64,
    pub delay: f64,
    pub thresholds: Thresholds,
    pub status: FlowStatus,
}

/// Derivation, history, thresholds and classification for one run.
///
/// The history lives here and nowhere else; it is dropped with the pipeline
/// at the end of the run.
#[derive(Debug, Default)]
pub struct FlowPipeline {
    history: MetricHistory,
    policy: ThresholdPolicy,
}

impl FlowPipeline {
    pub fn new(policy: ThresholdPolicy) -> Self {
        Self {
            history: MetricHistory::new(),
            policy,
        }
    }

    /// The flow's own sample is appended before the thresholds are computed,
    /// so it takes part in the bar it is judged against.
    pub fn evaluate(&mut self, tick: f64, flow: FlowKey, counters: &RawFlowCounters) -> FlowEvaluation {
        let (throughput, delay) = derive(flow, counters, tick);
        self.history.append(throughput);
        self.history.append(delay);

        let thresholds = self.policy.compute(&self.history);
        let status = classify(throughput.value, delay.value, &thresholds);

        FlowEvaluation {
            throughput: throughput.value,
            delay: delay.value,
            thresholds,
            status,
        }
    }

    pub fn history(&self) -> &MetricHistory {
        &self.history
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_lab_abstract::MetricKind;
    use flow_lab_abstract::flow::protocol;
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn flow() -> FlowKey {
        FlowKey::new(
            1,
            SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 1), 49153),
            SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 2), 50000),
            protocol::TCP,
        )
    }

    fn counters(rx_bytes: u64, first: f64, last: f64, delay_sum: f64, packets: u64) -> RawFlowCounters {
        RawFlowCounters {
            rx_bytes,
            rx_packets: packets,
            delay_sum,
            time_first_tx: first,
            time_last_rx: last,
        }
    }

    #[test]
    fn first_sample_is_its_own_threshold() {
        let mut pipeline = FlowPipeline::default();
        let eval = pipeline.evaluate(1.0, flow(), &counters(625_000, 1.0, 2.0, 0.02, 2));
        assert_eq!(eval.throughput, 5.0);
        assert_eq!(eval.thresholds.low_throughput.value, 5.0);
        assert_eq!(eval.thresholds.high_delay.value, 0.01);
        assert_eq!(eval.status, FlowStatus::Ok);
    }

    #[test]
    fn drop_below_history_is_flagged() {
        let mut pipeline = FlowPipeline::default();
        for tick in 1..=4 {
            let eval = pipeline.evaluate(tick as f64, flow(), &counters(625_000, 0.0, 1.0, 0.02, 2));
            assert_eq!(eval.status, FlowStatus::Ok);
        }
        // throughput history [5, 5, 5, 5, 1] -> 25th percentile at rank 1 is 5.0
        let eval = pipeline.evaluate(5.0, flow(), &counters(625_000, 0.0, 5.0, 0.02, 2));
        assert_eq!(eval.throughput, 1.0);
        assert_eq!(eval.thresholds.low_throughput.value, 5.0);
        assert_eq!(eval.status, FlowStatus::Failure);
    }

    #[test]
    fn delay_spike_is_flagged() {
        let mut pipeline = FlowPipeline::default();
        for tick in 1..=4 {
            pipeline.evaluate(tick as f64, flow(), &counters(625_000, 0.0, 1.0, 0.02, 2));
        }
        // delay history [0.01 x4, 0.05] -> 75th percentile at rank 3 is 0.01
        let eval = pipeline.evaluate(5.0, flow(), &counters(625_000, 0.0, 1.0, 0.1, 2));
        assert_eq!(eval.delay, 0.05);
        assert_eq!(eval.thresholds.high_delay.value, 0.01);
        assert_eq!(eval.status, FlowStatus::Failure);
        assert_eq!(pipeline.history().len(MetricKind::Delay), 5);
    }
}

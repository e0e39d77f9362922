use crate::engine::LinkEventSummary;
use crate::monitor::SamplingScheduler;
use flow_lab_abstract::{FlowKey, MetricKind, MonitorSettings, RawFlowCounters, RunConfig};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FlowSummary {
    pub flow: FlowKey,
    pub endpoints: String,
    pub tx_packets: u64,
    pub counters: RawFlowCounters,
}

/// End-of-run snapshot, written next to the record CSV.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub config: RunConfig,
    pub settings: MonitorSettings,
    pub ticks: u64,
    pub records: u64,
    pub failures: u64,
    pub skipped: u64,
    pub throughput_history_len: usize,
    pub delay_history_len: usize,
    pub flows: Vec<FlowSummary>,
    pub link_events: Vec<LinkEventSummary>,
}

impl MonitorReport {
    pub fn new(
        config: &RunConfig,
        settings: &MonitorSettings,
        monitor: &SamplingScheduler,
        flows: Vec<FlowSummary>,
        link_events: Vec<LinkEventSummary>,
    ) -> Self {
        let history = monitor.pipeline().history();
        Self {
            config: config.clone(),
            settings: settings.clone(),
            ticks: monitor.ticks(),
            records: monitor.records(),
            failures: monitor.failures(),
            skipped: monitor.skipped(),
            throughput_history_len: history.len(MetricKind::Throughput),
            delay_history_len: history.len(MetricKind::Delay),
            flows,
            link_events,
        }
    }
}

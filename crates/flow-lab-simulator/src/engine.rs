use crate::monitor::SamplingScheduler;
use crate::trace::{FlowSummary, MonitorReport};
use flow_lab_abstract::flow::protocol;
use flow_lab_abstract::{
    FlowKey, MonitorSettings, RawFlowCounters, RecordSink, RunConfig, SinkError, SourceError,
    TrafficStatsSource,
};
use rand::Rng;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::{debug, info};

pub const CLIENT_ADDR: Ipv4Addr = Ipv4Addr::new(10, 1, 1, 1);
pub const SERVER_ADDR: Ipv4Addr = Ipv4Addr::new(10, 1, 1, 2);
pub const CLIENT_PORT: u16 = 49153;

/// IPv4 + TCP header bytes carried by every segment.
const HEADER_BYTES: u32 = 52;
/// Upper bound of the random per-packet queueing jitter.
const MAX_JITTER_US: u64 = 250;

const US_PER_S: f64 = 1e6;

fn to_secs(us: u64) -> f64 {
    us as f64 / US_PER_S
}

fn to_us(secs: f64) -> u64 {
    (secs * US_PER_S).round() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Client,
    Server,
}

impl NodeId {
    pub fn peer(&self) -> Self {
        match self {
            NodeId::Client => NodeId::Server,
            NodeId::Server => NodeId::Client,
        }
    }

    fn index(&self) -> usize {
        match self {
            NodeId::Client => 0,
            NodeId::Server => 1,
        }
    }
}

#[derive(Debug)]
pub enum EventType {
    ClientStart,
    ClientStop,
    ClientSend,
    PacketArrival {
        to: NodeId,
        flow: u32,
        bytes: u32,
        sent_at: u64,
    },
    Sample,
}

#[derive(Debug)]
struct Event {
    time: u64,
    event_type: EventType,
    id: u64, // Unique ID to differentiate events at same time
}

// Custom Ord for Min-Heap (smallest time pops first)
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// A compact textual summary of notable link-level events.
#[derive(Debug, Clone, Serialize)]
pub struct LinkEventSummary {
    pub time: u64,
    pub description: String,
}

#[derive(Debug, Clone)]
struct FlowState {
    key: FlowKey,
    counters: RawFlowCounters,
    tx_packets: u64,
}

/// Per-flow counters, kept the way a flow monitor keeps them.
#[derive(Debug, Default)]
pub struct FlowTable {
    flows: Vec<FlowState>,
}

impl FlowTable {
    fn on_transmit(&mut self, key: FlowKey, now: u64) {
        if !self.flows.iter().any(|f| f.key.id == key.id) {
            debug!("New flow observed: {key}");
            self.flows.push(FlowState {
                key,
                counters: RawFlowCounters {
                    time_first_tx: to_secs(now),
                    ..Default::default()
                },
                tx_packets: 0,
            });
            self.flows.sort_by_key(|f| f.key.id);
        }
        if let Some(state) = self.flows.iter_mut().find(|f| f.key.id == key.id) {
            state.tx_packets += 1;
        }
    }

    fn on_receive(&mut self, flow: u32, bytes: u32, sent_at: u64, now: u64) {
        if let Some(state) = self.flows.iter_mut().find(|f| f.key.id == flow) {
            state.counters.rx_bytes += bytes as u64;
            state.counters.rx_packets += 1;
            state.counters.delay_sum += to_secs(now - sent_at);
            state.counters.time_last_rx = to_secs(now);
        }
    }

    pub fn summaries(&self) -> Vec<FlowSummary> {
        self.flows
            .iter()
            .map(|f| FlowSummary {
                flow: f.key,
                endpoints: f.key.endpoints(),
                tx_packets: f.tx_packets,
                counters: f.counters,
            })
            .collect()
    }
}

impl TrafficStatsSource for FlowTable {
    fn active_flows(&self) -> Vec<FlowKey> {
        self.flows.iter().map(|f| f.key).collect()
    }

    fn counters(&self, flow: &FlowKey) -> Result<RawFlowCounters, SourceError> {
        self.flows
            .iter()
            .find(|f| f.key.id == flow.id)
            .map(|f| f.counters)
            .ok_or(SourceError::Missing(flow.id))
    }
}

/// Two nodes on a point-to-point link: an on/off client streaming segments to
/// a packet sink, which acknowledges every segment on the reverse path.
///
/// Sampling ticks are ordinary events on the same timeline, so a tick never
/// overlaps packet processing.
pub struct Simulator {
    time: u64,
    event_queue: BinaryHeap<Event>,
    event_id_counter: u64,

    config: RunConfig,
    settings: MonitorSettings,
    rng: rand::rngs::StdRng,

    flows: FlowTable,
    data_flow: FlowKey,
    ack_flow: FlowKey,
    client_on: bool,
    /// Time each direction of the link becomes idle, indexed by sending node.
    link_free_at: [u64; 2],

    pub packets_sent: u64,
    pub packets_refused: u64,
    pub link_events: Vec<LinkEventSummary>,
}

impl Simulator {
    pub fn new(config: RunConfig, settings: MonitorSettings) -> Self {
        use rand::SeedableRng;
        let rng = rand::rngs::StdRng::seed_from_u64(config.seed);

        let client = SocketAddrV4::new(CLIENT_ADDR, CLIENT_PORT);
        let server = SocketAddrV4::new(SERVER_ADDR, settings.server_port);

        Self {
            time: 0,
            event_queue: BinaryHeap::new(),
            event_id_counter: 0,
            config,
            settings,
            rng,
            flows: FlowTable::default(),
            data_flow: FlowKey::new(1, client, server, protocol::TCP),
            ack_flow: FlowKey::new(2, server, client, protocol::TCP),
            client_on: false,
            link_free_at: [0; 2],
            packets_sent: 0,
            packets_refused: 0,
            link_events: Vec::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn flows(&self) -> &FlowTable {
        &self.flows
    }

    pub fn current_time(&self) -> u64 {
        self.time
    }

    pub fn peek_next_event_time(&self) -> Option<u64> {
        self.event_queue.peek().map(|e| e.time)
    }

    pub fn remaining_events(&self) -> usize {
        self.event_queue.len()
    }

    fn stop_time(&self) -> u64 {
        to_us(self.settings.stop_time_s)
    }

    fn push_event(&mut self, time: u64, event_type: EventType) {
        self.event_queue.push(Event {
            time,
            event_type,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    fn note(&mut self, description: String) {
        info!("[{:.6}s] {}", to_secs(self.time), description);
        self.link_events.push(LinkEventSummary {
            time: self.time,
            description,
        });
    }

    /// Schedules the client on/off window and the first sampling tick.
    pub fn init(&mut self, monitor: &SamplingScheduler) {
        self.push_event(to_us(self.config.client_start_s as f64), EventType::ClientStart);
        self.push_event(to_us(self.config.client_stop_s as f64), EventType::ClientStop);
        if let Some(first) = monitor.first_tick() {
            self.push_event(to_us(first), EventType::Sample);
        }
    }

    /// Process the next event before the global stop time.
    /// Returns false once the queue is exhausted or the stop time is reached.
    pub fn step(
        &mut self,
        monitor: &mut SamplingScheduler,
        sink: &mut dyn RecordSink,
    ) -> Result<bool, SinkError> {
        match self.peek_next_event_time() {
            Some(t) if t < self.stop_time() => {}
            _ => return Ok(false),
        }
        let event = match self.event_queue.pop() {
            Some(e) => e,
            None => return Ok(false),
        };

        self.time = event.time;
        match event.event_type {
            EventType::ClientStart => {
                self.note(format!(
                    "client on: {}B segments at {} bps",
                    self.config.payload_size, self.settings.app_rate_bps
                ));
                self.client_on = true;
                self.push_event(self.time, EventType::ClientSend);
            }
            EventType::ClientStop => {
                self.note("client off".to_string());
                self.client_on = false;
            }
            EventType::ClientSend => {
                if self.client_on {
                    let bytes = self.config.payload_size + HEADER_BYTES;
                    self.transmit(NodeId::Client, self.data_flow, bytes);
                    let interval = (self.config.payload_size as u64 * 8)
                        .saturating_mul(1_000_000)
                        .div_ceil(self.settings.app_rate_bps.max(1));
                    self.push_event(self.time + interval.max(1), EventType::ClientSend);
                }
            }
            EventType::PacketArrival {
                to,
                flow,
                bytes,
                sent_at,
            } => self.on_arrival(to, flow, bytes, sent_at),
            EventType::Sample => {
                let now = to_secs(self.time);
                if let Some(next) = monitor.on_tick(now, &self.flows, sink)? {
                    // The timeline must move forward even if the period rounds to 0us.
                    self.push_event(to_us(next).max(self.time + 1), EventType::Sample);
                }
            }
        }
        Ok(true)
    }

    /// Runs the experiment to its global stop time, then stops sampling.
    pub fn run(
        &mut self,
        monitor: &mut SamplingScheduler,
        sink: &mut dyn RecordSink,
    ) -> Result<(), SinkError> {
        self.init(monitor);
        while self.step(monitor, sink)? {}
        self.time = self.time.max(self.stop_time());
        monitor.stop();
        sink.flush()?;
        info!(
            "Experiment finished at {}s: {} packets sent, {} refused, {} events left",
            to_secs(self.time),
            self.packets_sent,
            self.packets_refused,
            self.remaining_events()
        );
        Ok(())
    }

    pub fn export_report(&self, monitor: &SamplingScheduler) -> MonitorReport {
        MonitorReport::new(
            &self.config,
            &self.settings,
            monitor,
            self.flows.summaries(),
            self.link_events.clone(),
        )
    }

    fn transmit(&mut self, from: NodeId, key: FlowKey, bytes: u32) {
        self.flows.on_transmit(key, self.time);
        self.packets_sent += 1;

        let link = from.index();
        let start = self.time.max(self.link_free_at[link]);
        let serialization = (bytes as u64 * 8)
            .saturating_mul(1_000_000)
            .div_ceil(self.settings.link_rate_bps.max(1));
        self.link_free_at[link] = start + serialization;

        let jitter = self.rng.random_range(0..=MAX_JITTER_US);
        let arrival = start + serialization + self.config.link_delay_ms * 1_000 + jitter;

        debug!(
            "[{:?}->{:?}] flow {} {}B arrives at {}us",
            from,
            from.peer(),
            key.id,
            bytes,
            arrival
        );
        self.push_event(
            arrival,
            EventType::PacketArrival {
                to: from.peer(),
                flow: key.id,
                bytes,
                sent_at: self.time,
            },
        );
    }

    fn on_arrival(&mut self, to: NodeId, flow: u32, bytes: u32, sent_at: u64) {
        match to {
            NodeId::Server => {
                if to_secs(self.time) >= self.settings.sink_stop_s {
                    if self.packets_refused == 0 {
                        self.note("packet sink closed, refusing data".to_string());
                    }
                    self.packets_refused += 1;
                    return;
                }
                self.flows.on_receive(flow, bytes, sent_at, self.time);
                self.transmit(NodeId::Server, self.ack_flow, HEADER_BYTES);
            }
            NodeId::Client => {
                self.flows.on_receive(flow, bytes, sent_at, self.time);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::configure;
    use crate::sink::MemorySink;
    use flow_lab_abstract::{MetricKind, TcpVariant};

    fn fixed_config() -> RunConfig {
        RunConfig {
            variant: TcpVariant::TcpReno,
            link_delay_ms: 3,
            payload_size: 1000,
            client_start_s: 2,
            client_stop_s: 15,
            seed: 7,
        }
    }

    fn run(config: RunConfig, settings: MonitorSettings) -> (Simulator, SamplingScheduler, MemorySink) {
        let mut monitor = SamplingScheduler::new(&settings, config.variant).unwrap();
        let mut sim = Simulator::new(config, settings);
        let mut sink = MemorySink::default();
        sim.run(&mut monitor, &mut sink).unwrap();
        (sim, monitor, sink)
    }

    #[test]
    fn full_run_samples_every_second_until_stop() {
        let (sim, monitor, sink) = run(fixed_config(), MonitorSettings::default());

        assert!(sink.records().iter().all(|r| r.time < 22.0));
        assert_eq!(sink.records().last().map(|r| r.time), Some(21.0));
        assert_eq!(monitor.ticks(), 21);
        assert!(sim.current_time() >= to_us(22.0));

        // No flow exists before the client starts at 2s.
        assert!(sink.records().iter().all(|r| r.time >= 2.0));
        // From then on both flows are reported every tick.
        let per_tick = sink.records().iter().filter(|r| r.time == 10.0).count();
        assert_eq!(per_tick, 2);
        assert!(sink.records().iter().all(|r| r.variant == TcpVariant::TcpReno));
    }

    #[test]
    fn history_matches_emitted_records() {
        let (_, monitor, sink) = run(fixed_config(), MonitorSettings::default());
        let history = monitor.pipeline().history();
        assert_eq!(history.len(MetricKind::Throughput), sink.records().len());
        assert_eq!(history.len(MetricKind::Delay), sink.records().len());
        assert_eq!(monitor.records() as usize, sink.records().len());
    }

    #[test]
    fn data_flow_approaches_application_rate() {
        let (sim, _, sink) = run(fixed_config(), MonitorSettings::default());

        let data = sink
            .records()
            .iter()
            .find(|r| r.flow.id == 1 && r.time == 14.0)
            .cloned()
            .unwrap();
        // 1000B payload + headers at 5 Mbps of payload pacing.
        assert!(data.throughput > 4.5 && data.throughput < 5.5, "{}", data.throughput);
        // serialization (~0.84ms) + 3ms propagation + at most 0.25ms jitter
        assert!(data.delay > 0.0038 && data.delay < 0.0042, "{}", data.delay);
        assert_eq!(data.flow.endpoints(), "10.1.1.1->10.1.1.2");

        let flows = sim.flows().active_flows();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[1].endpoints(), "10.1.1.2->10.1.1.1");
    }

    #[test]
    fn sink_refuses_data_after_it_closes() {
        let config = RunConfig {
            client_stop_s: 20,
            ..fixed_config()
        };
        let settings = MonitorSettings {
            sink_stop_s: 10.0,
            ..Default::default()
        };
        let (sim, _, _) = run(config, settings);
        assert!(sim.packets_refused > 0);
        let data = sim.flows().counters(&sim.flows().active_flows()[0]).unwrap();
        assert!(data.time_last_rx < 10.0);
    }

    #[test]
    fn same_seed_same_records() {
        let config = configure(1_751_500_000);
        let (_, _, first) = run(config.clone(), MonitorSettings::default());
        let (_, _, second) = run(config, MonitorSettings::default());
        assert_eq!(first.records(), second.records());
    }

    #[test]
    fn stop_before_first_tick_emits_nothing() {
        let settings = MonitorSettings {
            stop_time_s: 0.5,
            ..Default::default()
        };
        let (_, monitor, sink) = run(fixed_config(), settings);
        assert!(sink.records().is_empty());
        assert_eq!(monitor.ticks(), 0);
    }

    #[test]
    fn microsecond_period_still_reaches_stop_time() {
        let settings = MonitorSettings {
            sample_period_s: 1e-6,
            stop_time_s: 0.001,
            ..Default::default()
        };
        let (sim, monitor, sink) = run(fixed_config(), settings);
        assert!(sim.current_time() >= to_us(0.001));
        assert_eq!(monitor.state(), crate::monitor::SchedulerState::Stopped);
        // The client has not started yet, so ticks run without any flow.
        assert!(sink.records().is_empty());
        assert!(monitor.ticks() > 900 && monitor.ticks() < 1_000, "{}", monitor.ticks());
    }

    #[test]
    fn report_lists_link_events_in_order() {
        let config = RunConfig {
            client_stop_s: 20,
            ..fixed_config()
        };
        let settings = MonitorSettings {
            sink_stop_s: 10.0,
            ..Default::default()
        };
        let (sim, monitor, _) = run(config, settings);
        let report = sim.export_report(&monitor);

        let descriptions: Vec<&str> = report
            .link_events
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(descriptions.len(), 3, "{descriptions:?}");
        assert!(descriptions[0].starts_with("client on"));
        assert_eq!(descriptions[1], "packet sink closed, refusing data");
        assert_eq!(descriptions[2], "client off");
        assert_eq!(report.link_events[0].time, to_us(2.0));
        assert_eq!(report.link_events[2].time, to_us(20.0));
        assert!(report.link_events.windows(2).all(|w| w[0].time <= w[1].time));
    }
}

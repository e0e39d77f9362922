use crate::config::{SettingsOverride, TcpVariant};
use crate::flow::{FlowKey, FlowStatus, RawFlowCounters, protocol};
use serde::Deserialize;
use std::net::SocketAddrV4;

/// Scripted counter snapshots replayed through the monitor, with expectations.
#[derive(Deserialize, Debug, Clone)]
pub struct ReplayScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub variant: TcpVariant,
    #[serde(default)]
    pub config: SettingsOverride,
    pub ticks: Vec<ScriptedTick>,
    #[serde(default)]
    pub assertions: Vec<ScenarioAssertion>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScriptedTick {
    /// Simulation time of the tick, in seconds.
    pub time: f64,
    #[serde(default)]
    pub flows: Vec<ScriptedFlow>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScriptedFlow {
    pub id: u32,
    pub source: SocketAddrV4,
    pub destination: SocketAddrV4,
    #[serde(default = "default_protocol")]
    pub protocol: u8,
    #[serde(default)]
    pub rx_bytes: u64,
    #[serde(default)]
    pub rx_packets: u64,
    #[serde(default)]
    pub delay_sum: f64,
    #[serde(default)]
    pub time_first_tx: f64,
    #[serde(default)]
    pub time_last_rx: f64,
    /// Listed as active but the source has no snapshot for it this tick.
    #[serde(default)]
    pub unavailable: bool,
}

fn default_protocol() -> u8 {
    protocol::TCP
}

impl ScriptedFlow {
    pub fn key(&self) -> FlowKey {
        FlowKey::new(self.id, self.source, self.destination, self.protocol)
    }

    pub fn counters(&self) -> RawFlowCounters {
        RawFlowCounters {
            rx_bytes: self.rx_bytes,
            rx_packets: self.rx_packets,
            delay_sum: self.delay_sum,
            time_first_tx: self.time_first_tx,
            time_last_rx: self.time_last_rx,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioAssertion {
    /// The record for `flow` at tick `time` carries `status`
    StatusAt {
        time: f64,
        flow: u32,
        status: FlowStatus,
    },
    /// Total number of emitted records is within range
    RecordCount { min: usize, max: Option<usize> },
    /// Number of FAILURE records is within range
    FailureCount { min: usize, max: Option<usize> },
    /// No record carries a tick time at or after `time`
    NoRecordFrom { time: f64 },
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddrV4;

use crate::config::TcpVariant;
use crate::error::SourceError;

/// IP protocol number used in flow keys
pub mod protocol {
    pub const TCP: u8 = 6;
}

/// Identifies one unidirectional flow, as handed out by the statistics source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub id: u32,
    pub source: SocketAddrV4,
    pub destination: SocketAddrV4,
    pub protocol: u8,
}

impl FlowKey {
    pub fn new(id: u32, source: SocketAddrV4, destination: SocketAddrV4, protocol: u8) -> Self {
        Self {
            id,
            source,
            destination,
            protocol,
        }
    }

    /// Human-readable `source->dest` address pair.
    pub fn endpoints(&self) -> String {
        format!("{}->{}", self.source.ip(), self.destination.ip())
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flow {} ({} -> {}, proto {})",
            self.id, self.source, self.destination, self.protocol
        )
    }
}

/// Cumulative counters of one flow as of the current tick. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawFlowCounters {
    pub rx_bytes: u64,
    pub rx_packets: u64,
    /// Sum of one-way delays over all received packets.
    pub delay_sum: f64,
    pub time_first_tx: f64,
    pub time_last_rx: f64,
}

impl RawFlowCounters {
    /// Rejects snapshots that cannot come from a well-behaved source.
    pub fn validate(&self, flow: &FlowKey) -> Result<(), SourceError> {
        let fields = [
            ("delay_sum", self.delay_sum),
            ("time_first_tx", self.time_first_tx),
            ("time_last_rx", self.time_last_rx),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SourceError::Malformed {
                    flow: flow.id,
                    reason: format!("{name} = {value}"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Throughput,
    Delay,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedMetric {
    pub kind: MetricKind,
    pub value: f64,
    pub flow: FlowKey,
    pub tick: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILURE")]
    Failure,
}

impl FlowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStatus::Ok => "OK",
            FlowStatus::Failure => "FAILURE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "OK" => Some(FlowStatus::Ok),
            "FAILURE" => Some(FlowStatus::Failure),
            _ => None,
        }
    }
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified flow at one tick, as handed to the output sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowStatusRecord {
    pub time: f64,
    pub flow: FlowKey,
    /// Mbps
    pub throughput: f64,
    /// Seconds
    pub delay: f64,
    pub status: FlowStatus,
    pub variant: TcpVariant,
}

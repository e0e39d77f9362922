use crate::error::{SinkError, SourceError};
use crate::flow::{FlowKey, FlowStatusRecord, RawFlowCounters};

/// Per-tick view of the traffic statistics kept by the network simulation.
/// The monitor only reads from it.
pub trait TrafficStatsSource {
    /// Flows observed so far, in a stable order.
    fn active_flows(&self) -> Vec<FlowKey>;

    /// Current cumulative counters of `flow`.
    fn counters(&self, flow: &FlowKey) -> Result<RawFlowCounters, SourceError>;
}

/// Consumer of the classified record stream.
/// Records arrive in emission order and must be written in that order.
pub trait RecordSink {
    fn emit(&mut self, record: FlowStatusRecord) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

pub mod config;
pub mod error;
pub mod flow;
pub mod interface;
pub mod scenario;

pub use error::{SettingsError, SinkError, SourceError};
pub use flow::{
    DerivedMetric, FlowKey, FlowStatus, FlowStatusRecord, MetricKind, RawFlowCounters,
};
pub use interface::{RecordSink, TrafficStatsSource};

pub use config::{MonitorSettings, RunConfig, SettingsOverride, TcpVariant};
pub use scenario::{ReplayScenario, ScenarioAssertion, ScriptedFlow, ScriptedTick};

pub mod classify;
pub mod configurator;
pub mod engine;
pub mod history;
pub mod metrics;
pub mod monitor;
pub mod pipeline;
pub mod threshold;

pub mod scenario_runner;
pub mod sink;
pub mod summary;
pub mod trace;

pub use configurator::{Configurator, configure};
pub use engine::{LinkEventSummary, NodeId, Simulator};
pub use monitor::{SamplingScheduler, SchedulerState};
pub use pipeline::{FlowEvaluation, FlowPipeline};
pub use sink::{CsvSink, MemorySink};
pub use threshold::{ThresholdPolicy, Thresholds, percentile};
pub use trace::MonitorReport;

use crate::monitor::{SamplingScheduler, SchedulerState};
use crate::sink::MemorySink;
use anyhow::{Context, Result, bail, ensure};
use flow_lab_abstract::{
    FlowKey, FlowStatus, FlowStatusRecord, MonitorSettings, RawFlowCounters, RecordSink,
    ReplayScenario, ScenarioAssertion, ScriptedTick, SourceError, TrafficStatsSource,
};
use std::fs;
use tracing::{info, warn};

/// Serves the scripted snapshots of one tick.
struct ScriptedSource<'a> {
    tick: &'a ScriptedTick,
}

impl TrafficStatsSource for ScriptedSource<'_> {
    fn active_flows(&self) -> Vec<FlowKey> {
        self.tick.flows.iter().map(|f| f.key()).collect()
    }

    fn counters(&self, flow: &FlowKey) -> Result<RawFlowCounters, SourceError> {
        match self.tick.flows.iter().find(|f| f.id == flow.id) {
            Some(scripted) if !scripted.unavailable => Ok(scripted.counters()),
            _ => Err(SourceError::Missing(flow.id)),
        }
    }
}

#[derive(Debug)]
pub struct ReplayOutcome {
    pub name: String,
    pub records: Vec<FlowStatusRecord>,
    pub ticks: u64,
}

pub fn load_scenario(path: &str) -> Result<ReplayScenario> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read scenario file {path}"))?;
    toml::from_str(&content).context("Failed to parse scenario file")
}

pub fn run_scenario(path: &str) -> Result<ReplayOutcome> {
    let scenario = load_scenario(path)?;
    replay(&scenario)
}

/// Feeds every scripted tick through the monitor and checks the assertions.
pub fn replay(scenario: &ReplayScenario) -> Result<ReplayOutcome> {
    info!("Replaying scenario '{}': {}", scenario.name, scenario.description);
    let mut settings = MonitorSettings::default();
    scenario.config.apply_to(&mut settings);

    let mut monitor = SamplingScheduler::new(&settings, scenario.variant)
        .with_context(|| format!("Scenario '{}' has invalid settings", scenario.name))?;
    let mut sink = MemorySink::default();
    let records = replay_into(scenario, &mut monitor, &mut sink)
        .map(|_| sink.into_records())?;

    check_assertions(&scenario.assertions, &records)?;
    info!(
        "Scenario '{}' passed: {} ticks, {} records",
        scenario.name,
        monitor.ticks(),
        records.len()
    );

    Ok(ReplayOutcome {
        name: scenario.name.clone(),
        records,
        ticks: monitor.ticks(),
    })
}

fn replay_into(
    scenario: &ReplayScenario,
    monitor: &mut SamplingScheduler,
    sink: &mut dyn RecordSink,
) -> Result<()> {
    let mut last = f64::NEG_INFINITY;
    for tick in &scenario.ticks {
        ensure!(
            tick.time > last,
            "Scenario ticks must be strictly increasing ({} after {})",
            tick.time,
            last
        );
        last = tick.time;

        if monitor.state() == SchedulerState::Stopped {
            warn!("Scheduler stopped; ignoring scripted tick at {}s", tick.time);
            continue;
        }
        monitor.on_tick(tick.time, &ScriptedSource { tick }, sink)?;
    }
    monitor.stop();
    sink.flush()?;
    Ok(())
}

pub fn check_assertions(assertions: &[ScenarioAssertion], records: &[FlowStatusRecord]) -> Result<()> {
    for assertion in assertions {
        match assertion {
            ScenarioAssertion::StatusAt { time, flow, status } => {
                let Some(record) = records
                    .iter()
                    .find(|r| r.time == *time && r.flow.id == *flow)
                else {
                    bail!("Expected a record for flow {flow} at {time}s, found none");
                };
                ensure!(
                    record.status == *status,
                    "Flow {flow} at {time}s: expected {status}, got {} (throughput {}, delay {})",
                    record.status,
                    record.throughput,
                    record.delay
                );
            }
            ScenarioAssertion::RecordCount { min, max } => {
                check_range("record count", records.len(), *min, *max)?;
            }
            ScenarioAssertion::FailureCount { min, max } => {
                let failures = records
                    .iter()
                    .filter(|r| r.status == FlowStatus::Failure)
                    .count();
                check_range("failure count", failures, *min, *max)?;
            }
            ScenarioAssertion::NoRecordFrom { time } => {
                if let Some(record) = records.iter().find(|r| r.time >= *time) {
                    bail!(
                        "Record for flow {} at {}s is not before {time}s",
                        record.flow.id,
                        record.time
                    );
                }
            }
        }
    }
    Ok(())
}

fn check_range(what: &str, actual: usize, min: usize, max: Option<usize>) -> Result<()> {
    ensure!(actual >= min, "{what} {actual} is below minimum {min}");
    if let Some(max) = max {
        ensure!(actual <= max, "{what} {actual} is above maximum {max}");
    }
    Ok(())
}

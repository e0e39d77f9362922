use crate::pipeline::FlowPipeline;
use crate::threshold::ThresholdPolicy;
use flow_lab_abstract::{
    FlowStatus, FlowStatusRecord, MonitorSettings, RecordSink, SettingsError, SinkError,
    TcpVariant, TrafficStatsSource,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

/// Counters for one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub emitted: usize,
    pub failures: usize,
    pub skipped: usize,
}

/// Fixed-period sampler that evaluates every active flow and emits one record
/// per flow per tick until the stop time.
///
/// The scheduler checks the stop time itself before evaluating and before
/// re-arming; the owner only has to call [`SamplingScheduler::on_tick`] at the
/// time it returned last.
pub struct SamplingScheduler {
    pipeline: FlowPipeline,
    variant: TcpVariant,
    period: f64,
    stop_time: f64,
    state: SchedulerState,

    ticks: u64,
    records: u64,
    failures: u64,
    skipped: u64,
}

impl SamplingScheduler {
    pub fn new(settings: &MonitorSettings, variant: TcpVariant) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            pipeline: FlowPipeline::new(ThresholdPolicy::from(settings)),
            variant,
            period: settings.sample_period_s,
            stop_time: settings.stop_time_s,
            state: SchedulerState::Running,
            ticks: 0,
            records: 0,
            failures: 0,
            skipped: 0,
        })
    }

    /// Time of the first tick, one period after the experiment starts.
    pub fn first_tick(&self) -> Option<f64> {
        (self.state == SchedulerState::Running && self.period < self.stop_time).then_some(self.period)
    }

    /// Runs one tick at `now` and returns when the next one is due, or `None`
    /// once the scheduler has stopped.
    pub fn on_tick(
        &mut self,
        now: f64,
        source: &dyn TrafficStatsSource,
        sink: &mut dyn RecordSink,
    ) -> Result<Option<f64>, SinkError> {
        if self.state == SchedulerState::Stopped {
            debug!("Ignoring tick at {now}s: scheduler stopped");
            return Ok(None);
        }
        if now >= self.stop_time {
            info!("Stop time {}s reached, sampling stopped", self.stop_time);
            self.state = SchedulerState::Stopped;
            return Ok(None);
        }

        let summary = self.evaluate_flows(now, source, sink)?;
        self.ticks += 1;
        debug!(
            "Tick {} at {now}s: {} records, {} failures, {} skipped",
            self.ticks, summary.emitted, summary.failures, summary.skipped
        );

        let next = now + self.period;
        if next >= self.stop_time {
            info!(
                "No tick fits before stop time {}s; sampling stopped after {} ticks",
                self.stop_time, self.ticks
            );
            self.state = SchedulerState::Stopped;
            return Ok(None);
        }
        Ok(Some(next))
    }

    /// Externally triggered stop.
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Running {
            info!("Sampling stopped externally after {} ticks", self.ticks);
        }
        self.state = SchedulerState::Stopped;
    }

    fn evaluate_flows(
        &mut self,
        now: f64,
        source: &dyn TrafficStatsSource,
        sink: &mut dyn RecordSink,
    ) -> Result<TickSummary, SinkError> {
        let mut summary = TickSummary::default();

        for flow in source.active_flows() {
            let counters = match source
                .counters(&flow)
                .and_then(|c| c.validate(&flow).map(|_| c))
            {
                Ok(counters) => counters,
                Err(err) => {
                    warn!("Skipping {flow} at {now}s: {err}");
                    summary.skipped += 1;
                    self.skipped += 1;
                    continue;
                }
            };

            let eval = self.pipeline.evaluate(now, flow, &counters);
            let failed = eval.status == FlowStatus::Failure;
            if failed {
                debug!(
                    "{flow} FAILURE: throughput {} (< {}?) delay {} (> {}?)",
                    eval.throughput,
                    eval.thresholds.low_throughput.value,
                    eval.delay,
                    eval.thresholds.high_delay.value
                );
            }

            sink.emit(FlowStatusRecord {
                time: now,
                flow,
                throughput: eval.throughput,
                delay: eval.delay,
                status: eval.status,
                variant: self.variant,
            })?;
            summary.emitted += 1;
            self.records += 1;
            if failed {
                summary.failures += 1;
                self.failures += 1;
            }
        }

        Ok(summary)
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pipeline(&self) -> &FlowPipeline {
        &self.pipeline
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_time
    }
}

use thiserror::Error;

/// Failure to obtain a usable snapshot for one flow in one tick.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no statistics snapshot for flow {0}")]
    Missing(u32),

    #[error("malformed statistics for flow {flow}: {reason}")]
    Malformed { flow: u32, reason: String },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("record sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Monitor settings that would make a run meaningless or never finish.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("sample period must be finite and at least {min}s, got {value}s")]
    SamplePeriod { value: f64, min: f64 },

    #[error("stop time must be finite and non-negative, got {0}s")]
    StopTime(f64),

    #[error("{name} percentile must be within [0, 1], got {value}")]
    Percentile { name: &'static str, value: f64 },
}

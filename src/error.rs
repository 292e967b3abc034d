use thiserror::Error;

/// タイムスリップの操作で発生するエラー。
#[derive(Debug, Error)]
pub enum SlipError {
    #[error("bad Project/Task name format. Expected 'ProjectName.TaskName' format")]
    InvalidName,

    #[error("invalid string, expected one time unit, got {0}")]
    InvalidDurationFormat(usize),

    #[error("invalid time unit, got '{0}'")]
    InvalidTimeUnit(String),

    #[error("unable to process input")]
    InvalidNumber,

    #[error("timeslip is already paused")]
    AlreadyPaused,

    #[error("timeslip is already in progress")]
    AlreadyRunning,

    #[error("only paused timeslips can be changed")]
    NotPaused,

    #[error("timeslip is already completed")]
    AlreadyCompleted,

    #[error("pending timeslip already exists: {0}")]
    PendingExists(String),

    #[error("no pending timeslip found")]
    NoPending,

    #[error("unable to decode timeslip: {0}")]
    Decode(#[from] serde_json::Error),
}

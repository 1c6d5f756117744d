use crate::domain::LessonId;
use crate::manager::SessionHandle;
use crate::score::HardSoftScore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimetableError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionHandle),

    #[error("Incremental score {incremental} disagrees with full rescan {oracle}")]
    InternalScoringMismatch {
        incremental: HardSoftScore,
        oracle: HardSoftScore,
    },

    #[error("Lesson {0} is pinned and cannot be moved")]
    PinnedLesson(LessonId),

    #[error("Scoring fault: {0}")]
    ScoringFault(String),

    #[error("Solver manager is shut down")]
    ShutDown,

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
}

pub type TtResult<T> = Result<T, TimetableError>;

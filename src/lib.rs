pub mod config;
pub mod constraints;
pub mod demo;
pub mod domain;
pub mod error;
pub mod manager;
pub mod optimizer;
pub mod score;
pub mod scorer;
pub mod verifier;

pub use config::{SelectionMode, SolverConfig};
pub use domain::{Assignment, Lesson, LessonId, Room, Timeslot, Timetable};
pub use error::{TimetableError, TtResult};
pub use manager::{SessionHandle, SolverManager, SolverStatus};
pub use score::HardSoftScore;

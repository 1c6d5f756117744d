pub mod anneal;
pub mod construction;
pub mod moves;
pub mod runner;
pub mod selector;

pub use self::moves::Move;
pub use self::runner::{
    BestSolutionListener, Snapshot, SolveOutcome, SolveStats, Solver, TerminationReason,
};
pub use self::selector::MoveSelector;

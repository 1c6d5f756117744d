use super::anneal::Annealer;
use super::construction;
use super::selector::MoveSelector;
use crate::config::SolverConfig;
use crate::constraints;
use crate::domain::{Assignment, Timetable};
use crate::error::{TimetableError, TtResult};
use crate::score::HardSoftScore;
use crate::scorer::IncrementalScorer;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use strum_macros::Display;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Stop requested, or the session was aborted by a scoring fault.
    Stopped,
    TimedOut,
    /// No doable move left, or no improvement within the configured budget.
    Exhausted,
}

/// Best assignment seen so far. Always consistent with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub score: HardSoftScore,
    pub assignments: Vec<Assignment>,
}

impl Snapshot {
    fn capture(tt: &Timetable, score: HardSoftScore) -> Self {
        Self {
            score,
            assignments: tt.assignments(),
        }
    }
}

/// Receives new best solutions from the search loop, on the solving thread.
pub trait BestSolutionListener {
    /// Called once the construction phase has produced the first snapshot.
    fn on_started(&mut self, _snapshot: &Snapshot) {}

    /// Called for each accepted move whose score strictly beats the previous best.
    fn on_new_best(&mut self, snapshot: &Snapshot);
}

impl<F: FnMut(&Snapshot)> BestSolutionListener for F {
    fn on_new_best(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    pub constructed: usize,
    pub steps: u64,
    pub accepted: u64,
    pub improvements: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// The input problem with the best snapshot applied.
    pub timetable: Timetable,
    /// Score of `timetable`. `None` only when the returned timetable could not
    /// be scored at all, in which case `fault` says why.
    pub score: Option<HardSoftScore>,
    pub termination: TerminationReason,
    pub stats: SolveStats,
    /// Set when a scoring fault aborted the search.
    pub fault: Option<String>,
}

pub struct Solver {
    config: SolverConfig,
}

struct Search<'a, L: BestSolutionListener> {
    config: &'a SolverConfig,
    stop: &'a AtomicBool,
    listener: &'a mut L,
    started: Instant,
    best: Option<Snapshot>,
    stats: SolveStats,
}

impl Solver {
    pub fn new(config: SolverConfig) -> TtResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Runs construction followed by local search until one of the
    /// termination conditions holds. `stop` is polled between moves.
    ///
    /// Never fails: a scoring fault ends the run as `Stopped` and the outcome
    /// carries the last consistent best snapshot.
    pub fn solve<L: BestSolutionListener>(
        &self,
        mut tt: Timetable,
        stop: &AtomicBool,
        listener: &mut L,
    ) -> SolveOutcome {
        let mut search = Search {
            config: &self.config,
            stop,
            listener,
            started: Instant::now(),
            best: None,
            stats: SolveStats::default(),
        };
        let result = search.run(&mut tt);
        search.conclude(tt, result)
    }
}

impl<L: BestSolutionListener> Search<'_, L> {
    /// Rolls the timetable back to the best snapshot and turns a fault into a
    /// `Stopped` outcome.
    fn conclude(mut self, mut tt: Timetable, result: TtResult<TerminationReason>) -> SolveOutcome {
        let (mut termination, mut fault) = match result {
            Ok(reason) => (reason, None),
            Err(e) => {
                error!("Search aborted: {}", e);
                (TerminationReason::Stopped, Some(e.to_string()))
            }
        };

        self.stats.elapsed = self.started.elapsed();
        let score = match &self.best {
            Some(best) => {
                tt.restore(&best.assignments);
                Some(best.score)
            }
            None => match constraints::full_score(&tt) {
                Ok(score) => Some(score),
                Err(e) => {
                    error!("Cannot score the returned timetable: {}", e);
                    termination = TerminationReason::Stopped;
                    fault.get_or_insert_with(|| e.to_string());
                    None
                }
            },
        };

        match score {
            Some(score) => info!(
                "Solve finished: {} with {} after {} steps ({} accepted, {} improvements) in {:.2?}",
                termination,
                score,
                self.stats.steps,
                self.stats.accepted,
                self.stats.improvements,
                self.stats.elapsed
            ),
            None => info!(
                "Solve finished: {} without a score after {} steps in {:.2?}",
                termination, self.stats.steps, self.stats.elapsed
            ),
        }

        SolveOutcome {
            timetable: tt,
            score,
            termination,
            stats: self.stats,
            fault,
        }
    }

    fn run(&mut self, tt: &mut Timetable) -> TtResult<TerminationReason> {
        if self.stop.load(Ordering::Acquire) {
            return Ok(TerminationReason::Stopped);
        }

        let mut scorer = IncrementalScorer::new(tt)?;

        if tt.lessons().is_empty() || tt.timeslots().is_empty() || tt.rooms().is_empty() {
            debug!("Nothing to plan");
            self.best = Some(Snapshot::capture(tt, scorer.score()));
            return Ok(TerminationReason::Exhausted);
        }

        self.stats.constructed = construction::construct(tt, &mut scorer)?;
        let initial = Snapshot::capture(tt, scorer.score());
        info!(
            "Construction placed {} lessons, initial score {}",
            self.stats.constructed, initial.score
        );
        self.listener.on_started(&initial);
        self.best = Some(initial);

        let deadline = self.config.time_limit().map(|limit| self.started + limit);
        let mut selector = MoveSelector::new(tt, self.config.selection, self.config.seed);
        let mut annealer = Annealer::new(self.config);
        let mut rng = if let Some(s) = self.config.seed {
            fastrand::Rng::with_seed(s.wrapping_add(9999))
        } else {
            fastrand::Rng::new()
        };

        let mut unimproved = 0u64;
        let mut last_report = Instant::now();
        let mut steps_since_report = 0u64;

        loop {
            if self.stop.load(Ordering::Acquire) {
                return Ok(TerminationReason::Stopped);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(TerminationReason::TimedOut);
            }
            if unimproved >= self.config.max_unimproved_steps
                || self.config.max_steps.is_some_and(|max| self.stats.steps >= max)
            {
                return Ok(TerminationReason::Exhausted);
            }
            let Some(mv) = selector.next_move(tt) else {
                debug!("No doable move left");
                return Ok(TerminationReason::Exhausted);
            };

            self.stats.steps += 1;
            steps_since_report += 1;

            let before = scorer.score();
            let inverse = mv.apply(tt, &mut scorer)?;
            let after = scorer.score();

            if annealer.accepts(before, after, &mut rng) {
                self.stats.accepted += 1;
                if self.best.as_ref().map_or(true, |b| after > b.score) {
                    let snapshot = Snapshot::capture(tt, after);
                    self.listener.on_new_best(&snapshot);
                    self.best = Some(snapshot);
                    self.stats.improvements += 1;
                    unimproved = 0;
                } else {
                    unimproved += 1;
                }
            } else {
                inverse.apply(tt, &mut scorer)?;
                unimproved += 1;
            }
            annealer.cool();

            let interval = self.config.verify_interval;
            if interval > 0 && self.stats.steps % interval == 0 {
                check_consistency(tt, &mut scorer, cfg!(debug_assertions))?;
            }

            let since = last_report.elapsed();
            if since >= Duration::from_secs(1) {
                let best = self.best.as_ref().map_or(HardSoftScore::ZERO, |b| b.score);
                debug!(
                    "step {} best {} current {} temp {:.4} ({:.0} steps/s)",
                    self.stats.steps,
                    best,
                    scorer.score(),
                    annealer.temperature,
                    steps_since_report as f64 / since.as_secs_f64()
                );
                last_report = Instant::now();
                steps_since_report = 0;
            }
        }
    }
}

/// A divergence is a bug: fatal when `strict` (debug builds). Otherwise it is
/// logged and the search continues on the full-rescan scorer.
fn check_consistency(tt: &Timetable, scorer: &mut IncrementalScorer, strict: bool) -> TtResult<()> {
    match scorer.verify(tt) {
        Err(e @ TimetableError::InternalScoringMismatch { .. }) => {
            if strict {
                panic!("{}", e);
            }
            error!("{}", e);
            scorer.fall_back_to_full_rescan(tt)
        }
        other => other,
    }
}

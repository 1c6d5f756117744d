use crate::constraints::{self, ScoreExplanation};
use crate::domain::Timetable;
use crate::error::TtResult;
use crate::score::HardSoftScore;
use tracing::{info, warn};

/// Independent check of a solved timetable against the full-rescan scorer and
/// the problem it was solved from.
pub struct Verifier<'a> {
    problem: &'a Timetable,
}

impl<'a> Verifier<'a> {
    pub fn new(problem: &'a Timetable) -> Self {
        Self { problem }
    }

    /// True when `claimed` is the oracle score of `solved`, the lesson set is
    /// unchanged and every pinned lesson kept its place.
    pub fn verify(&self, solved: &Timetable, claimed: HardSoftScore) -> TtResult<bool> {
        let calculated = constraints::full_score(solved)?;
        if calculated != claimed {
            warn!(
                "Score verification mismatch. Claimed: {}, Calculated: {}",
                claimed, calculated
            );
            return Ok(false);
        }

        if self.problem.lessons().len() != solved.lessons().len() {
            warn!(
                "Lesson count changed: {} -> {}",
                self.problem.lessons().len(),
                solved.lessons().len()
            );
            return Ok(false);
        }

        for (before, after) in self.problem.lessons().iter().zip(solved.lessons()) {
            if before.id != after.id {
                warn!("Lesson order changed at {} / {}", before.id, after.id);
                return Ok(false);
            }
            if before.pinned && before.placement() != after.placement() {
                warn!("Pinned lesson {} was moved", before.id);
                return Ok(false);
            }
        }

        info!("Verification passed: {}", calculated);
        Ok(true)
    }

    pub fn score_details(&self, solved: &Timetable) -> TtResult<ScoreExplanation> {
        constraints::explain(solved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, DemoData};
    use crate::domain::{RoomIdx, TimeslotIdx};

    #[test]
    fn detects_wrong_claim_and_moved_pin() {
        let problem = demo::generate(DemoData::Small, 1).unwrap();
        let verifier = Verifier::new(&problem);
        let score = constraints::full_score(&problem).unwrap();

        assert!(verifier.verify(&problem, score).unwrap());
        assert!(!verifier.verify(&problem, HardSoftScore::of_hard(-1)).unwrap());

        let mut moved = problem.clone();
        moved.set_timeslot(crate::domain::LessonIdx(0), Some(TimeslotIdx(1)));
        moved.set_room(crate::domain::LessonIdx(0), Some(RoomIdx(0)));
        let score = constraints::full_score(&moved).unwrap();
        assert!(!verifier.verify(&moved, score).unwrap());
    }
}

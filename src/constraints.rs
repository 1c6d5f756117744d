//! The six timetabling constraints and the full-rescan oracle.
//!
//! Every constraint is a predicate over an unordered pair of *placed* lessons
//! (both timeslot and room set). A matching pair contributes the constraint's
//! unit weight to its tier. The incremental scorer in [`crate::scorer`] must
//! always agree with [`full_score`].

use crate::domain::{Lesson, Timeslot, Timetable};
use crate::error::TtResult;
use crate::score::HardSoftScore;
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Largest gap (in minutes) between one lesson's end and the next lesson's
/// start for the two to count as back-to-back.
pub const ADJACENCY_WINDOW_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Serialize)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Constraint {
    RoomConflict,
    TeacherConflict,
    StudentGroupConflict,
    TeacherRoomStability,
    TeacherTimeEfficiency,
    StudentGroupSubjectVariety,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum Tier {
    Hard,
    Soft,
}

impl Constraint {
    pub fn tier(self) -> Tier {
        match self {
            Self::RoomConflict | Self::TeacherConflict | Self::StudentGroupConflict => Tier::Hard,
            _ => Tier::Soft,
        }
    }

    /// Score impact of a single matching pair.
    pub fn weight(self) -> HardSoftScore {
        match self {
            Self::RoomConflict | Self::TeacherConflict | Self::StudentGroupConflict => {
                HardSoftScore::of_hard(-1)
            }
            Self::TeacherRoomStability | Self::StudentGroupSubjectVariety => {
                HardSoftScore::of_soft(-1)
            }
            Self::TeacherTimeEfficiency => HardSoftScore::of_soft(1),
        }
    }

    /// Whether the unordered pair `(a, b)` matches. Unplaced lessons never match.
    pub fn matches(self, tt: &Timetable, a: &Lesson, b: &Lesson) -> bool {
        let (Some((ts_a, room_a)), Some((ts_b, room_b))) = (a.placement(), b.placement()) else {
            return false;
        };
        match self {
            Self::RoomConflict => ts_a == ts_b && room_a == room_b,
            Self::TeacherConflict => ts_a == ts_b && a.teacher == b.teacher,
            Self::StudentGroupConflict => ts_a == ts_b && a.student_group == b.student_group,
            Self::TeacherRoomStability => a.teacher == b.teacher && room_a != room_b,
            Self::TeacherTimeEfficiency => {
                a.teacher == b.teacher && back_to_back(tt.timeslot(ts_a), tt.timeslot(ts_b))
            }
            Self::StudentGroupSubjectVariety => {
                a.student_group == b.student_group
                    && a.subject == b.subject
                    && back_to_back(tt.timeslot(ts_a), tt.timeslot(ts_b))
            }
        }
    }
}

/// Same day, and one slot starts within the adjacency window after the other ends.
pub fn back_to_back(a: &Timeslot, b: &Timeslot) -> bool {
    if a.day != b.day {
        return false;
    }
    let within = |gap: i64| (0..=ADJACENCY_WINDOW_MINUTES).contains(&gap);
    within(a.gap_minutes_until(b)) || within(b.gap_minutes_until(a))
}

/// Number of matching pairs for one constraint.
pub fn match_count(constraint: Constraint, tt: &Timetable) -> usize {
    let lessons = tt.lessons();
    let mut count = 0;
    for (i, a) in lessons.iter().enumerate() {
        for b in &lessons[i + 1..] {
            if constraint.matches(tt, a, b) {
                count += 1;
            }
        }
    }
    count
}

/// Score of a single constraint, computed by rescanning every pair.
pub fn constraint_score(constraint: Constraint, tt: &Timetable) -> TtResult<HardSoftScore> {
    let mut score = HardSoftScore::ZERO;
    for _ in 0..match_count(constraint, tt) {
        score = score.checked_add(constraint.weight())?;
    }
    Ok(score)
}

/// Verification oracle: iterates all unordered pairs and every constraint.
pub fn full_score(tt: &Timetable) -> TtResult<HardSoftScore> {
    let lessons = tt.lessons();
    let mut score = HardSoftScore::ZERO;
    for (i, a) in lessons.iter().enumerate() {
        if a.placement().is_none() {
            continue;
        }
        for b in &lessons[i + 1..] {
            for constraint in Constraint::iter() {
                if constraint.matches(tt, a, b) {
                    score = score.checked_add(constraint.weight())?;
                }
            }
        }
    }
    Ok(score)
}

#[derive(Debug, Clone, Serialize)]
pub struct ConstraintMatchTotal {
    pub constraint: Constraint,
    pub tier: Tier,
    pub match_count: usize,
    pub score: HardSoftScore,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreExplanation {
    pub score: HardSoftScore,
    pub constraints: Vec<ConstraintMatchTotal>,
    pub unassigned_lessons: usize,
}

pub fn explain(tt: &Timetable) -> TtResult<ScoreExplanation> {
    let mut total = HardSoftScore::ZERO;
    let mut constraints = Vec::new();
    for constraint in Constraint::iter() {
        let match_count = match_count(constraint, tt);
        let score = constraint_score(constraint, tt)?;
        total = total.checked_add(score)?;
        constraints.push(ConstraintMatchTotal {
            constraint,
            tier: constraint.tier(),
            match_count,
            score,
        });
    }
    Ok(ScoreExplanation {
        score: total,
        constraints,
        unassigned_lessons: tt.unassigned_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn constraint_names_are_camel_case() {
        assert_eq!(Constraint::RoomConflict.to_string(), "roomConflict");
        assert_eq!(
            Constraint::StudentGroupSubjectVariety.to_string(),
            "studentGroupSubjectVariety"
        );
    }

    #[test]
    fn back_to_back_window() {
        let first = Timeslot::one_hour(1, Weekday::Tue, 12, 0).unwrap();
        let next = Timeslot::one_hour(2, Weekday::Tue, 13, 0).unwrap();
        let after_break = Timeslot::one_hour(3, Weekday::Tue, 13, 30).unwrap();
        let late = Timeslot::one_hour(4, Weekday::Tue, 15, 0).unwrap();
        let other_day = Timeslot::one_hour(5, Weekday::Wed, 13, 0).unwrap();

        assert!(back_to_back(&first, &next));
        assert!(back_to_back(&next, &first));
        assert!(back_to_back(&first, &after_break));
        assert!(!back_to_back(&next, &late));
        assert!(!back_to_back(&first, &other_day));
        assert!(!back_to_back(&first, &first));
    }
}

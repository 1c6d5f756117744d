pub mod index;

use self::index::{intern_lessons, remove_member, LessonKeys};
use crate::constraints::{self, back_to_back};
use crate::domain::{LessonIdx, RoomIdx, Timeslot, TimeslotIdx, Timetable};
use crate::error::{TimetableError, TtResult};
use crate::score::HardSoftScore;
use chrono::Weekday;
use fnv::FnvHashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    Incremental,
    /// Entered after a verified mismatch: every settled move rescans all pairs.
    FullRescan,
}

/// Maintains the running (hard, soft) total while lessons are retracted from
/// and re-inserted into the grouping indices.
///
/// Only placed lessons are indexed. The contribution of a lesson is the sum of
/// every pair it forms with the other indexed lessons, so retracting subtracts
/// exactly what inserting added.
#[derive(Debug, Clone)]
pub struct IncrementalScorer {
    score: HardSoftScore,
    mode: ScoringMode,

    keys: Vec<LessonKeys>,
    room_count: usize,

    // What the indices currently hold for each lesson.
    placed: Vec<Option<(TimeslotIdx, RoomIdx)>>,

    by_timeslot: Vec<Vec<LessonIdx>>,
    teacher_total: Vec<u32>,
    // teacher * room_count + room
    teacher_room: Vec<u32>,
    by_teacher_day: FnvHashMap<(u32, Weekday), Vec<LessonIdx>>,
    by_group_subject_day: FnvHashMap<(u32, u32, Weekday), Vec<LessonIdx>>,
}

impl IncrementalScorer {
    pub fn new(tt: &Timetable) -> TtResult<Self> {
        let (keys, teacher_count) = intern_lessons(tt);
        let room_count = tt.rooms().len();

        let mut scorer = Self {
            score: HardSoftScore::ZERO,
            mode: ScoringMode::Incremental,
            keys,
            room_count,
            placed: vec![None; tt.lessons().len()],
            by_timeslot: vec![Vec::new(); tt.timeslots().len()],
            teacher_total: vec![0; teacher_count],
            teacher_room: vec![0; teacher_count * room_count],
            by_teacher_day: FnvHashMap::default(),
            by_group_subject_day: FnvHashMap::default(),
        };

        for lesson in tt.lesson_indices() {
            scorer.insert(tt, lesson)?;
        }
        Ok(scorer)
    }

    pub fn score(&self) -> HardSoftScore {
        self.score
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    /// Removes `lesson` from the indices, subtracting every pair it formed.
    /// Must be called while the timetable still holds the old values.
    pub fn retract(&mut self, tt: &Timetable, lesson: LessonIdx) -> TtResult<()> {
        let Some((ts, room)) = self.placed_at(lesson)? else {
            return Ok(());
        };
        let contribution = self.contribution_at(tt, lesson, ts, room)?;
        self.score = self.score.checked_sub(contribution)?;
        self.unindex(tt, lesson, ts, room)?;
        Ok(())
    }

    /// Indexes `lesson` with its current timetable values, adding every pair it forms.
    pub fn insert(&mut self, tt: &Timetable, lesson: LessonIdx) -> TtResult<()> {
        if self.placed_at(lesson)?.is_some() {
            return Err(TimetableError::ScoringFault(format!(
                "lesson index {} inserted twice",
                lesson.0
            )));
        }
        let Some((ts, room)) = tt.lesson(lesson).placement() else {
            return Ok(());
        };
        let contribution = self.contribution_at(tt, lesson, ts, room)?;
        self.score = self.score.checked_add(contribution)?;
        self.index(tt, lesson, ts, room)?;
        Ok(())
    }

    /// Called once a move is fully applied. A no-op unless rescanning.
    pub fn settle(&mut self, tt: &Timetable) -> TtResult<()> {
        if self.mode == ScoringMode::FullRescan {
            self.score = constraints::full_score(tt)?;
        }
        Ok(())
    }

    /// Score change from placing an unindexed `lesson` at `(ts, room)`.
    pub fn placement_delta(
        &self,
        tt: &Timetable,
        lesson: LessonIdx,
        ts: TimeslotIdx,
        room: RoomIdx,
    ) -> TtResult<HardSoftScore> {
        self.contribution_at(tt, lesson, ts, room)
    }

    /// Compares the running total with the full-rescan oracle.
    pub fn verify(&self, tt: &Timetable) -> TtResult<()> {
        let oracle = constraints::full_score(tt)?;
        if oracle != self.score {
            return Err(TimetableError::InternalScoringMismatch {
                incremental: self.score,
                oracle,
            });
        }
        Ok(())
    }

    pub fn fall_back_to_full_rescan(&mut self, tt: &Timetable) -> TtResult<()> {
        if self.mode != ScoringMode::FullRescan {
            warn!("Switching session to full rescoring");
        }
        self.mode = ScoringMode::FullRescan;
        self.score = constraints::full_score(tt)?;
        Ok(())
    }

    fn placed_at(&self, lesson: LessonIdx) -> TtResult<Option<(TimeslotIdx, RoomIdx)>> {
        self.placed
            .get(lesson.0)
            .copied()
            .ok_or_else(|| out_of_range("lesson", lesson.0))
    }

    fn keys_of(&self, lesson: LessonIdx) -> TtResult<LessonKeys> {
        self.keys
            .get(lesson.0)
            .copied()
            .ok_or_else(|| out_of_range("lesson", lesson.0))
    }

    fn teacher_room_slot(&self, teacher: u32, room: RoomIdx) -> TtResult<usize> {
        if room.0 >= self.room_count {
            return Err(out_of_range("room", room.0));
        }
        Ok(teacher as usize * self.room_count + room.0)
    }

    /// Sum over every indexed lesson other than `lesson` of the pair score
    /// `lesson` would form when placed at `(ts, room)`.
    fn contribution_at(
        &self,
        tt: &Timetable,
        lesson: LessonIdx,
        ts: TimeslotIdx,
        room: RoomIdx,
    ) -> TtResult<HardSoftScore> {
        let me = self.keys_of(lesson)?;
        let slot = tt
            .timeslots()
            .get(ts.0)
            .ok_or_else(|| out_of_range("timeslot", ts.0))?;
        let mut hard: i64 = 0;
        let mut soft: i64 = 0;

        // Hard tier: only lessons sharing the timeslot can clash.
        let same_slot = self
            .by_timeslot
            .get(ts.0)
            .ok_or_else(|| out_of_range("timeslot", ts.0))?;
        for &other in same_slot {
            if other == lesson {
                continue;
            }
            let them = self.keys_of(other)?;
            let Some((_, other_room)) = self.placed_at(other)? else {
                continue;
            };
            if other_room == room {
                hard -= 1;
            }
            if them.teacher == me.teacher {
                hard -= 1;
            }
            if them.group == me.group {
                hard -= 1;
            }
        }

        // Room stability: every other lesson of the teacher outside this room.
        let self_indexed = self.placed_at(lesson)?;
        let teacher_total = *self
            .teacher_total
            .get(me.teacher as usize)
            .ok_or_else(|| out_of_range("teacher", me.teacher as usize))?;
        let same_room = self.teacher_room[self.teacher_room_slot(me.teacher, room)?];
        let (own_total, own_room) = match self_indexed {
            Some((_, r)) => (1, u32::from(r == room)),
            None => (0, 0),
        };
        soft -= i64::from((teacher_total - own_total) - (same_room - own_room));

        if let Some(bucket) = self.by_teacher_day.get(&(me.teacher, slot.day)) {
            for &other in bucket {
                if other == lesson {
                    continue;
                }
                if self.adjacent_to(tt, other, slot)? {
                    soft += 1;
                }
            }
        }

        if let Some(bucket) = self.by_group_subject_day.get(&(me.group, me.subject, slot.day)) {
            for &other in bucket {
                if other == lesson {
                    continue;
                }
                if self.adjacent_to(tt, other, slot)? {
                    soft -= 1;
                }
            }
        }

        Ok(HardSoftScore::new(hard, soft))
    }

    fn adjacent_to(
        &self,
        tt: &Timetable,
        other: LessonIdx,
        slot: &Timeslot,
    ) -> TtResult<bool> {
        let Some((other_ts, _)) = self.placed_at(other)? else {
            return Ok(false);
        };
        let other_slot = tt
            .timeslots()
            .get(other_ts.0)
            .ok_or_else(|| out_of_range("timeslot", other_ts.0))?;
        Ok(back_to_back(slot, other_slot))
    }

    fn index(
        &mut self,
        tt: &Timetable,
        lesson: LessonIdx,
        ts: TimeslotIdx,
        room: RoomIdx,
    ) -> TtResult<()> {
        let keys = self.keys_of(lesson)?;
        let day = tt.timeslot(ts).day;
        let tr = self.teacher_room_slot(keys.teacher, room)?;

        self.by_timeslot
            .get_mut(ts.0)
            .ok_or_else(|| out_of_range("timeslot", ts.0))?
            .push(lesson);
        self.teacher_total[keys.teacher as usize] += 1;
        self.teacher_room[tr] += 1;
        self.by_teacher_day
            .entry((keys.teacher, day))
            .or_default()
            .push(lesson);
        self.by_group_subject_day
            .entry((keys.group, keys.subject, day))
            .or_default()
            .push(lesson);
        self.placed[lesson.0] = Some((ts, room));
        Ok(())
    }

    fn unindex(
        &mut self,
        tt: &Timetable,
        lesson: LessonIdx,
        ts: TimeslotIdx,
        room: RoomIdx,
    ) -> TtResult<()> {
        let keys = self.keys_of(lesson)?;
        let day = tt.timeslot(ts).day;
        let tr = self.teacher_room_slot(keys.teacher, room)?;

        let found = self
            .by_timeslot
            .get_mut(ts.0)
            .is_some_and(|bucket| remove_member(bucket, lesson))
            && self
                .by_teacher_day
                .get_mut(&(keys.teacher, day))
                .is_some_and(|bucket| remove_member(bucket, lesson))
            && self
                .by_group_subject_day
                .get_mut(&(keys.group, keys.subject, day))
                .is_some_and(|bucket| remove_member(bucket, lesson));
        if !found {
            return Err(TimetableError::ScoringFault(format!(
                "lesson index {} missing from grouping index",
                lesson.0
            )));
        }
        self.teacher_total[keys.teacher as usize] -= 1;
        self.teacher_room[tr] -= 1;
        self.placed[lesson.0] = None;
        Ok(())
    }
}

fn out_of_range(what: &str, idx: usize) -> TimetableError {
    TimetableError::ScoringFault(format!("{} index {} out of range", what, idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, DemoData};

    #[test]
    fn initial_score_matches_oracle() {
        let mut tt = demo::generate(DemoData::Small, 1).unwrap();
        // Pile everything into the first slot and room for lots of conflicts.
        for idx in tt.movable_lessons() {
            tt.set_timeslot(idx, Some(TimeslotIdx(idx.0 % 3)));
            tt.set_room(idx, Some(RoomIdx(0)));
        }
        let scorer = IncrementalScorer::new(&tt).unwrap();
        assert_eq!(scorer.score(), constraints::full_score(&tt).unwrap());
        assert!(scorer.score().hard < 0);
    }

    #[test]
    fn mismatch_is_detected_and_rescan_recovers() {
        let tt = demo::generate(DemoData::Small, 1).unwrap();
        let mut scorer = IncrementalScorer::new(&tt).unwrap();
        scorer.score = HardSoftScore::new(-42, 0);

        let err = scorer.verify(&tt).unwrap_err();
        assert!(matches!(err, TimetableError::InternalScoringMismatch { .. }));

        scorer.fall_back_to_full_rescan(&tt).unwrap();
        assert_eq!(scorer.mode(), ScoringMode::FullRescan);
        assert!(scorer.verify(&tt).is_ok());
    }

    #[test]
    fn double_insert_is_a_fault() {
        let tt = demo::generate(DemoData::Small, 1).unwrap();
        let mut scorer = IncrementalScorer::new(&tt).unwrap();
        // Lesson 0 is pinned and therefore placed and indexed.
        assert!(matches!(
            scorer.insert(&tt, LessonIdx(0)),
            Err(TimetableError::ScoringFault(_))
        ));
    }
}

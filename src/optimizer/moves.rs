use crate::domain::{LessonIdx, RoomIdx, TimeslotIdx, Timetable};
use crate::error::{TimetableError, TtResult};
use crate::scorer::IncrementalScorer;
use serde::{Deserialize, Serialize};

/// An atomic, reversible change to the planning variables.
///
/// [`Move::apply`] returns the inverse move, which carries the prior values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    ChangeTimeslot {
        lesson: LessonIdx,
        to: Option<TimeslotIdx>,
    },
    ChangeRoom {
        lesson: LessonIdx,
        to: Option<RoomIdx>,
    },
    /// Exchanges both the timeslot and the room of two lessons.
    SwapAssignment { a: LessonIdx, b: LessonIdx },
}

impl Move {
    /// False for moves that would change nothing or touch a pinned lesson.
    pub fn is_doable(&self, tt: &Timetable) -> bool {
        match *self {
            Move::ChangeTimeslot { lesson, to } => {
                let l = tt.lesson(lesson);
                !l.pinned && l.timeslot != to
            }
            Move::ChangeRoom { lesson, to } => {
                let l = tt.lesson(lesson);
                !l.pinned && l.room != to
            }
            Move::SwapAssignment { a, b } => {
                let (la, lb) = (tt.lesson(a), tt.lesson(b));
                a != b
                    && !la.pinned
                    && !lb.pinned
                    && (la.timeslot, la.room) != (lb.timeslot, lb.room)
            }
        }
    }

    /// Applies the move to both the timetable and the scorer and returns its inverse.
    ///
    /// On error the timetable may be left mid-move; callers treat scoring
    /// faults as fatal for the session.
    pub fn apply(&self, tt: &mut Timetable, scorer: &mut IncrementalScorer) -> TtResult<Move> {
        let inverse = match *self {
            Move::ChangeTimeslot { lesson, to } => {
                ensure_unpinned(tt, lesson)?;
                let from = tt.lesson(lesson).timeslot;
                scorer.retract(tt, lesson)?;
                tt.set_timeslot(lesson, to);
                scorer.insert(tt, lesson)?;
                Move::ChangeTimeslot { lesson, to: from }
            }
            Move::ChangeRoom { lesson, to } => {
                ensure_unpinned(tt, lesson)?;
                let from = tt.lesson(lesson).room;
                scorer.retract(tt, lesson)?;
                tt.set_room(lesson, to);
                scorer.insert(tt, lesson)?;
                Move::ChangeRoom { lesson, to: from }
            }
            Move::SwapAssignment { a, b } => {
                ensure_unpinned(tt, a)?;
                ensure_unpinned(tt, b)?;
                if a == b {
                    return Ok(*self);
                }
                let (ts_a, room_a) = (tt.lesson(a).timeslot, tt.lesson(a).room);
                let (ts_b, room_b) = (tt.lesson(b).timeslot, tt.lesson(b).room);
                scorer.retract(tt, a)?;
                scorer.retract(tt, b)?;
                tt.set_timeslot(a, ts_b);
                tt.set_room(a, room_b);
                tt.set_timeslot(b, ts_a);
                tt.set_room(b, room_a);
                scorer.insert(tt, a)?;
                scorer.insert(tt, b)?;
                *self
            }
        };
        scorer.settle(tt)?;
        Ok(inverse)
    }

    pub fn lessons(&self) -> (LessonIdx, Option<LessonIdx>) {
        match *self {
            Move::ChangeTimeslot { lesson, .. } | Move::ChangeRoom { lesson, .. } => (lesson, None),
            Move::SwapAssignment { a, b } => (a, Some(b)),
        }
    }
}

fn ensure_unpinned(tt: &Timetable, lesson: LessonIdx) -> TtResult<()> {
    let l = tt.lesson(lesson);
    if l.pinned {
        return Err(TimetableError::PinnedLesson(l.id));
    }
    Ok(())
}

use crate::error::{TimetableError, TtResult};
use chrono::{NaiveTime, Weekday};
use fnv::{FnvHashMap, FnvHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque external key of a lesson (typically a database id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(pub u64);

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a lesson in the timetable's lesson arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonIdx(pub usize);

/// Position of a timeslot in the timetable's timeslot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeslotIdx(pub usize);

/// Position of a room in the timetable's room table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomIdx(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeslot {
    pub id: u64,
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Timeslot {
    pub fn new(id: u64, day: Weekday, start: NaiveTime, end: NaiveTime) -> TtResult<Self> {
        if end <= start {
            return Err(TimetableError::InvalidProblem(format!(
                "timeslot {} ends ({}) before it starts ({})",
                id, end, start
            )));
        }
        Ok(Self { id, day, start, end })
    }

    /// A one hour slot starting at `hour:minute`.
    pub fn one_hour(id: u64, day: Weekday, hour: u32, minute: u32) -> TtResult<Self> {
        let start = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            TimetableError::InvalidProblem(format!("invalid start time {}:{}", hour, minute))
        })?;
        let end = NaiveTime::from_hms_opt(hour + 1, minute, 0).ok_or_else(|| {
            TimetableError::InvalidProblem(format!("slot at {}:{} crosses midnight", hour, minute))
        })?;
        Self::new(id, day, start, end)
    }

    /// Minutes between the end of `self` and the start of `next`, negative on overlap.
    pub fn gap_minutes_until(&self, next: &Timeslot) -> i64 {
        (next.start - self.end).num_minutes()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: u64,
    pub name: String,
}

impl Room {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub subject: String,
    pub teacher: String,
    pub student_group: String,
    #[serde(default)]
    pub timeslot: Option<TimeslotIdx>,
    #[serde(default)]
    pub room: Option<RoomIdx>,
    #[serde(default)]
    pub pinned: bool,
}

impl Lesson {
    pub fn new(
        id: u64,
        subject: impl Into<String>,
        teacher: impl Into<String>,
        student_group: impl Into<String>,
    ) -> Self {
        Self {
            id: LessonId(id),
            subject: subject.into(),
            teacher: teacher.into(),
            student_group: student_group.into(),
            timeslot: None,
            room: None,
            pinned: false,
        }
    }

    pub fn assigned(mut self, timeslot: usize, room: usize) -> Self {
        self.timeslot = Some(TimeslotIdx(timeslot));
        self.room = Some(RoomIdx(room));
        self
    }

    pub fn pin(mut self) -> Self {
        self.pinned = true;
        self
    }

    /// Both planning variables set; only such lessons take part in scoring.
    pub fn placement(&self) -> Option<(TimeslotIdx, RoomIdx)> {
        match (self.timeslot, self.room) {
            (Some(t), Some(r)) => Some((t, r)),
            _ => None,
        }
    }
}

/// Shallow record of one lesson's planning variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub lesson: LessonId,
    pub timeslot: Option<TimeslotIdx>,
    pub room: Option<RoomIdx>,
}

#[derive(Serialize, Deserialize)]
struct TimetableData {
    timeslots: Vec<Timeslot>,
    rooms: Vec<Room>,
    lessons: Vec<Lesson>,
}

/// One tenant's problem instance. Owns the lessons; timeslots and rooms are
/// facts addressed by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TimetableData", into = "TimetableData")]
pub struct Timetable {
    timeslots: Vec<Timeslot>,
    rooms: Vec<Room>,
    lessons: Vec<Lesson>,
}

impl TryFrom<TimetableData> for Timetable {
    type Error = TimetableError;

    fn try_from(data: TimetableData) -> TtResult<Self> {
        Timetable::new(data.timeslots, data.rooms, data.lessons)
    }
}

impl From<Timetable> for TimetableData {
    fn from(tt: Timetable) -> Self {
        Self {
            timeslots: tt.timeslots,
            rooms: tt.rooms,
            lessons: tt.lessons,
        }
    }
}

impl Timetable {
    pub fn new(timeslots: Vec<Timeslot>, rooms: Vec<Room>, lessons: Vec<Lesson>) -> TtResult<Self> {
        let tt = Self {
            timeslots,
            rooms,
            lessons,
        };
        tt.validate()?;
        Ok(tt)
    }

    /// Checks that every reference resolves inside this timetable, lesson ids
    /// are unique and pinned lessons are fully assigned.
    pub fn validate(&self) -> TtResult<()> {
        for ts in &self.timeslots {
            if ts.end <= ts.start {
                return Err(TimetableError::InvalidProblem(format!(
                    "timeslot {} has a non-positive duration",
                    ts.id
                )));
            }
        }

        let mut seen = FnvHashSet::default();
        for lesson in &self.lessons {
            if !seen.insert(lesson.id) {
                return Err(TimetableError::InvalidProblem(format!(
                    "duplicate lesson identity {}",
                    lesson.id
                )));
            }
            check_refs(
                lesson.id,
                lesson.timeslot,
                lesson.room,
                self.timeslots.len(),
                self.rooms.len(),
            )?;
            if lesson.pinned && lesson.placement().is_none() {
                return Err(TimetableError::InvalidProblem(format!(
                    "lesson {} is pinned but not fully assigned",
                    lesson.id
                )));
            }
        }
        Ok(())
    }

    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> TtResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn timeslots(&self) -> &[Timeslot] {
        &self.timeslots
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn lesson(&self, idx: LessonIdx) -> &Lesson {
        &self.lessons[idx.0]
    }

    pub fn timeslot(&self, idx: TimeslotIdx) -> &Timeslot {
        &self.timeslots[idx.0]
    }

    pub fn room(&self, idx: RoomIdx) -> &Room {
        &self.rooms[idx.0]
    }

    pub(crate) fn set_timeslot(&mut self, idx: LessonIdx, timeslot: Option<TimeslotIdx>) {
        self.lessons[idx.0].timeslot = timeslot;
    }

    pub(crate) fn set_room(&mut self, idx: LessonIdx, room: Option<RoomIdx>) {
        self.lessons[idx.0].room = room;
    }

    pub fn lesson_indices(&self) -> impl Iterator<Item = LessonIdx> {
        (0..self.lessons.len()).map(LessonIdx)
    }

    /// Lessons that moves and the construction heuristic may touch.
    pub fn movable_lessons(&self) -> Vec<LessonIdx> {
        self.lesson_indices()
            .filter(|&i| !self.lesson(i).pinned)
            .collect()
    }

    pub fn unassigned_count(&self) -> usize {
        self.lessons
            .iter()
            .filter(|l| l.placement().is_none())
            .count()
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        self.lessons
            .iter()
            .map(|l| Assignment {
                lesson: l.id,
                timeslot: l.timeslot,
                room: l.room,
            })
            .collect()
    }

    /// Re-applies a previously persisted (possibly partial) assignment.
    /// Lessons not mentioned keep their values; pinned lessons are never changed.
    pub fn resume_from(&mut self, assignments: &[Assignment]) -> TtResult<()> {
        let index: FnvHashMap<LessonId, usize> = self
            .lessons
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id, i))
            .collect();

        let mut resolved = Vec::with_capacity(assignments.len());
        for a in assignments {
            let idx = *index.get(&a.lesson).ok_or_else(|| {
                TimetableError::InvalidProblem(format!("unknown lesson {} in assignment", a.lesson))
            })?;
            check_refs(a.lesson, a.timeslot, a.room, self.timeslots.len(), self.rooms.len())?;
            resolved.push((idx, a));
        }

        for (idx, a) in resolved {
            let lesson = &mut self.lessons[idx];
            if lesson.pinned {
                continue;
            }
            lesson.timeslot = a.timeslot;
            lesson.room = a.room;
        }
        Ok(())
    }

    /// Copies index-aligned assignments back into the arena. Used for snapshots
    /// taken from this very timetable, so ids are not re-resolved.
    pub(crate) fn restore(&mut self, assignments: &[Assignment]) {
        for (lesson, a) in self.lessons.iter_mut().zip(assignments) {
            debug_assert_eq!(lesson.id, a.lesson);
            lesson.timeslot = a.timeslot;
            lesson.room = a.room;
        }
    }
}

fn check_refs(
    lesson: LessonId,
    timeslot: Option<TimeslotIdx>,
    room: Option<RoomIdx>,
    timeslot_count: usize,
    room_count: usize,
) -> TtResult<()> {
    if let Some(t) = timeslot {
        if t.0 >= timeslot_count {
            return Err(TimetableError::InvalidProblem(format!(
                "lesson {} references unknown timeslot index {}",
                lesson, t.0
            )));
        }
    }
    if let Some(r) = room {
        if r.0 >= room_count {
            return Err(TimetableError::InvalidProblem(format!(
                "lesson {} references unknown room index {}",
                lesson, r.0
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots() -> Vec<Timeslot> {
        vec![
            Timeslot::one_hour(1, Weekday::Mon, 8, 30).unwrap(),
            Timeslot::one_hour(2, Weekday::Mon, 9, 30).unwrap(),
        ]
    }

    #[test]
    fn rejects_duplicate_lesson_ids() {
        let lessons = vec![
            Lesson::new(1, "Math", "A. Turing", "9th grade"),
            Lesson::new(1, "Physics", "M. Curie", "9th grade"),
        ];
        let err = Timetable::new(slots(), vec![Room::new(1, "Room A")], lessons).unwrap_err();
        assert!(matches!(err, TimetableError::InvalidProblem(_)));
    }

    #[test]
    fn rejects_dangling_room() {
        let lessons = vec![Lesson::new(1, "Math", "A. Turing", "9th grade").assigned(0, 3)];
        let err = Timetable::new(slots(), vec![Room::new(1, "Room A")], lessons).unwrap_err();
        assert!(matches!(err, TimetableError::InvalidProblem(_)));
    }

    #[test]
    fn rejects_unassigned_pin() {
        let lessons = vec![Lesson::new(1, "Math", "A. Turing", "9th grade").pin()];
        assert!(Timetable::new(slots(), vec![Room::new(1, "Room A")], lessons).is_err());
    }

    #[test]
    fn gap_between_back_to_back_slots_is_zero() {
        let s = slots();
        assert_eq!(s[0].gap_minutes_until(&s[1]), 0);
        assert_eq!(s[1].gap_minutes_until(&s[0]), -120);
    }

    #[test]
    fn resume_keeps_pinned_values() {
        let lessons = vec![
            Lesson::new(1, "Math", "A. Turing", "9th grade").assigned(0, 0).pin(),
            Lesson::new(2, "Physics", "M. Curie", "9th grade"),
        ];
        let mut tt = Timetable::new(slots(), vec![Room::new(1, "Room A")], lessons).unwrap();
        tt.resume_from(&[
            Assignment {
                lesson: LessonId(1),
                timeslot: Some(TimeslotIdx(1)),
                room: Some(RoomIdx(0)),
            },
            Assignment {
                lesson: LessonId(2),
                timeslot: Some(TimeslotIdx(1)),
                room: None,
            },
        ])
        .unwrap();
        assert_eq!(tt.lessons()[0].timeslot, Some(TimeslotIdx(0)));
        assert_eq!(tt.lessons()[1].timeslot, Some(TimeslotIdx(1)));
        assert_eq!(tt.lessons()[1].room, None);
    }

    #[test]
    fn json_round_trip_revalidates() {
        let lessons = vec![Lesson::new(1, "Math", "A. Turing", "9th grade").assigned(1, 0)];
        let tt = Timetable::new(slots(), vec![Room::new(1, "Room A")], lessons).unwrap();
        let json = serde_json::to_string(&tt).unwrap();
        let back: Timetable = serde_json::from_str(&json).unwrap();
        assert_eq!(tt, back);

        let broken = json.replace("\"room\":0", "\"room\":9");
        assert!(serde_json::from_str::<Timetable>(&broken).is_err());
    }
}

use super::moves::Move;
use crate::config::SelectionMode;
use crate::domain::{LessonIdx, RoomIdx, TimeslotIdx, Timetable};
use fastrand::Rng;

const RANDOM_ATTEMPTS: usize = 64;

/// Produces candidate moves for the search loop.
///
/// The ordered mode walks a fixed enumeration (per movable lesson ascending:
/// every timeslot, then every room; afterwards every lesson pair) and wraps
/// around, skipping moves that are not doable in the current state. The random
/// mode samples from the same neighbourhood with a seeded generator.
pub struct MoveSelector {
    mode: SelectionMode,
    movable: Vec<LessonIdx>,
    timeslot_count: usize,
    room_count: usize,
    cursor: usize,
    rng: Rng,
}

impl MoveSelector {
    pub fn new(tt: &Timetable, mode: SelectionMode, seed: Option<u64>) -> Self {
        let rng = if let Some(s) = seed {
            Rng::with_seed(s)
        } else {
            Rng::new()
        };
        Self {
            mode,
            movable: tt.movable_lessons(),
            timeslot_count: tt.timeslots().len(),
            room_count: tt.rooms().len(),
            cursor: 0,
            rng,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Size of the ordered enumeration, doable or not.
    pub fn neighbourhood_size(&self) -> usize {
        let m = self.movable.len();
        m * (self.timeslot_count + self.room_count) + m * m.saturating_sub(1) / 2
    }

    /// Restarts the ordered enumeration from its first move.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Next doable move, or `None` when the neighbourhood has none.
    pub fn next_move(&mut self, tt: &Timetable) -> Option<Move> {
        match self.mode {
            SelectionMode::Ordered => self.next_ordered(tt),
            SelectionMode::Random => self.sample(tt),
        }
    }

    /// One pass over the ordered enumeration, without wrapping.
    pub fn ordered_moves<'a>(&self, tt: &'a Timetable) -> impl Iterator<Item = Move> + 'a {
        let walker = Walker {
            movable: self.movable.clone(),
            timeslot_count: self.timeslot_count,
            room_count: self.room_count,
        };
        (0..self.neighbourhood_size())
            .filter_map(move |pos| walker.decode(pos))
            .filter(move |mv| mv.is_doable(tt))
    }

    fn next_ordered(&mut self, tt: &Timetable) -> Option<Move> {
        let total = self.neighbourhood_size();
        if total == 0 {
            return None;
        }
        let walker = Walker {
            movable: std::mem::take(&mut self.movable),
            timeslot_count: self.timeslot_count,
            room_count: self.room_count,
        };
        let mut found = None;
        for _ in 0..total {
            let pos = self.cursor;
            self.cursor = (self.cursor + 1) % total;
            if let Some(mv) = walker.decode(pos) {
                if mv.is_doable(tt) {
                    found = Some(mv);
                    break;
                }
            }
        }
        self.movable = walker.movable;
        found
    }

    fn sample(&mut self, tt: &Timetable) -> Option<Move> {
        if self.movable.is_empty() || (self.timeslot_count == 0 && self.room_count == 0) {
            return None;
        }
        for _ in 0..RANDOM_ATTEMPTS {
            let lesson = self.movable[self.rng.usize(0..self.movable.len())];
            let roll = self.rng.u8(0..10);
            let mv = if roll < 4 && self.timeslot_count > 0 {
                Move::ChangeTimeslot {
                    lesson,
                    to: Some(TimeslotIdx(self.rng.usize(0..self.timeslot_count))),
                }
            } else if roll < 7 && self.room_count > 0 {
                Move::ChangeRoom {
                    lesson,
                    to: Some(RoomIdx(self.rng.usize(0..self.room_count))),
                }
            } else if self.movable.len() > 1 {
                let other = self.movable[self.rng.usize(0..self.movable.len())];
                Move::SwapAssignment {
                    a: lesson,
                    b: other,
                }
            } else {
                continue;
            };
            if mv.is_doable(tt) {
                return Some(mv);
            }
        }
        None
    }
}

struct Walker {
    movable: Vec<LessonIdx>,
    timeslot_count: usize,
    room_count: usize,
}

impl Walker {
    fn decode(&self, pos: usize) -> Option<Move> {
        let per_lesson = self.timeslot_count + self.room_count;
        let change_block = self.movable.len() * per_lesson;

        if pos < change_block {
            let lesson = self.movable[pos / per_lesson];
            let k = pos % per_lesson;
            return Some(if k < self.timeslot_count {
                Move::ChangeTimeslot {
                    lesson,
                    to: Some(TimeslotIdx(k)),
                }
            } else {
                Move::ChangeRoom {
                    lesson,
                    to: Some(RoomIdx(k - self.timeslot_count)),
                }
            });
        }

        // Row i of the pair triangle holds (i, i+1) .. (i, m-1).
        let mut rest = pos - change_block;
        let m = self.movable.len();
        for i in 0..m {
            let row = m - 1 - i;
            if rest < row {
                return Some(Move::SwapAssignment {
                    a: self.movable[i],
                    b: self.movable[i + 1 + rest],
                });
            }
            rest -= row;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Lesson, Room, Timeslot};
    use chrono::Weekday;

    fn tiny() -> Timetable {
        let slots = vec![
            Timeslot::one_hour(1, Weekday::Mon, 8, 30).unwrap(),
            Timeslot::one_hour(2, Weekday::Mon, 9, 30).unwrap(),
        ];
        let rooms = vec![Room::new(1, "A"), Room::new(2, "B")];
        let lessons = vec![
            Lesson::new(1, "Math", "T1", "G1").assigned(0, 0).pin(),
            Lesson::new(2, "Math", "T1", "G1").assigned(0, 0),
            Lesson::new(3, "Art", "T2", "G1").assigned(1, 1),
        ];
        Timetable::new(slots, rooms, lessons).unwrap()
    }

    #[test]
    fn ordered_enumeration_is_fixed() {
        let tt = tiny();
        let selector = MoveSelector::new(&tt, SelectionMode::Ordered, None);
        let moves: Vec<Move> = selector.ordered_moves(&tt).collect();
        assert_eq!(
            moves,
            vec![
                Move::ChangeTimeslot {
                    lesson: LessonIdx(1),
                    to: Some(TimeslotIdx(1))
                },
                Move::ChangeRoom {
                    lesson: LessonIdx(1),
                    to: Some(RoomIdx(1))
                },
                Move::ChangeTimeslot {
                    lesson: LessonIdx(2),
                    to: Some(TimeslotIdx(0))
                },
                Move::ChangeRoom {
                    lesson: LessonIdx(2),
                    to: Some(RoomIdx(0))
                },
                Move::SwapAssignment {
                    a: LessonIdx(1),
                    b: LessonIdx(2)
                },
            ]
        );
    }

    #[test]
    fn ordered_mode_wraps_around() {
        let tt = tiny();
        let mut selector = MoveSelector::new(&tt, SelectionMode::Ordered, None);
        let first: Vec<Move> = (0..5).filter_map(|_| selector.next_move(&tt)).collect();
        let again = selector.next_move(&tt);
        assert_eq!(again, Some(first[0]));
        selector.reset();
        assert_eq!(selector.next_move(&tt), Some(first[0]));
    }

    #[test]
    fn random_mode_is_reproducible_and_skips_pins() {
        let tt = tiny();
        let mut a = MoveSelector::new(&tt, SelectionMode::Random, Some(42));
        let mut b = MoveSelector::new(&tt, SelectionMode::Random, Some(42));
        for _ in 0..100 {
            let mv = a.next_move(&tt);
            assert_eq!(mv, b.next_move(&tt));
            let mv = mv.unwrap();
            let (x, y) = mv.lessons();
            assert_ne!(x, LessonIdx(0));
            assert_ne!(y, Some(LessonIdx(0)));
        }
    }

    #[test]
    fn nothing_to_move() {
        let tt = Timetable::new(vec![], vec![], vec![]).unwrap();
        let mut selector = MoveSelector::new(&tt, SelectionMode::Random, Some(1));
        assert_eq!(selector.next_move(&tt), None);
        let mut selector = MoveSelector::new(&tt, SelectionMode::Ordered, Some(1));
        assert_eq!(selector.next_move(&tt), None);
    }
}

#![allow(dead_code)]

use chrono::Weekday;
use timetabler::config::SolverConfig;
use timetabler::domain::{Lesson, Room, Timeslot, Timetable};

/// Monday 12:00, then Tuesday 12:00, 13:00 and 15:00 (one hour each).
pub fn timeslots() -> Vec<Timeslot> {
    vec![
        Timeslot::one_hour(1, Weekday::Mon, 12, 0).unwrap(),
        Timeslot::one_hour(2, Weekday::Tue, 12, 0).unwrap(),
        Timeslot::one_hour(3, Weekday::Tue, 13, 0).unwrap(),
        Timeslot::one_hour(4, Weekday::Tue, 15, 0).unwrap(),
    ]
}

pub fn rooms() -> Vec<Room> {
    vec![
        Room::new(1, "Room 1"),
        Room::new(2, "Room 2"),
        Room::new(3, "Room 3"),
    ]
}

pub const T1: usize = 0;
pub const T2: usize = 1;
pub const T3: usize = 2;
pub const T4: usize = 3;

pub const R1: usize = 0;
pub const R2: usize = 1;
pub const R3: usize = 2;

/// Builds lessons with sequential ids.
pub struct LessonBuilder {
    lessons: Vec<Lesson>,
}

impl LessonBuilder {
    pub fn new() -> Self {
        Self {
            lessons: Vec::new(),
        }
    }

    pub fn at(mut self, timeslot: usize, room: usize, subject: &str, teacher: &str, group: &str) -> Self {
        let id = self.lessons.len() as u64 + 1;
        self.lessons
            .push(Lesson::new(id, subject, teacher, group).assigned(timeslot, room));
        self
    }

    pub fn unassigned(mut self, subject: &str, teacher: &str, group: &str) -> Self {
        let id = self.lessons.len() as u64 + 1;
        self.lessons.push(Lesson::new(id, subject, teacher, group));
        self
    }

    pub fn build(self) -> Timetable {
        Timetable::new(timeslots(), rooms(), self.lessons).unwrap()
    }
}

pub fn quick_config(seed: u64) -> SolverConfig {
    SolverConfig {
        max_steps: Some(3_000),
        verify_interval: 500,
        ..SolverConfig::default().with_seed(seed)
    }
}

//! Bootstrap problem instances, one per tenant.

use crate::domain::{Lesson, Room, Timeslot, Timetable};
use crate::error::TtResult;
use chrono::Weekday;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DemoData {
    None,
    #[default]
    Small,
    Large,
}

const START_TIMES: [(u32, u32); 5] = [(8, 30), (9, 30), (10, 30), (13, 30), (14, 30)];

const SMALL_9TH: [(&str, &str); 10] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Chemistry", "M. Curie"),
    ("Biology", "C. Darwin"),
    ("History", "I. Jones"),
    ("English", "I. Jones"),
    ("English", "I. Jones"),
    ("Spanish", "P. Cruz"),
    ("Spanish", "P. Cruz"),
];

const LARGE_9TH: [(&str, &str); 15] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("ICT", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Geography", "C. Darwin"),
    ("Geology", "C. Darwin"),
    ("History", "I. Jones"),
    ("English", "I. Jones"),
    ("Drama", "I. Jones"),
    ("Art", "S. Dali"),
    ("Art", "S. Dali"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
];

const SMALL_10TH: [(&str, &str); 10] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Chemistry", "M. Curie"),
    ("French", "M. Curie"),
    ("Geography", "C. Darwin"),
    ("History", "I. Jones"),
    ("English", "P. Cruz"),
    ("Spanish", "P. Cruz"),
];

const LARGE_10TH: [(&str, &str); 15] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("ICT", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Biology", "C. Darwin"),
    ("Geology", "C. Darwin"),
    ("History", "I. Jones"),
    ("English", "P. Cruz"),
    ("English", "P. Cruz"),
    ("Drama", "I. Jones"),
    ("Art", "S. Dali"),
    ("Art", "S. Dali"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
];

// 11th and 12th grade share the same curriculum in the large data set.
const LARGE_SENIOR: [(&str, &str); 25] = [
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("Math", "A. Turing"),
    ("ICT", "A. Turing"),
    ("Physics", "M. Curie"),
    ("Chemistry", "M. Curie"),
    ("French", "M. Curie"),
    ("Physics", "M. Curie"),
    ("Geography", "C. Darwin"),
    ("Biology", "C. Darwin"),
    ("Geology", "C. Darwin"),
    ("History", "I. Jones"),
    ("History", "I. Jones"),
    ("English", "P. Cruz"),
    ("English", "P. Cruz"),
    ("English", "P. Cruz"),
    ("Spanish", "P. Cruz"),
    ("Drama", "P. Cruz"),
    ("Art", "S. Dali"),
    ("Art", "S. Dali"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
    ("Physical education", "C. Lewis"),
];

/// Builds the demo problem for `tenant`. The first lesson is pinned to the
/// first timeslot and room.
pub fn generate(size: DemoData, tenant: u64) -> TtResult<Timetable> {
    if size == DemoData::None {
        return Timetable::new(Vec::new(), Vec::new(), Vec::new());
    }
    let large = size == DemoData::Large;
    let id_base = tenant * 10_000;

    let days: &[Weekday] = if large {
        &[
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
    } else {
        &[Weekday::Mon, Weekday::Tue]
    };

    let mut timeslots = Vec::new();
    for &day in days {
        for &(h, m) in &START_TIMES {
            let id = id_base + timeslots.len() as u64;
            timeslots.push(Timeslot::one_hour(id, day, h, m)?);
        }
    }

    let room_names: &[&str] = if large {
        &["Room A", "Room B", "Room C", "Room D", "Room E", "Room F"]
    } else {
        &["Room A", "Room B", "Room C"]
    };
    let rooms = room_names
        .iter()
        .enumerate()
        .map(|(i, name)| Room::new(id_base + i as u64, *name))
        .collect();

    let mut curriculum: Vec<(&str, &str, &str)> = Vec::new();
    let mut add = |group: &'static str, entries: &[(&'static str, &'static str)]| {
        curriculum.extend(entries.iter().map(|&(s, t)| (s, t, group)));
    };
    add("9th grade", &SMALL_9TH);
    if large {
        add("9th grade", &LARGE_9TH);
    }
    add("10th grade", &SMALL_10TH);
    if large {
        add("10th grade", &LARGE_10TH);
        add("11th grade", &LARGE_SENIOR);
        add("12th grade", &LARGE_SENIOR);
    }

    let lessons = curriculum
        .into_iter()
        .enumerate()
        .map(|(i, (subject, teacher, group))| {
            let lesson = Lesson::new(id_base + i as u64, subject, teacher, group);
            if i == 0 {
                lesson.assigned(0, 0).pin()
            } else {
                lesson
            }
        })
        .collect();

    Timetable::new(timeslots, rooms, lessons)
}

use crate::domain::{LessonIdx, Timetable};
use fnv::FnvHashMap;

/// Interned string facts of one lesson, so grouping keys are plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LessonKeys {
    pub teacher: u32,
    pub group: u32,
    pub subject: u32,
}

#[derive(Default)]
struct Interner {
    ids: FnvHashMap<String, u32>,
}

impl Interner {
    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = self.ids.len() as u32;
        self.ids.insert(s.to_owned(), id);
        id
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Returns the per-lesson keys and the number of distinct teachers.
pub fn intern_lessons(tt: &Timetable) -> (Vec<LessonKeys>, usize) {
    let mut teachers = Interner::default();
    let mut groups = Interner::default();
    let mut subjects = Interner::default();

    let keys = tt
        .lessons()
        .iter()
        .map(|l| LessonKeys {
            teacher: teachers.intern(&l.teacher),
            group: groups.intern(&l.student_group),
            subject: subjects.intern(&l.subject),
        })
        .collect();

    (keys, teachers.len())
}

/// Order inside a bucket carries no meaning; removal swaps with the tail.
pub fn remove_member(bucket: &mut Vec<LessonIdx>, lesson: LessonIdx) -> bool {
    match bucket.iter().position(|&m| m == lesson) {
        Some(pos) => {
            bucket.swap_remove(pos);
            true
        }
        None => false,
    }
}

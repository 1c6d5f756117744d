use crate::domain::{LessonIdx, RoomIdx, TimeslotIdx, Timetable};
use crate::error::TtResult;
use crate::score::HardSoftScore;
use crate::scorer::IncrementalScorer;
use rayon::prelude::*;
use tracing::debug;

/// Greedy best-fit: every movable lesson that is not fully placed gets the
/// (timeslot, room) with the best score delta, given the lessons placed
/// before it. A variable that is already set is kept.
///
/// Candidates are scored in parallel; ties go to the lowest candidate, so the
/// result does not depend on thread scheduling. Returns the number of lessons
/// placed.
pub fn construct(tt: &mut Timetable, scorer: &mut IncrementalScorer) -> TtResult<usize> {
    let mut placed = 0;

    for lesson in tt.movable_lessons() {
        let current = tt.lesson(lesson);
        if current.placement().is_some() {
            continue;
        }

        let timeslots: Vec<TimeslotIdx> = match current.timeslot {
            Some(t) => vec![t],
            None => (0..tt.timeslots().len()).map(TimeslotIdx).collect(),
        };
        let rooms: Vec<RoomIdx> = match current.room {
            Some(r) => vec![r],
            None => (0..tt.rooms().len()).map(RoomIdx).collect(),
        };
        if timeslots.is_empty() || rooms.is_empty() {
            continue;
        }

        let candidates: Vec<(TimeslotIdx, RoomIdx)> = timeslots
            .iter()
            .flat_map(|&t| rooms.iter().map(move |&r| (t, r)))
            .collect();

        let view: &Timetable = tt;
        let scored: Vec<(HardSoftScore, usize)> = candidates
            .par_iter()
            .enumerate()
            .map(|(i, &(t, r))| scorer.placement_delta(view, lesson, t, r).map(|d| (d, i)))
            .collect::<TtResult<_>>()?;

        let Some(&(best_delta, best_idx)) = scored
            .iter()
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
        else {
            continue;
        };

        let (t, r) = candidates[best_idx];
        place(tt, scorer, lesson, t, r)?;
        placed += 1;
        debug!(
            "Constructed lesson {} at timeslot {} room {} ({})",
            tt.lesson(lesson).id,
            t.0,
            r.0,
            best_delta
        );
    }

    Ok(placed)
}

fn place(
    tt: &mut Timetable,
    scorer: &mut IncrementalScorer,
    lesson: LessonIdx,
    t: TimeslotIdx,
    r: RoomIdx,
) -> TtResult<()> {
    tt.set_timeslot(lesson, Some(t));
    tt.set_room(lesson, Some(r));
    scorer.insert(tt, lesson)?;
    scorer.settle(tt)
}

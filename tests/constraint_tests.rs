mod common;

use common::*;
use rstest::rstest;
use timetabler::constraints::{self, Constraint};
use timetabler::score::HardSoftScore;

#[rstest]
#[case::room_conflict(
    LessonBuilder::new()
        .at(T1, R1, "Sub1", "Teach1", "Grp1")
        .at(T1, R1, "Sub2", "Teach2", "Grp2")
        .at(T2, R1, "Sub3", "Teach3", "Grp3"),
    Constraint::RoomConflict,
    1
)]
#[case::teacher_conflict(
    LessonBuilder::new()
        .at(T1, R1, "Sub1", "Teach1", "Grp1")
        .at(T1, R2, "Sub2", "Teach1", "Grp2")
        .at(T2, R1, "Sub3", "Teach2", "Grp3"),
    Constraint::TeacherConflict,
    1
)]
#[case::student_group_conflict(
    LessonBuilder::new()
        .at(T1, R1, "Sub1", "Teach1", "Grp1")
        .at(T1, R2, "Sub2", "Teach2", "Grp1")
        .at(T2, R1, "Sub3", "Teach3", "Grp2"),
    Constraint::StudentGroupConflict,
    1
)]
#[case::teacher_room_stability(
    LessonBuilder::new()
        .at(T1, R1, "Sub1", "Teach1", "Grp1")
        .at(T1, R1, "Sub2", "Teach1", "Grp2")
        .at(T1, R2, "Sub3", "Teach1", "Grp3")
        .at(T1, R3, "Sub4", "Teach2", "Grp4"),
    Constraint::TeacherRoomStability,
    2
)]
#[case::teacher_time_efficiency(
    LessonBuilder::new()
        .at(T1, R1, "Sub1", "Teach1", "Grp1")
        .at(T2, R1, "Sub2", "Teach1", "Grp2")
        .at(T3, R1, "Sub3", "Teach1", "Grp3")
        .at(T4, R1, "Sub4", "Teach1", "Grp4"),
    Constraint::TeacherTimeEfficiency,
    1
)]
#[case::student_group_subject_variety(
    LessonBuilder::new()
        .at(T1, R1, "Subject1", "Teacher1", "Group1")
        .at(T2, R1, "Subject1", "Teacher2", "Group1")
        .at(T3, R1, "Subject1", "Teacher3", "Group1")
        .at(T4, R1, "Subject1", "Teacher4", "Group1")
        .at(T3, R2, "Subject2", "Teacher5", "Group1"),
    Constraint::StudentGroupSubjectVariety,
    1
)]
fn pair_counts(#[case] lessons: LessonBuilder, #[case] constraint: Constraint, #[case] expected: usize) {
    let tt = lessons.build();
    assert_eq!(
        constraints::match_count(constraint, &tt),
        expected,
        "{} match count",
        constraint
    );
}

#[test]
fn unassigned_lessons_never_match() {
    let tt = LessonBuilder::new()
        .at(T1, R1, "Sub1", "Teach1", "Grp1")
        .unassigned("Sub2", "Teach1", "Grp1")
        .unassigned("Sub3", "Teach1", "Grp1")
        .build();
    assert_eq!(constraints::full_score(&tt).unwrap(), HardSoftScore::ZERO);
}

#[test]
fn full_score_sums_every_constraint() {
    // Same teacher, group and subject, back to back in different rooms.
    let tt = LessonBuilder::new()
        .at(T2, R1, "Math", "Turing", "9th")
        .at(T3, R2, "Math", "Turing", "9th")
        .build();
    let explanation = constraints::explain(&tt).unwrap();
    assert_eq!(explanation.score, HardSoftScore::new(0, -1));
    assert_eq!(explanation.score, constraints::full_score(&tt).unwrap());

    let soft: Vec<(Constraint, usize)> = explanation
        .constraints
        .iter()
        .filter(|c| c.match_count > 0)
        .map(|c| (c.constraint, c.match_count))
        .collect();
    assert_eq!(
        soft,
        vec![
            (Constraint::TeacherRoomStability, 1),
            (Constraint::TeacherTimeEfficiency, 1),
            (Constraint::StudentGroupSubjectVariety, 1),
        ]
    );
}

#[test]
fn hard_dominates_soft() {
    for soft in [-1_000_000, -100, 0, 100, 1_000_000] {
        assert!(HardSoftScore::new(-1, 100) < HardSoftScore::new(0, soft));
    }
}

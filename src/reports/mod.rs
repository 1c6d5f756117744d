use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde::Serialize;
use std::path::Path;
use timetabler::constraints::{ScoreExplanation, Tier};
use timetabler::domain::{RoomIdx, TimeslotIdx, Timetable};
use timetabler::error::TtResult;
use timetabler::manager::SolverStatus;
use timetabler::optimizer::SolveStats;
use timetabler::score::HardSoftScore;

/// Timeslots down, rooms across; each cell lists the lessons placed there.
pub fn print_timetable(tt: &Timetable) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("Timeslot").add_attribute(Attribute::Bold)];
    header.extend(
        tt.rooms()
            .iter()
            .map(|r| Cell::new(&r.name).add_attribute(Attribute::Bold)),
    );
    table.set_header(header);

    for (t, slot) in tt.timeslots().iter().enumerate() {
        let mut row = vec![Cell::new(format!(
            "{} {}-{}",
            slot.day,
            slot.start.format("%H:%M"),
            slot.end.format("%H:%M")
        ))];
        for r in 0..tt.rooms().len() {
            let here: Vec<String> = tt
                .lessons()
                .iter()
                .filter(|l| l.placement() == Some((TimeslotIdx(t), RoomIdx(r))))
                .map(|l| format!("{}\n{}\n{}", l.subject, l.teacher, l.student_group))
                .collect();
            let cell = Cell::new(here.join("\n--\n")).set_alignment(CellAlignment::Center);
            row.push(if here.len() > 1 { cell.fg(Color::Red) } else { cell });
        }
        table.add_row(row);
    }
    println!("{}", table);

    let unassigned: Vec<String> = tt
        .lessons()
        .iter()
        .filter(|l| l.placement().is_none())
        .map(|l| format!("{} {} ({}, {})", l.id, l.subject, l.teacher, l.student_group))
        .collect();
    if !unassigned.is_empty() {
        println!("\nUnassigned lessons:");
        for line in unassigned {
            println!("  {}", line);
        }
    }
}

pub fn print_summary(
    status: SolverStatus,
    score: HardSoftScore,
    stats: Option<&SolveStats>,
    unassigned: usize,
) {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);

    let score_cell = Cell::new(score).add_attribute(Attribute::Bold);
    let score_cell = if score.is_feasible() {
        score_cell.fg(Color::Green)
    } else {
        score_cell.fg(Color::Red)
    };

    table.add_row(vec![Cell::new("Status"), Cell::new(status)]);
    table.add_row(vec![Cell::new("Score"), score_cell]);
    table.add_row(vec![Cell::new("Unassigned"), Cell::new(unassigned)]);
    if let Some(stats) = stats {
        table.add_row(vec![Cell::new("Constructed"), Cell::new(stats.constructed)]);
        table.add_row(vec![Cell::new("Steps"), Cell::new(stats.steps)]);
        table.add_row(vec![Cell::new("Accepted"), Cell::new(stats.accepted)]);
        table.add_row(vec![Cell::new("Improvements"), Cell::new(stats.improvements)]);
        table.add_row(vec![
            Cell::new("Elapsed"),
            Cell::new(format!("{:.2?}", stats.elapsed)),
        ]);
    }
    println!("{}", table);
}

pub fn print_explanation(explanation: &ScoreExplanation) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Constraint").add_attribute(Attribute::Bold),
        Cell::new("Tier"),
        Cell::new("Matches"),
        Cell::new("Score"),
    ]);
    for i in 2..=3 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for total in &explanation.constraints {
        let tier = match total.tier {
            Tier::Hard => Cell::new(total.tier).fg(Color::Red),
            Tier::Soft => Cell::new(total.tier).fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(total.constraint),
            tier,
            Cell::new(total.match_count),
            Cell::new(total.score),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(explanation.score).add_attribute(Attribute::Bold),
    ]);
    println!("{}", table);

    if explanation.unassigned_lessons > 0 {
        println!(
            "⚠️  {} lessons are unassigned and do not take part in scoring.",
            explanation.unassigned_lessons
        );
    }
}

#[derive(Serialize)]
struct AssignmentRow<'a> {
    lesson_id: u64,
    subject: &'a str,
    teacher: &'a str,
    student_group: &'a str,
    day: Option<String>,
    start: Option<String>,
    end: Option<String>,
    room: Option<&'a str>,
    pinned: bool,
}

pub fn export_csv(tt: &Timetable, path: &Path) -> TtResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for lesson in tt.lessons() {
        let slot = lesson.timeslot.map(|t| tt.timeslot(t));
        writer.serialize(AssignmentRow {
            lesson_id: lesson.id.0,
            subject: &lesson.subject,
            teacher: &lesson.teacher,
            student_group: &lesson.student_group,
            day: slot.map(|s| s.day.to_string()),
            start: slot.map(|s| s.start.format("%H:%M").to_string()),
            end: slot.map(|s| s.end.format("%H:%M").to_string()),
            room: lesson.room.map(|r| tt.room(r).name.as_str()),
            pinned: lesson.pinned,
        })?;
    }
    writer.flush()?;
    Ok(())
}

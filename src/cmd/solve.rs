use super::ProblemArgs;
use crate::reports;
use clap::Args;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use timetabler::config::SolverConfig;
use timetabler::domain::Assignment;
use timetabler::error::TtResult;
use timetabler::manager::SolverManager;
use timetabler::verifier::Verifier;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    #[command(flatten)]
    pub config: SolverConfig,

    #[command(flatten)]
    pub problem: ProblemArgs,

    /// JSON list of previously persisted assignments to start from.
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Write the best assignment as CSV.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the best timetable as JSON.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

pub fn run(args: &SolveArgs, config: SolverConfig) -> TtResult<()> {
    let problem = args.problem.load()?;
    let manager = SolverManager::new(config)?;

    let handle = match &args.resume {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            let assignments: Vec<Assignment> = serde_json::from_str(&content)?;
            info!("Resuming from {} persisted assignments", assignments.len());
            manager.submit_resumed(problem.clone(), &assignments)?
        }
        None => manager.submit(problem.clone())?,
    };
    manager.on_improved(handle, |_, score| info!("✨ New best: {}", score))?;

    let status = loop {
        let status = manager.await_termination(handle, Duration::from_secs(1))?;
        if status.is_terminal() {
            break status;
        }
        let (_, score) = manager.best_snapshot(handle)?;
        info!("⏳ {} ... best so far {}", status, score);
    };

    let (best, score) = manager.best_snapshot(handle)?;
    let summary = manager.summary(handle)?;
    if let Some(fault) = &summary.fault {
        warn!("Session ended on a fault: {}", fault);
    }

    if !Verifier::new(&problem).verify(&best, score)? {
        warn!("⚠️  Best snapshot failed verification");
    }

    reports::print_timetable(&best);
    reports::print_summary(status, score, summary.stats.as_ref(), best.unassigned_count());

    if let Some(path) = &args.output {
        reports::export_csv(&best, path)?;
        info!("💾 Wrote assignments to {}", path.display());
    }
    if let Some(path) = &args.json {
        fs::write(path, serde_json::to_string_pretty(&best)?)?;
        info!("💾 Wrote timetable to {}", path.display());
    }

    manager.shutdown();
    Ok(())
}

pub mod explain;
pub mod solve;

use clap::Args;
use std::path::PathBuf;
use timetabler::demo::{self, DemoData};
use timetabler::domain::Timetable;
use timetabler::error::TtResult;
use tracing::info;

/// Where a command takes its timetable from.
#[derive(Args, Debug, Clone)]
pub struct ProblemArgs {
    /// Demo data set used when no problem file is given.
    #[arg(long, value_enum, default_value_t = DemoData::Small)]
    pub demo: DemoData,

    /// Tenant whose demo data is generated.
    #[arg(long, default_value_t = 1)]
    pub tenant: u64,

    /// JSON timetable (timeslots, rooms, lessons).
    #[arg(short, long)]
    pub problem: Option<PathBuf>,
}

impl ProblemArgs {
    pub fn load(&self) -> TtResult<Timetable> {
        match &self.problem {
            Some(path) => {
                info!("📂 Loading problem: {}", path.display());
                Timetable::load_from_file(path)
            }
            None => {
                info!("📂 Generating {} demo data for tenant {}", self.demo, self.tenant);
                demo::generate(self.demo, self.tenant)
            }
        }
    }
}

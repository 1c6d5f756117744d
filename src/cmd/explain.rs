use super::ProblemArgs;
use crate::reports;
use clap::Args;
use timetabler::constraints;
use timetabler::error::TtResult;

#[derive(Args, Debug, Clone)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub problem: ProblemArgs,

    /// Skip the timetable grid.
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

pub fn run(args: &ExplainArgs) -> TtResult<()> {
    let tt = args.problem.load()?;
    if !args.quiet {
        reports::print_timetable(&tt);
    }
    let explanation = constraints::explain(&tt)?;
    reports::print_explanation(&explanation);
    Ok(())
}

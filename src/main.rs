use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use timetabler::config::SolverConfig;
use timetabler::error::TtResult;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON solver config; explicit flags still take precedence.
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Solve demo data or a JSON problem and print the best timetable.
    Solve(cmd::solve::SolveArgs),
    /// Break a timetable's score down per constraint, without solving.
    Explain(cmd::explain::ExplainArgs),
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.debug { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚀 Initializing timetabler...");

    let result = match &cli.command {
        Commands::Solve(args) => resolve_config(
            cli.config.as_deref(),
            &args.config,
            matches.subcommand_matches("solve"),
        )
        .and_then(|config| cmd::solve::run(args, config)),
        Commands::Explain(args) => cmd::explain::run(args),
    };

    if let Err(e) = result {
        error!("❌ {}", e);
        process::exit(1);
    }
}

fn resolve_config(
    path: Option<&Path>,
    cli: &SolverConfig,
    sub_matches: Option<&ArgMatches>,
) -> TtResult<SolverConfig> {
    let Some(path) = path else {
        cli.validate()?;
        return Ok(cli.clone());
    };

    info!("⚙️  Loading config from: {}", path.display());
    let mut config = SolverConfig::read_from_file(path)?;
    if let Some(matches) = sub_matches {
        config.merge_from_cli(cli, matches);
    }
    config.validate()?;
    Ok(config)
}

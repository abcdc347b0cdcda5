use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use routecheck::commands;
use routecheck::domain::{ProjectId, RouteId, TestId, UserId};
use routecheck::{EngineConfig, EngineError, Orchestrator, SqliteStore};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "routecheck")]
#[command(about = "Run stored API tests and report pass rates", version)]
struct Cli {
    /// TOML config file; defaults are used when omitted
    #[arg(long, env = "ROUTECHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `database_path` from the config
    #[arg(long, env = "ROUTECHECK_DATABASE")]
    database: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every test of one route
    RunRoute {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        route: RouteId,
    },
    /// Run every test of a project
    RunProject {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        project: ProjectId,
    },
    /// Run a single test
    RunTest {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        test: TestId,
    },
    /// Latest result of a test
    Status {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        test: TestId,
    },
    /// Full result history of a test
    History {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        test: TestId,
    },
    /// Pass rate over a whole project
    ProjectStats {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        project: ProjectId,
    },
    /// Pass rate per route of a project
    RouteStats {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        project: ProjectId,
    },
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("routecheck=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), EngineError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn dispatch(
    command: Command,
    store: &SqliteStore,
    orchestrator: &Orchestrator,
) -> Result<(), EngineError> {
    match command {
        Command::RunRoute {
            user,
            project,
            route,
        } => print_json(
            &commands::run_route_tests(store, orchestrator, user, project, route).await?,
        ),
        Command::RunProject { user, project } => {
            print_json(&commands::run_project_tests(store, orchestrator, user, project).await?)
        }
        Command::RunTest { user, test } => {
            print_json(&commands::run_single_test(store, orchestrator, user, test).await?)
        }
        Command::Status { user, test } => print_json(&commands::test_status(store, user, test)?),
        Command::History { user, test } => {
            print_json(&commands::test_history(store, user, test)?)
        }
        Command::ProjectStats { user, project } => {
            print_json(&commands::project_stats(store, user, project)?)
        }
        Command::RouteStats { user, project } => {
            print_json(&commands::route_stats(store, user, project)?)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let mut config = match EngineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    let store = match SqliteStore::open(&config.database_path) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let orchestrator = match Orchestrator::new(config) {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match dispatch(cli.command, &store, &orchestrator).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

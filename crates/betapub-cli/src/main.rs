use std::process::ExitCode;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use betapub::actions::ActionsReporter;
use betapub::config::{ActionConfig, ActionInputs};
use betapub::engine::{self, Instructions, Reporter};
use betapub::github::GitHubClient;
use betapub::npm::NpmCli;
use betapub::version::{CommitPolicy, synthesize, trim_version};
use betapub_process::command_exists;

#[derive(Parser, Debug)]
#[command(name = "betapub", version)]
#[command(about = "Publish a per-commit npm beta build and post install instructions on the pull request")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish the package and post install instructions (default).
    Run(RunArgs),
    /// Print a unique beta version for a base version.
    Version {
        /// Base version; anything after MAJOR.MINOR.PATCH is dropped.
        #[arg(long)]
        base: String,

        /// Commit hash; the commit identifier is omitted when absent.
        #[arg(long)]
        commit: Option<String>,
    },
}

/// Action inputs. Each flag falls back to the `INPUT_*` variable the runner sets.
#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    #[arg(long, env = "INPUT_NPM_TOKEN", hide_env_values = true)]
    npm_token: Option<String>,

    #[arg(long, env = "INPUT_COMMIT_HASH")]
    commit_hash: Option<String>,

    /// Any non-empty value other than `false` enables a dry run.
    #[arg(long, env = "INPUT_DRY_RUN")]
    dry_run: Option<String>,

    /// npm workspace name or path.
    #[arg(long, env = "INPUT_WORKSPACE")]
    workspace: Option<String>,

    /// Package directory, relative to GITHUB_WORKSPACE.
    #[arg(long, env = "INPUT_WORKING_DIRECTORY")]
    working_directory: Option<String>,

    /// GitHub API timeout (e.g. 30s).
    #[arg(long, env = "INPUT_API_TIMEOUT")]
    api_timeout: Option<String>,

    /// Kill npm commands running longer than this (e.g. 10m).
    #[arg(long, env = "INPUT_COMMAND_TIMEOUT")]
    command_timeout: Option<String>,
}

impl From<RunArgs> for ActionInputs {
    fn from(args: RunArgs) -> Self {
        Self {
            github_token: args.github_token,
            npm_token: args.npm_token,
            commit_hash: args.commit_hash,
            dry_run: args.dry_run,
            workspace: args.workspace,
            working_directory: args.working_directory,
            api_timeout: args.api_timeout,
            command_timeout: args.command_timeout,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.cmd {
        // The action invokes the binary bare; inputs come straight from the runner env.
        None => ActionConfig::from_env().and_then(run),
        Some(Commands::Run(args)) => ActionConfig::resolve(args.into(), &env_lookup).and_then(run),
        Some(Commands::Version { base, commit }) => print_version(&base, commit.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ActionsReporter::stdout().error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn run(cfg: ActionConfig) -> Result<()> {
    if !command_exists("npm") {
        bail!("npm executable not found on PATH");
    }

    let mut npm = NpmCli::new(cfg.working_dir(), cfg.workspace.clone(), cfg.command_timeout);
    let mut github = GitHubClient::new(&cfg.api_base, &cfg.github_token, cfg.api_timeout)?;
    let mut reporter = ActionsReporter::stdout();

    let report = engine::run(&cfg, &mut npm, &mut github, &mut reporter, Utc::now())?;

    let shown = match report.instructions {
        Instructions::Comment(written) => format!("comment {}", written.id()),
        Instructions::Annotation => "annotation".to_string(),
    };
    reporter.info(&format!(
        "published {} (instructions: {shown})",
        report.name_and_version()
    ));
    Ok(())
}

fn print_version(base: &str, commit: Option<&str>) -> Result<()> {
    let triple = trim_version(base)?;
    let policy = match commit {
        Some(_) => CommitPolicy::Required,
        None => CommitPolicy::Optional,
    };
    let version = synthesize(&triple, commit.unwrap_or_default(), policy)?;
    println!("{version}");
    Ok(())
}

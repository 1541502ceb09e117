use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use trisync::commands::{self, StashOutcome};
use trisync::config::TrisyncConfig;
use trisync::confirm::{Confirm, Terminal};
use trisync::events::{Console, EventSink};
use trisync::{Engine, Session, SyncDecision};
use trisync_git::GixRepo;

mod format;
mod telemetry;

use format::OutputFormat;

/// Keep your feature branch, your published copy of it and the integration
/// branch in line.
///
/// trisync works with exactly three branches: yours (local), your origin
/// (the copy of your branch on the remote) and the integration branch
/// (master or main on the remote). It keeps history linear: it rebases
/// instead of merging, squashes when a rebase conflicts, and never
/// overwrites the remote without a lease check or your explicit say-so.
///
/// DAILY USE:
///
///   trisync commit -m "feat: what you did"
///   trisync sync        # publish, pull or resolve a fork
///   trisync rebase      # catch up with the integration branch
///
/// EXIT STATUS:
///
///   0 on success or when you cancelled, 2 when a conflict needs manual
///   resolution, 1 on any other error.
#[derive(Parser)]
#[command(name = "trisync")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'trisync <command> --help' for more information on a specific command.")]
struct Cli {
    /// Run as if started in <PATH>
    #[arg(short = 'C', global = true, value_name = "PATH")]
    directory: Option<PathBuf>,

    /// Remote holding your origin and the integration branch
    #[arg(long, env = "TRISYNC_REMOTE", value_name = "NAME")]
    remote: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring your branch and your origin into agreement
    ///
    /// Fetches, then pushes, pulls, or resolves a fork between the two.
    /// An unpublished branch is rebased onto the integration branch before
    /// its first push.
    Sync,

    /// Sync, then rebase onto the integration branch and republish
    ///
    /// A conflicting rebase is aborted; you are offered to squash your
    /// commits into one and retry once.
    Rebase,

    /// Squash every commit since the integration branch into one and
    /// republish
    Squash {
        /// Message of the squash commit
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Move your branch back to where it forked from the integration branch
    ///
    /// Your changes stay in the working tree, unstaged.
    Reset {
        /// Instead, move to your own latest commit on the integration branch
        #[arg(long)]
        mine: bool,
    },

    /// Overwrite your origin with your branch, behind a lease check
    ///
    /// If your origin moved since the last fetch you are asked three times
    /// before it is overwritten unconditionally.
    ForcePush,

    /// Commit all changes (staged ones only, when something is staged)
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Stash a dirty tree, or pop the single stash entry
    Stash,

    /// Update submodules (init, recursive, force)
    SubmoduleUpdate {
        /// Use the submodules' remote-tracking branches
        #[arg(long)]
        remote: bool,
    },

    /// Abort an in-progress merge, rebase, cherry-pick or revert
    Abort,

    /// Show the three branches, their base and how far apart they are
    Status {
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Fetch before reporting
        #[arg(long)]
        fetch: bool,
    },

    /// Print the guiding maxims
    Zen,
}

/// Exit with a specific status without printing an error.
#[derive(Debug)]
struct ExitCodeError(u8);

impl std::fmt::Display for ExitCodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exiting with code {}", self.0)
    }
}

impl std::error::Error for ExitCodeError {}

fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(code) = e.downcast_ref::<ExitCodeError>() {
                return ExitCode::from(code.0);
            }
            eprintln!("💥 {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if matches!(cli.command, Commands::Zen) {
        for line in commands::ZEN {
            println!("{line}");
        }
        return Ok(());
    }

    let dir = match cli.directory {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot read the current directory")?,
    };
    let repo = GixRepo::open(&dir)?;
    let mut config = TrisyncConfig::load_from_workdir(repo.workdir())?;
    if let Some(remote) = cli.remote {
        config.remote.name = remote;
    }
    tracing::debug!(workdir = %repo.workdir().display(), remote = %config.remote.name, "starting");

    let mut confirm = Terminal::stdio();
    let mut events = Console::stdout();

    match cli.command {
        Commands::Sync => {
            let mut engine = Engine::new(open(&repo, config, &mut confirm, &mut events)?);
            decided(engine.sync()?)
        }
        Commands::Rebase => {
            let mut engine = Engine::new(open(&repo, config, &mut confirm, &mut events)?);
            decided(engine.rebase()?)
        }
        Commands::Squash { message } => {
            let mut engine = Engine::new(open(&repo, config, &mut confirm, &mut events)?);
            decided(engine.squash(message.as_deref())?)
        }
        Commands::Reset { mine } => {
            let mut engine = Engine::new(open(&repo, config, &mut confirm, &mut events)?);
            if mine {
                decided(engine.reset_to_mine()?)
            } else {
                engine.reset()?;
                Ok(())
            }
        }
        Commands::ForcePush => {
            let mut engine = Engine::new(open(&repo, config, &mut confirm, &mut events)?);
            decided(engine.force_push()?)
        }
        Commands::Commit { message } => {
            let mut session = open(&repo, config, &mut confirm, &mut events)?;
            commands::commit(&mut session, message.as_deref())?;
            Ok(())
        }
        Commands::Status { format, fetch } => {
            let session = open(&repo, config, &mut confirm, &mut events)?;
            let report = commands::status(&session, fetch)?;
            print!("{}", format.render(&report)?);
            if format == OutputFormat::Json {
                println!();
            }
            Ok(())
        }
        Commands::Stash => match commands::stash(&repo, &mut confirm, &mut events)? {
            StashOutcome::Refused => Err(ExitCodeError(1).into()),
            _ => Ok(()),
        },
        Commands::SubmoduleUpdate { remote } => {
            commands::submodule_update(&repo, &mut events, remote)?;
            Ok(())
        }
        Commands::Abort => {
            commands::abort(&repo, &mut events)?;
            Ok(())
        }
        Commands::Zen => Ok(()),
    }
}

fn open<'a>(
    repo: &'a GixRepo,
    config: TrisyncConfig,
    confirm: &'a mut dyn Confirm,
    events: &'a mut dyn EventSink,
) -> Result<Session<'a>> {
    Session::open(repo, config, confirm, events).context("refusing to start")
}

/// Map the outcome to the process status: a conflict left for the operator
/// is exit code 2, everything else (cancellation included) is success.
fn decided(decision: SyncDecision) -> Result<()> {
    tracing::info!(%decision, "finished");
    if decision.needs_manual_resolution() {
        return Err(ExitCodeError(2).into());
    }
    Ok(())
}

// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Argument parsing and top-level wiring: turns a parsed [`Cli`] into a
//! [`kiln_engine::Applier`] call, mapping the result back onto an exit
//! code (§6, §12).

use std::{
    collections::{HashMap, HashSet},
    str::FromStr,
    sync::{Arc, atomic::AtomicBool},
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{
    generate_to,
    shells::{Bash, Fish, Zsh},
};
use clap_mangen::Man;
use fs_err::{self as fs, File};
use kiln_engine::{
    applier::{ApplyOptions, Applier},
    atoms::{check_availability, sanitize_atoms},
    Atom, FinalResult, NullAuditSink, RequestKind,
};
use thiserror::Error;
use tracing::info;
use tracing_common::LogConfig;

use crate::{
    audit::FileAuditSink,
    executor::ProcessExecutor,
    filter::MessageFilter,
    installation::Installation,
    settings::Settings,
    signal,
    store::JsonStore,
    ui::TerminalUi,
    universe::{Repository, RepositoryIndex, TrivialSolver},
};

#[derive(Debug, Parser)]
#[command(name = "kiln", version, about = "Solution application engine for a source-based package manager")]
pub struct Cli {
    /// Root of the installation to operate on.
    #[arg(long, global = true, default_value = "/")]
    root: String,

    /// Assume yes to every confirmation prompt.
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    /// `<level>[:<format>][:<destination>]`, e.g. `debug:json:/var/log/kiln.log`.
    #[arg(long, global = true, default_value = "info")]
    log: String,

    /// Render man pages for `kiln` and every subcommand into `<dir>`, then exit.
    #[arg(long, global = true, hide = true)]
    generate_manpages: Option<String>,

    /// Render shell completions (bash, fish, zsh) into `<dir>`, then exit.
    #[arg(long, global = true, hide = true)]
    generate_completions: Option<String>,

    /// Instead of applying the plan, emit each affected package's coarse
    /// OS-level dependency tags whose tag set is a subset of this list.
    #[arg(long = "external-tags", global = true, value_delimiter = ',')]
    external_tags: Option<Vec<String>>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install one or more packages.
    Install { packages: Vec<String> },
    /// Remove one or more installed packages.
    Remove { packages: Vec<String> },
    /// Upgrade every installed root package to its latest available version.
    Upgrade,
    /// Reinstall every installed root package at its current version.
    Reinstall,
    /// Print the planned actions without applying them.
    Info { packages: Vec<String> },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] kiln_engine::Error),
    #[error("invalid installation: {0}")]
    Installation(#[from] crate::installation::Error),
    #[error("invalid --log value: {0}")]
    LogConfig(String),
    #[error("failed to load repository index: {0}")]
    Repository(#[source] std::io::Error),
    #[error("failed to parse repository index: {0}")]
    RepositoryFormat(#[from] serde_yaml::Error),
    #[error("no command given")]
    NoCommand,
    #[error("failed to generate documentation: {0}")]
    Io(#[from] std::io::Error),
    #[error("installation root is read-only")]
    ReadOnly,
    #[error("failed to acquire installation lock: {0}")]
    Lock(#[from] crate::installation::lockfile::Error),
    #[error("signal handling: {0}")]
    Signal(#[from] crate::signal::Error),
}

impl Error {
    /// Exit code surfaced to the shell (§6). Engine errors carry their
    /// own mapping; everything that unwinds before the engine is reached
    /// is a setup failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Engine(e) => e.exit_code(),
            _ => kiln_engine::error::exit_codes::SOLUTION_CHECK_FAILED,
        }
    }
}

/// Runs the requested command and returns the exit code to surface to
/// the shell (§6). Only setup failures that never reach the engine
/// unwind as `Err`; once the engine is invoked its result is always
/// translated into a code here, matching `FinalResult`'s own exit-code
/// table.
pub fn process() -> Result<i32, Error> {
    let cli = Cli::parse();

    if let Some(dir) = &cli.generate_manpages {
        generate_manpages(dir)?;
        return Ok(0);
    }
    if let Some(dir) = &cli.generate_completions {
        generate_completions(dir)?;
        return Ok(0);
    }
    let command = cli.command.as_ref().ok_or(Error::NoCommand)?;

    let log_config = LogConfig::from_str(&cli.log).map_err(Error::LogConfig)?;
    tracing_common::init_with_config(log_config);

    let installation = Installation::open(&cli.root)?;
    let mutating = !matches!(command, Command::Info { .. });
    if mutating && installation.read_only() {
        return Err(Error::ReadOnly);
    }
    let _lock = mutating.then(|| installation.lock()).transpose()?;

    let mut config = Settings::load(&installation);
    config.auto_yes = config.auto_yes || cli.yes;

    let index_path = installation.repo_path("index.yaml");
    let index: RepositoryIndex = match fs_err::read_to_string(&index_path) {
        Ok(contents) => serde_yaml::from_str(&contents)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => RepositoryIndex::default(),
        Err(err) => return Err(Error::Repository(err)),
    };
    let repository = Arc::new(Repository::new(index));

    let persister = Arc::new(JsonStore::new(installation.db_path("state.json")));
    let audit_path = config.audit_log_path(&installation);
    let audit_sink: Arc<dyn kiln_engine::AuditSink> = match FileAuditSink::open(&audit_path) {
        Ok(sink) => Arc::new(sink),
        Err(err) => {
            tracing::warn!(%err, path = %audit_path.display(), "could not open audit log, discarding records");
            Arc::new(NullAuditSink)
        }
    };
    let executor = Arc::new(ProcessExecutor::new(
        installation.clone(),
        config.build_command.clone(),
        config.install_command.clone(),
    ));

    let applier = Applier::new(executor, persister.clone(), audit_sink, repository.clone(), Arc::new(MessageFilter));

    let ui = TerminalUi { auto_yes: config.auto_yes };

    let (kind, requested, show_only) = match command {
        Command::Install { packages } => (RequestKind::Install(to_astrs(packages)), packages.clone(), false),
        Command::Remove { packages } => (RequestKind::Remove, packages.clone(), false),
        Command::Upgrade => (RequestKind::Upgrade, vec![], false),
        Command::Reinstall => (RequestKind::Reinstall, vec![], false),
        Command::Info { packages } => (RequestKind::Install(to_astrs(packages)), packages.clone(), true),
    };

    let state = persister.load().map_err(|e| kiln_engine::Error::Internal(e.to_string()))?;

    let atoms: Vec<Atom> = requested.iter().map(|name| Atom::new(name.as_str())).collect();
    let atoms = sanitize_atoms(atoms, repository.as_ref());
    if !matches!(kind, RequestKind::Remove) {
        check_availability(&atoms, &state, repository.as_ref(), config.strict_atoms)?;
    }
    let requested_names: HashSet<astr::AStr> = atoms.iter().map(|a| a.name.clone()).collect();

    let solver = TrivialSolver {
        repository: repository.as_ref(),
    };

    let options = ApplyOptions {
        download_jobs: config.download_jobs,
        build_jobs: config.build_jobs,
        auto_yes: config.auto_yes,
        show_only,
        external_tags: cli.external_tags.clone(),
        dry_run: false,
    };

    // Mirrors the teacher's `new_state`: a terminal hangup or TERM must
    // not tear down a state mutation in progress, and logind shouldn't
    // suspend or shut down the machine mid-apply. Ctrl-C is handled
    // separately below, since ignoring SIGINT outright would make it
    // unobservable and the scheduler couldn't honour §5's interrupt
    // semantics.
    let _signal_guard = mutating
        .then(|| signal::ignore([signal::Signal::SIGHUP, signal::Signal::SIGTERM]))
        .transpose()?;
    let _inhibit_fd = mutating.then(|| {
        signal::inhibit(
            vec!["shutdown", "sleep", "idle", "handle-lid-switch"],
            "kiln".into(),
            "Applying package changes".into(),
            "block".into(),
        )
    });
    let interrupted: Arc<AtomicBool> = if mutating { signal::catch_interrupt()? } else { Arc::new(AtomicBool::new(false)) };

    let result = applier.resolve_and_apply(
        state,
        kind,
        requested_names,
        Default::default(),
        &solver,
        &ui,
        repository.as_ref(),
        &process_env(),
        &options,
        &interrupted,
    )?;

    report_result(&result);

    Ok(exit_code_for(&result))
}

/// Maps a successful [`FinalResult`] onto the exit code the shell sees
/// (§6); engine-level `Err`s are mapped separately by [`Error::exit_code`].
fn exit_code_for(result: &FinalResult) -> i32 {
    match result {
        FinalResult::Ok(_) | FinalResult::NothingToDo | FinalResult::Aborted => 0,
        FinalResult::NoSolution => kiln_engine::error::exit_codes::NO_SOLUTION,
        FinalResult::Error { .. } => kiln_engine::error::exit_codes::SOLUTION_CHECK_FAILED,
    }
}

fn to_astrs(names: &[String]) -> Vec<astr::AStr> {
    names.iter().map(|n| astr::AStr::from(n.as_str())).collect()
}

fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Renders a man page for `kiln` and every subcommand into `dir`,
/// matching the teacher's `boulder` doc-generation flow.
fn generate_manpages(dir: &str) -> Result<(), Error> {
    let dir = std::path::Path::new(dir);
    fs::create_dir_all(dir)?;

    let main_cmd = Cli::command();
    let main_man = Man::new(main_cmd.clone());
    let mut buffer = File::create(dir.join("kiln.1"))?;
    main_man.render(&mut buffer)?;

    for sub in main_cmd.get_subcommands() {
        let sub_man = Man::new(sub.clone());
        let mut buffer = File::create(dir.join(format!("kiln-{}.1", sub.get_name())))?;
        sub_man.render(&mut buffer)?;
    }

    Ok(())
}

/// Renders bash/fish/zsh completion scripts into `dir`.
fn generate_completions(dir: &str) -> Result<(), Error> {
    let dir = std::path::Path::new(dir);
    fs::create_dir_all(dir)?;

    let mut cmd = Cli::command();
    generate_to(Bash, &mut cmd, "kiln", dir)?;
    generate_to(Fish, &mut cmd, "kiln", dir)?;
    generate_to(Zsh, &mut cmd, "kiln", dir)?;

    Ok(())
}

fn report_result(result: &FinalResult) {
    match result {
        FinalResult::NothingToDo => println!("Nothing to do."),
        FinalResult::Aborted => println!("Aborted."),
        FinalResult::NoSolution => {}
        FinalResult::Ok(actions) => info!(count = actions.len(), "apply succeeded"),
        FinalResult::Error { .. } => {
            if let Some(report) = kiln_engine::classify::render_report(result) {
                println!("{report}");
            }
        }
    }
}

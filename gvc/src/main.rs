mod logging;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gvc_core::{Algorithm, FileSetDiff, HASH_SIZE, Hash, Repository};
use output::{
    CommitOutput, FilesetOutput, InitOutput, LogOutput, OutputWriter, RevisionInfo, ShowOutput,
    StatusOutput, fileset_entries, format_changes, format_fileset, path_changes, result_code,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// GVC - A minimal version control tool built on content-addressed filesets
#[derive(Parser)]
#[command(name = "gvc")]
#[command(about = "Record directory snapshots as a chain of self-certifying revisions", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory to operate in (defaults to the current directory)
    #[arg(short = 'C', long = "dir", global = true)]
    dir: Option<PathBuf>,

    /// Emit machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a repository and record the current tree as the root revision
    Init {
        /// Hash algorithm to use (blake3 or sha256)
        #[arg(long, default_value = "blake3")]
        algo: String,
    },

    /// Record the working tree as a new revision
    Commit {
        /// Description of the change
        comment: String,
    },

    /// Show changes between the current revision and the working tree
    Status,

    /// List revisions from the current one back to the root
    Log {
        /// Show at most this many revisions
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show a revision and the files it added and removed
    Show {
        /// Revision hash or unique prefix
        hash: String,
    },

    /// Print the full fileset at a revision (current revision if omitted)
    Fileset {
        /// Revision hash or unique prefix
        hash: Option<String>,

        /// Scan the working tree instead of resolving a revision
        #[arg(long, conflicts_with = "hash")]
        working: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let output = OutputWriter::new(cli.json);
    let dir = cli.dir.unwrap_or_else(|| PathBuf::from("."));

    let result = match cli.command {
        Commands::Init { algo } => cmd_init(&dir, &algo, &output),
        Commands::Commit { comment } => cmd_commit(&dir, &comment, &output),
        Commands::Status => cmd_status(&dir, &output),
        Commands::Log { limit } => cmd_log(&dir, limit, &output),
        Commands::Show { hash } => cmd_show(&dir, &hash, &output),
        Commands::Fileset { hash, working } => cmd_fileset(&dir, hash.as_deref(), working, &output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = result_code(&e);
            output.write_error(&e, code);
            ExitCode::from(code)
        }
    }
}

fn open_repo(dir: &Path) -> Result<Repository> {
    Repository::discover(dir)
        .with_context(|| format!("Failed to open repository from {}", dir.display()))
}

/// Accept a full hex hash or a prefix matching exactly one stored revision.
fn resolve_revision_arg(repo: &Repository, arg: &str) -> Result<Hash> {
    if arg.len() == HASH_SIZE * 2 {
        return Hash::from_hex(arg).with_context(|| format!("Invalid hash: {}", arg));
    }
    if arg.is_empty() || !arg.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("Invalid hash: {}", arg);
    }

    let prefix = arg.to_ascii_lowercase();
    let matches: Vec<Hash> = repo
        .store()
        .list()
        .context("Failed to list revisions")?
        .into_iter()
        .filter(|hash| hash.to_hex().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [hash] => Ok(*hash),
        [] => anyhow::bail!("No revision matches {}", arg),
        _ => anyhow::bail!("Ambiguous revision prefix {} ({} matches)", arg, matches.len()),
    }
}

fn cmd_init(dir: &Path, algo: &str, output: &OutputWriter) -> Result<()> {
    let algorithm =
        Algorithm::parse(algo).with_context(|| format!("Unsupported algorithm: {}", algo))?;

    let (repo, root) = Repository::init(dir, algorithm)
        .with_context(|| format!("Failed to initialize repository at {}", dir.display()))?;

    let data = InitOutput {
        success: true,
        result_code: 0,
        root: repo.root().display().to_string(),
        algorithm: algorithm.as_str().to_string(),
        revision: root.hash(),
        files: root.files_added().path_count(),
    };

    output.write(&data, || {
        format!(
            "Initialized gvc repository at {}\nAlgorithm: {}\nRoot revision: {} ({} files)\n",
            data.root, data.algorithm, data.revision, data.files
        )
    })
}

fn cmd_commit(dir: &Path, comment: &str, output: &OutputWriter) -> Result<()> {
    let repo = open_repo(dir)?;
    let revision = repo.commit(comment).context("Failed to commit")?;

    // Every committed revision has a parent; the root comes from init.
    let parent = revision
        .parent()
        .context("Committed revision has no parent")?;
    let delta = FileSetDiff {
        added: revision.files_added().clone(),
        removed: revision.files_removed().clone(),
    };

    let data = CommitOutput {
        success: true,
        result_code: 0,
        revision: revision.hash(),
        parent,
        changes: path_changes(&delta),
    };

    output.write(&data, || {
        format!(
            "[{}] {}\n{}",
            revision.hash().short(),
            revision.comment(),
            format_changes(&data.changes)
        )
    })
}

fn cmd_status(dir: &Path, output: &OutputWriter) -> Result<()> {
    let repo = open_repo(dir)?;
    let current = repo.current().context("Failed to load current revision")?;
    let delta = repo.status().context("Failed to compute status")?;

    let data = StatusOutput {
        success: true,
        result_code: 0,
        current: current.hash(),
        clean: delta.is_empty(),
        changes: path_changes(&delta),
    };

    output.write(&data, || {
        let mut text = format!("On revision {}\n", data.current.short());
        if data.clean {
            text.push_str("Nothing changed\n");
        } else {
            text.push_str(&format_changes(&data.changes));
        }
        text
    })
}

fn cmd_log(dir: &Path, limit: Option<usize>, output: &OutputWriter) -> Result<()> {
    let repo = open_repo(dir)?;
    let history = repo.log().context("Failed to read revision history")?;

    let revisions: Vec<RevisionInfo> = history
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(RevisionInfo::from)
        .collect();

    let data = LogOutput {
        success: true,
        result_code: 0,
        revisions,
    };

    output.write(&data, || {
        data.revisions
            .iter()
            .map(RevisionInfo::to_text)
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn cmd_show(dir: &Path, hash_str: &str, output: &OutputWriter) -> Result<()> {
    let repo = open_repo(dir)?;
    let hash = resolve_revision_arg(&repo, hash_str)?;
    let revision = repo
        .store()
        .load(&hash)
        .with_context(|| format!("Failed to load revision {}", hash))?;

    let data = ShowOutput {
        success: true,
        result_code: 0,
        revision: RevisionInfo::from(&revision),
        files_added: fileset_entries(revision.files_added()),
        files_removed: fileset_entries(revision.files_removed()),
    };

    output.write(&data, || {
        let mut text = data.revision.to_text();
        let removed = format_fileset(revision.files_removed());
        let added = format_fileset(revision.files_added());
        if !removed.is_empty() {
            text.push_str("\nRemoved:\n");
            text.push_str(&removed);
        }
        if !added.is_empty() {
            text.push_str("\nAdded:\n");
            text.push_str(&added);
        }
        text
    })
}

fn cmd_fileset(
    dir: &Path,
    hash_str: Option<&str>,
    working: bool,
    output: &OutputWriter,
) -> Result<()> {
    let repo = open_repo(dir)?;

    let (source, fileset) = if working {
        let set = repo.scan().context("Failed to scan working tree")?;
        ("working".to_string(), set)
    } else {
        let revision = match hash_str {
            Some(arg) => {
                let hash = resolve_revision_arg(&repo, arg)?;
                repo.store()
                    .load(&hash)
                    .with_context(|| format!("Failed to load revision {}", hash))?
            }
            None => repo.current().context("Failed to load current revision")?,
        };
        let mut resolver = repo.resolver();
        let set = resolver
            .resolve(&revision)
            .with_context(|| format!("Failed to resolve revision {}", revision.hash()))?;
        let stats = resolver.stats();
        if !stats.is_clean() {
            tracing::warn!(
                missing_removals = stats.missing_removals,
                duplicate_additions = stats.duplicate_additions,
                "revision chain contains inconsistent diffs"
            );
        }
        (revision.hash().to_hex(), set)
    };

    let data = FilesetOutput {
        success: true,
        result_code: 0,
        source,
        entries: fileset_entries(&fileset),
    };

    output.write(&data, || format_fileset(&fileset))
}

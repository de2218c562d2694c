use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use kifield::board::{self, FormatPreference, LoadedBoard};
use kifield::defaults::{self, Defaults};
use kifield::field::{self, ComponentReport, RenameOutcome, RenameRequest};
use kifield::Error;

use crate::commands::CmdResult;
use crate::tty;

#[derive(Args)]
pub struct RenameArgs {
    /// Board files or quoted glob patterns (.kicad_pcb or .json snapshots)
    #[arg(required = true, value_name = "BOARD")]
    boards: Vec<String>,
    /// Field name to rename from (matched ignoring case and surrounding spaces)
    #[arg(long)]
    from: Option<String>,
    /// New field name, written exactly as given
    #[arg(long)]
    to: Option<String>,
    /// Copy the field instead of renaming it
    #[arg(long, conflicts_with = "no_copy")]
    copy: bool,
    /// Rename even when config sets copy_instead
    #[arg(long)]
    no_copy: bool,
    /// Run the pass and report, but do not write any board
    #[arg(long)]
    dry_run: bool,
    /// Write the result to this path instead of overwriting the board
    #[arg(short, long)]
    output: Option<String>,
    /// How to read .kicad_pcb metadata: auto, legacy, fields
    #[arg(long)]
    format: Option<String>,
    /// Skip the timestamped backup before overwriting a board
    #[arg(long)]
    no_backup: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutput {
    command: String,
    #[serde(flatten)]
    request: RenameRequest,
    dry_run: bool,
    found: usize,
    modified: usize,
    message: String,
    boards: Vec<BoardResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardResult {
    path: String,
    kind: String,
    components: usize,
    found: usize,
    modified: usize,
    #[serde(skip_serializing_if = "is_zero")]
    unchanged: usize,
    #[serde(skip_serializing_if = "is_zero")]
    failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    written: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    matches: Vec<ComponentReport>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

pub fn run(args: RenameArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RenameOutput> {
    let defaults = defaults::load_defaults();
    rename_boards(args, &defaults)
}

fn rename_boards(args: RenameArgs, defaults: &Defaults) -> CmdResult<RenameOutput> {
    let format = match args.format.as_deref() {
        Some(raw) => FormatPreference::from_str(raw)?,
        None => defaults.format,
    };

    let paths = board::resolve_paths(&args.boards)?;
    if args.output.is_some() && paths.len() > 1 {
        return Err(Error::validation_invalid_argument(
            "output",
            "--output can only be used with a single board",
            None,
            Some(args.boards.clone()),
        ));
    }

    let request = collect_request(&args, defaults, paths.len())?;
    let backup = defaults.backup && !args.no_backup;
    let output_path = args.output.as_deref().map(kifield::paths::expand);

    // Every board must load before any is written.
    let pending = paths
        .iter()
        .map(|path| apply(path, &request, format))
        .collect::<kifield::Result<Vec<_>>>()?;

    let results: Vec<BoardResult> = pending
        .into_iter()
        .map(|pending| write_board(pending, args.dry_run, output_path.as_deref(), backup))
        .collect();

    let totals = RenameOutcome {
        found_count: results.iter().map(|r| r.found).sum(),
        modified_count: results.iter().map(|r| r.modified).sum(),
        components: Vec::new(),
    };
    let write_failed = results.iter().any(|r| r.error.is_some());
    let exit_code = if totals.found_count == 0 || write_failed { 1 } else { 0 };

    Ok((
        RenameOutput {
            command: if request.copy_instead() { "copy" } else { "rename" }.to_string(),
            message: totals.summary(&request),
            found: totals.found_count,
            modified: totals.modified_count,
            request,
            dry_run: args.dry_run,
            boards: results,
        },
        exit_code,
    ))
}

/// Build the request from flags, falling back to the interactive form when
/// names are missing and a terminal is attached.
fn collect_request(args: &RenameArgs, defaults: &Defaults, board_count: usize) -> kifield::Result<RenameRequest> {
    let flag_copy = if args.copy {
        Some(true)
    } else if args.no_copy {
        Some(false)
    } else {
        None
    };

    if let (Some(from), Some(to)) = (&args.from, &args.to) {
        return RenameRequest::new(from, to, flag_copy.unwrap_or(defaults.copy_instead));
    }

    if !tty::require_tty_for_interactive() {
        let missing = [("--from", &args.from), ("--to", &args.to)]
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(flag, _)| flag.to_string())
            .collect();
        return Err(Error::validation_missing_argument(missing));
    }

    let old_name = match &args.from {
        Some(from) => from.clone(),
        None => tty::prompt_with_default("Old field name", &defaults.default_old_name)?,
    };
    let new_name = match &args.to {
        Some(to) => to.clone(),
        None => tty::prompt_with_default("New field name", &defaults.default_new_name)?,
    };
    let copy_instead = match flag_copy {
        Some(copy) => copy,
        None => tty::confirm("Copy instead of rename?", defaults.copy_instead)?,
    };

    let request = RenameRequest::new(&old_name, &new_name, copy_instead)?;

    let question = format!(
        "{} '{}' → '{}' on {} board(s)?",
        if copy_instead { "Copy" } else { "Rename" },
        request.old_name(),
        request.new_name(),
        board_count
    );
    if !tty::confirm(&question, false)? {
        return Err(Error::validation_cancelled());
    }

    Ok(request)
}

/// A board that loaded and went through the pass, not yet written.
struct PendingBoard {
    path: PathBuf,
    loaded: LoadedBoard,
    outcome: RenameOutcome,
}

fn apply(path: &Path, request: &RenameRequest, format: FormatPreference) -> kifield::Result<PendingBoard> {
    tty::status(&format!("Processing {}", path.display()));

    let mut loaded = board::load(path, format)?;
    let outcome = field::execute(loaded.as_board_mut(), request);
    kifield::log_status!("rename", "{}: {}", path.display(), outcome.summary(request));

    Ok(PendingBoard {
        path: path.to_path_buf(),
        loaded,
        outcome,
    })
}

/// Write one board and report it. A failed write is recorded on the result so
/// the boards already written still show up in the output.
fn write_board(pending: PendingBoard, dry_run: bool, output: Option<&Path>, backup: bool) -> BoardResult {
    let PendingBoard {
        path,
        loaded,
        outcome,
    } = pending;

    let target: Option<PathBuf> = match output {
        Some(out) => Some(out.to_path_buf()),
        None if outcome.found_count > 0 => Some(path.clone()),
        None => None,
    };

    let mut written = None;
    let mut backup_path = None;
    let mut error = None;
    if let Some(target) = target.filter(|_| !dry_run) {
        // Backups only protect the source board, not a separate output.
        let keep_backup = backup && output.is_none();
        match board::save(&loaded, &target, keep_backup) {
            Ok(saved_backup) => {
                written = Some(target.display().to_string());
                backup_path = saved_backup.map(|p| p.display().to_string());
            }
            Err(err) => {
                kifield::log_status!("rename", "Failed to write {}: {}", target.display(), err);
                error = Some(format!("{}: {}", err.code.as_str(), err.message));
            }
        }
    }

    BoardResult {
        path: path.display().to_string(),
        kind: loaded.kind(),
        components: loaded.component_count(),
        found: outcome.found_count,
        modified: outcome.modified_count,
        unchanged: outcome.unchanged_count(),
        failures: outcome.failure_count(),
        written,
        backup: backup_path,
        error,
        matches: outcome.components,
    }
}

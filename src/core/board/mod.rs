//! Board hosts: loading, saving and the format switch between them.

pub mod kicad;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::field::Board;
use crate::local_files::{self, FileSystem};
use crate::paths;

pub use kicad::{KicadBoard, KicadFormat};
pub use snapshot::SnapshotBoard;

/// How to read footprint metadata in `.kicad_pcb` files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatPreference {
    /// Decide from the file's `(version N)`.
    #[default]
    Auto,
    Legacy,
    Fields,
}

impl FormatPreference {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(FormatPreference::Auto),
            "legacy" => Ok(FormatPreference::Legacy),
            "fields" => Ok(FormatPreference::Fields),
            _ => Err(Error::validation_invalid_argument(
                "format",
                format!("Unknown format '{}'. Use: auto, legacy, fields", s),
                None,
                None,
            )),
        }
    }
}

/// A board read from disk, ready for the rename pass.
#[derive(Debug, Clone)]
pub enum LoadedBoard {
    Kicad(KicadBoard),
    Snapshot(SnapshotBoard),
}

impl LoadedBoard {
    pub fn as_board_mut(&mut self) -> &mut dyn Board {
        match self {
            LoadedBoard::Kicad(board) => board,
            LoadedBoard::Snapshot(board) => board,
        }
    }

    /// Short label for output, e.g. `kicad/fields` or `snapshot`.
    pub fn kind(&self) -> String {
        match self {
            LoadedBoard::Kicad(board) => format!("kicad/{}", board.format().as_str()),
            LoadedBoard::Snapshot(_) => "snapshot".to_string(),
        }
    }

    pub fn component_count(&self) -> usize {
        match self {
            LoadedBoard::Kicad(board) => board.footprints().len(),
            LoadedBoard::Snapshot(board) => board.components.len(),
        }
    }

    pub fn render(&self) -> Result<String> {
        match self {
            LoadedBoard::Kicad(board) => Ok(board.render()),
            LoadedBoard::Snapshot(board) => board.to_json(),
        }
    }
}

enum BoardKind {
    Kicad,
    Snapshot,
}

fn kind_for(path: &Path) -> Result<BoardKind> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("kicad_pcb") => Ok(BoardKind::Kicad),
        Some("json") => Ok(BoardKind::Snapshot),
        _ => Err(Error::board_unsupported_format(path.display().to_string())),
    }
}

/// Parse board text according to the file type of `path`.
pub fn parse(content: &str, path: &Path, preference: FormatPreference) -> Result<LoadedBoard> {
    match kind_for(path)? {
        BoardKind::Kicad => Ok(LoadedBoard::Kicad(KicadBoard::parse(
            content,
            &path.display().to_string(),
            preference,
        )?)),
        BoardKind::Snapshot => Ok(LoadedBoard::Snapshot(SnapshotBoard::from_json(content)?)),
    }
}

pub fn load(path: &Path, preference: FormatPreference) -> Result<LoadedBoard> {
    kind_for(path)?;
    let content = local_files::local().read(path)?;
    let board = parse(&content, path, preference)?;
    crate::log_status!(
        "board",
        "Loaded {} ({}, {} components)",
        path.display(),
        board.kind(),
        board.component_count()
    );
    Ok(board)
}

/// Write `board` to `path`. When `backup` is set and `path` exists, the old
/// file is first copied next to it; the backup path is returned.
pub fn save(board: &LoadedBoard, path: &Path, backup: bool) -> Result<Option<PathBuf>> {
    let fs = local_files::local();
    let content = board.render()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs.ensure_dir(parent)?;
    }

    let backup_path = if backup && path.exists() {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let target = paths::backup_for(path, &stamp);
        fs.copy(path, &target)?;
        crate::log_status!("board", "Backup written to {}", target.display());
        Some(target)
    } else {
        None
    };

    fs.write(path, &content)?;
    Ok(backup_path)
}

/// Expand `~` and glob patterns into concrete board paths, in argument order.
pub fn resolve_paths(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut resolved: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let expanded = paths::expand(pattern);
        let text = expanded.to_string_lossy().to_string();

        if !text.contains(['*', '?', '[']) {
            if !resolved.contains(&expanded) {
                resolved.push(expanded);
            }
            continue;
        }

        let entries = glob::glob(&text).map_err(|e| {
            Error::validation_invalid_argument(
                "board",
                format!("Invalid glob pattern '{}': {}", pattern, e),
                None,
                None,
            )
        })?;

        let mut matched: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
        if matched.is_empty() {
            return Err(Error::board_not_found(pattern.clone()));
        }
        matched.sort();

        for path in matched {
            if !resolved.contains(&path) {
                resolved.push(path);
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::fs;
    use tempfile::tempdir;

    const BOARD: &str = "(kicad_pcb (version 20221018)\n  (footprint \"R\" (layer \"F.Cu\")\n    (property \"MPN\" \"A1\")\n  )\n)\n";

    #[test]
    fn format_preference_parses_case_insensitively() {
        assert_eq!(FormatPreference::from_str("Fields").unwrap(), FormatPreference::Fields);
        assert!(FormatPreference::from_str("kicad9").is_err());
    }

    #[test]
    fn unknown_extension_is_rejected_before_reading() {
        let err = load(Path::new("/nonexistent/board.sch"), FormatPreference::Auto).unwrap_err();
        assert_eq!(err.code, ErrorCode::BoardUnsupportedFormat);
    }

    #[test]
    fn missing_board_is_not_found() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join("gone.kicad_pcb"), FormatPreference::Auto).unwrap_err();
        assert_eq!(err.code, ErrorCode::BoardNotFound);
    }

    #[test]
    fn load_picks_host_by_extension() {
        let dir = tempdir().unwrap();
        let pcb = dir.path().join("a.kicad_pcb");
        let json = dir.path().join("a.json");
        fs::write(&pcb, BOARD).unwrap();
        fs::write(&json, r#"{"components": [{}]}"#).unwrap();

        assert_eq!(load(&pcb, FormatPreference::Auto).unwrap().kind(), "kicad/legacy");
        let snapshot = load(&json, FormatPreference::Auto).unwrap();
        assert_eq!(snapshot.kind(), "snapshot");
        assert_eq!(snapshot.component_count(), 1);
    }

    #[test]
    fn save_writes_backup_of_previous_file() {
        let dir = tempdir().unwrap();
        let pcb = dir.path().join("a.kicad_pcb");
        fs::write(&pcb, "(kicad_pcb (version 1))").unwrap();

        let board = parse(BOARD, &pcb, FormatPreference::Auto).unwrap();
        let backup = save(&board, &pcb, true).unwrap().unwrap();

        assert_eq!(fs::read_to_string(&backup).unwrap(), "(kicad_pcb (version 1))");
        assert_eq!(fs::read_to_string(&pcb).unwrap(), BOARD);
    }

    #[test]
    fn save_without_backup_or_existing_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out").join("b.kicad_pcb");

        let board = parse(BOARD, &out, FormatPreference::Auto).unwrap();
        assert!(save(&board, &out, true).unwrap().is_none());
        assert_eq!(fs::read_to_string(&out).unwrap(), BOARD);
    }

    #[test]
    fn resolve_expands_globs_in_sorted_order() {
        let dir = tempdir().unwrap();
        for name in ["b.kicad_pcb", "a.kicad_pcb", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*.kicad_pcb", dir.path().display());

        let paths = resolve_paths(&[pattern.clone(), pattern]).unwrap();

        assert_eq!(
            paths,
            vec![dir.path().join("a.kicad_pcb"), dir.path().join("b.kicad_pcb")]
        );
    }

    #[test]
    fn resolve_reports_empty_glob() {
        let dir = tempdir().unwrap();
        let pattern = format!("{}/*.kicad_pcb", dir.path().display());
        let err = resolve_paths(&[pattern]).unwrap_err();
        assert_eq!(err.code, ErrorCode::BoardNotFound);
    }

    #[test]
    fn resolve_passes_plain_paths_through() {
        let paths = resolve_paths(&["boards/main.kicad_pcb".to_string()]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("boards/main.kicad_pcb")]);
    }
}

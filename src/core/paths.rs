use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Base kifield config directory (~/.config/kifield/ on Unix, %APPDATA%\kifield on Windows)
pub fn kifield() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("kifield"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("kifield"))
    }
}

/// Global kifield.json config file path
pub fn kifield_json() -> Result<PathBuf> {
    Ok(kifield()?.join("kifield.json"))
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Backup path for a board: `<file>.<timestamp>.bak` beside the original.
pub fn backup_for(board: &Path, timestamp: &str) -> PathBuf {
    let name = board
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "board".to_string());
    board.with_file_name(format!("{}.{}.bak", name, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_sits_next_to_board() {
        let path = backup_for(Path::new("/tmp/proj/main.kicad_pcb"), "20260101-120000");
        assert_eq!(
            path,
            PathBuf::from("/tmp/proj/main.kicad_pcb.20260101-120000.bak")
        );
    }

    #[test]
    fn expand_leaves_plain_paths_alone() {
        assert_eq!(expand("boards/a.kicad_pcb"), PathBuf::from("boards/a.kicad_pcb"));
    }
}

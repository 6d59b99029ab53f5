//! Discovery of external executables.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Platform file name of command `cmd`.
pub fn executable_name(cmd: &str) -> String {
    if cfg!(windows) {
        format!("{cmd}.exe")
    } else {
        cmd.to_string()
    }
}

/// An external command and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub cmd: String,
    /// Directory holding the executable when it was found outside `PATH`
    pub dir: Option<PathBuf>,
    pub found: bool,
}

impl Tool {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            dir: None,
            found: false,
        }
    }

    /// Look in `dir` first, then along the current `PATH`.
    pub fn locate(cmd: &str, dir: Option<&Path>) -> Self {
        let path = std::env::var_os("PATH");
        Self::locate_in(cmd, dir, path.as_deref())
    }

    /// Look in `dir` first, then along `search_path` (a `PATH`-style list).
    pub fn locate_in(cmd: &str, dir: Option<&Path>, search_path: Option<&OsStr>) -> Self {
        let name = executable_name(cmd);
        let mut tool = Self::new(cmd);

        if let Some(dir) = dir
            && dir.join(&name).is_file()
        {
            tool.dir = Some(dir.to_path_buf());
            tool.found = true;
        } else if let Some(search_path) = search_path {
            tool.found = std::env::split_paths(search_path).any(|d| d.join(&name).is_file());
        }
        debug!(cmd, found = tool.found, dir = ?tool.dir, "tool lookup");
        tool
    }

    /// Program to hand to the process launcher.
    pub fn program(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.join(executable_name(&self.cmd)),
            None => PathBuf::from(executable_name(&self.cmd)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vsp_aerostruct_tools_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn explicit_directory_wins() {
        let dir = scratch("explicit");
        std::fs::write(dir.join(executable_name("ccx")), b"").unwrap();

        let tool = Tool::locate_in("ccx", Some(&dir), None);
        assert!(tool.found);
        assert_eq!(tool.dir.as_deref(), Some(dir.as_path()));
        assert_eq!(tool.program(), dir.join(executable_name("ccx")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn falls_back_to_search_path() {
        let empty = scratch("empty");
        let bin = scratch("bin");
        std::fs::write(bin.join(executable_name("cgx")), b"").unwrap();
        let search = std::env::join_paths([empty.clone(), bin.clone()]).unwrap();

        let tool = Tool::locate_in("cgx", Some(&empty), Some(&search));
        assert!(tool.found);
        assert_eq!(tool.dir, None);
        assert_eq!(tool.program(), PathBuf::from(executable_name("cgx")));

        let missing = Tool::locate_in("ccx", Some(&empty), Some(&search));
        assert!(!missing.found);

        let _ = std::fs::remove_dir_all(&empty);
        let _ = std::fs::remove_dir_all(&bin);
    }
}

//! Contracts for the external OS capabilities the engine consumes. All calls
//! are blocking and are driven through `spawn_blocking` by the async layers.

use crate::models::{RawMenuEntry, Result, VerbFilter};
use std::path::{Path, PathBuf};

#[cfg(target_os = "windows")]
pub mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::{WindowsDiskServices, WindowsFontInstaller, WindowsShell};

#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerateFlags {
    /// Ask for the extended (shift-click) verb set.
    pub extended_verbs: bool,
}

/// The shell-enumeration and shell-invocation capability. The engine's job
/// starts after `enumerate` has produced the raw entry tree and ends when
/// `invoke` hands a selected id back to the shell.
pub trait ShellMenuSource: Send + Sync {
    fn enumerate(
        &self,
        target_paths: &[PathBuf],
        flags: EnumerateFlags,
        filter: &VerbFilter,
    ) -> Result<Vec<RawMenuEntry>>;

    fn invoke(&self, id: i32, target_paths: &[PathBuf]) -> Result<()>;
}

/// Copies a font file into the per-user or system font directory and registers
/// it. All-users installation requires elevation.
pub trait FontInstaller: Send + Sync {
    fn install(&self, font_path: &Path, all_users: bool) -> Result<()>;
}

/// Virtual-disk mount and the OS format-volume affordance, both inherently
/// single-target.
pub trait DiskServices: Send + Sync {
    fn mount(&self, image_path: &Path) -> Result<()>;
    fn open_format_dialog(&self, drive_path: &Path) -> Result<()>;
}

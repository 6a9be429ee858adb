//! Routes an invoked entry either to a special-cased local operation (font
//! install, virtual-disk mount, format dialog) or back to the shell.
//!
//! Nothing here is allowed to panic or error across the boundary: external
//! failures are logged and folded into the returned outcome.

use crate::models::{MenuEntry, MenuEntryKind, MenuError};
use crate::shell::{DiskServices, FontInstaller, ShellMenuSource};
use crate::utils::path_security::validate_path;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const FONT_EXTENSIONS: &[&str] = &["fon", "otf", "ttc", "ttf"];

pub fn is_font_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| FONT_EXTENSIONS.contains(&ext.as_str()))
}

/// The closed set of recognized command verbs; everything else is forwarded
/// opaquely to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuVerb {
    InstallFont { all_users: bool },
    Mount,
    Format,
    Shell,
}

impl MenuVerb {
    pub fn parse(verb: Option<&str>) -> Self {
        match verb {
            Some("install") => MenuVerb::InstallFont { all_users: false },
            Some("installAllUsers") => MenuVerb::InstallFont { all_users: true },
            Some("mount") => MenuVerb::Mount,
            Some("format") => MenuVerb::Format,
            _ => MenuVerb::Shell,
        }
    }
}

#[derive(Debug)]
pub enum InvokeOutcome {
    /// The shell (or a disk service) ran the command.
    Invoked,
    /// Best-effort font batch: every target was attempted independently.
    FontBatch {
        installed: Vec<PathBuf>,
        failed: Vec<(PathBuf, MenuError)>,
    },
    Failed(MenuError),
    /// Separators and entries without an id are not invokable.
    Ignored,
}

pub struct VerbDispatcher {
    shell: Arc<dyn ShellMenuSource>,
    fonts: Arc<dyn FontInstaller>,
    disks: Arc<dyn DiskServices>,
}

impl VerbDispatcher {
    pub fn new(
        shell: Arc<dyn ShellMenuSource>,
        fonts: Arc<dyn FontInstaller>,
        disks: Arc<dyn DiskServices>,
    ) -> Self {
        VerbDispatcher { shell, fonts, disks }
    }

    /// Dispatches a selected entry against the current selection's paths.
    pub async fn invoke(&self, entry: &MenuEntry, target_paths: &[PathBuf]) -> InvokeOutcome {
        if entry.kind != MenuEntryKind::Action {
            return InvokeOutcome::Ignored;
        }
        let Some(id) = entry.id else {
            return InvokeOutcome::Ignored;
        };

        // The first target gates the font special case; "install" on anything
        // else is an ordinary shell verb.
        let first_is_font = target_paths.first().is_some_and(|p| is_font_file(p));

        match MenuVerb::parse(entry.verb.as_deref()) {
            MenuVerb::InstallFont { all_users } if first_is_font => {
                self.install_fonts(target_paths, all_users).await
            }
            MenuVerb::Mount => {
                let disks = Arc::clone(&self.disks);
                self.single_target(target_paths, move |path| disks.mount(&path)).await
            }
            MenuVerb::Format => {
                let disks = Arc::clone(&self.disks);
                self.single_target(target_paths, move |path| disks.open_format_dialog(&path))
                    .await
            }
            _ => {
                let shell = Arc::clone(&self.shell);
                let targets = target_paths.to_vec();
                let joined = tokio::task::spawn_blocking(move || shell.invoke(id, &targets)).await;
                match joined {
                    Ok(Ok(())) => InvokeOutcome::Invoked,
                    Ok(Err(e)) => {
                        log::warn!("Shell invocation of id {} failed: {}", id, e);
                        InvokeOutcome::Failed(e)
                    }
                    Err(e) => {
                        log::warn!("Shell invocation task failed: {}", e);
                        InvokeOutcome::Failed(MenuError::Invocation(e.to_string()))
                    }
                }
            }
        }
    }

    async fn install_fonts(&self, target_paths: &[PathBuf], all_users: bool) -> InvokeOutcome {
        let fonts = Arc::clone(&self.fonts);
        let targets = target_paths.to_vec();

        let joined = tokio::task::spawn_blocking(move || {
            let mut installed = Vec::new();
            let mut failed = Vec::new();
            for path in targets {
                let result = validate_path(&path.to_string_lossy())
                    .and_then(|p| fonts.install(&p, all_users));
                match result {
                    Ok(()) => installed.push(path),
                    Err(e) => {
                        log::warn!("Font install failed for {:?}: {}", path, e);
                        failed.push((path, e));
                    }
                }
            }
            (installed, failed)
        })
        .await;

        match joined {
            Ok((installed, failed)) => InvokeOutcome::FontBatch { installed, failed },
            Err(e) => InvokeOutcome::Failed(MenuError::FontInstall(e.to_string())),
        }
    }

    /// Mount and format act on the first target only.
    async fn single_target<F>(&self, target_paths: &[PathBuf], op: F) -> InvokeOutcome
    where
        F: FnOnce(PathBuf) -> crate::models::Result<()> + Send + 'static,
    {
        let Some(first) = target_paths.first().cloned() else {
            return InvokeOutcome::Failed(MenuError::PathError("No target path selected".to_string()));
        };

        let joined = tokio::task::spawn_blocking(move || op(first)).await;
        match joined {
            Ok(Ok(())) => InvokeOutcome::Invoked,
            Ok(Err(e)) => {
                log::warn!("Disk operation failed: {}", e);
                InvokeOutcome::Failed(e)
            }
            Err(e) => InvokeOutcome::Failed(MenuError::SystemError(e.to_string())),
        }
    }
}

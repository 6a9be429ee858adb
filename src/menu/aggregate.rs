//! The cancellable pipeline: fetch raw entries from the shell, normalize,
//! partition overflow, fill icons, expose the tree.
//!
//! A half-built menu must never be shown: any cancellation observed along the
//! way discards everything built so far and yields an empty tree. Starting a
//! new build does not cancel a prior in-flight one; the caller owns the token
//! lifecycle and must cancel the previous flag before reusing a presentation
//! target.

use crate::menu::icons::materialize_icons;
use crate::menu::normalize::normalize_level;
use crate::menu::overflow::apply_overflow;
use crate::menu::CancellationFlag;
use crate::models::{MenuConfig, MenuEntry, VerbFilter};
use crate::shell::{EnumerateFlags, ShellMenuSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildStage {
    Idle,
    Fetching,
    Normalizing,
    Partitioning,
    IconFilling,
    Ready,
    Cancelled,
}

fn advance(stage: &mut BuildStage, next: BuildStage) {
    log::debug!("Menu build: {:?} -> {:?}", stage, next);
    *stage = next;
}

pub struct MenuAggregator {
    shell: Arc<dyn ShellMenuSource>,
    filter: Arc<VerbFilter>,
    config: MenuConfig,
}

impl MenuAggregator {
    /// The verb filter is derived from the config, so `show_open_menu` and
    /// the filter applied during enumeration can never disagree.
    pub fn new(shell: Arc<dyn ShellMenuSource>, config: MenuConfig) -> Self {
        let filter = Arc::new(VerbFilter::new(config.show_open_menu));
        MenuAggregator { shell, filter, config }
    }

    /// Adds host-resolved verbs (e.g. localized labels looked up at startup)
    /// to the exclusion filter.
    pub fn with_extra_filtered_verbs<I, S>(mut self, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Arc::new((*self.filter).clone().with_extra(verbs));
        self
    }

    /// Builds the menu tree for one menu-open event. Returns an empty tree on
    /// cancellation or enumeration failure; neither is fatal to the host.
    pub async fn build(&self, target_paths: &[PathBuf], cancel: &CancellationFlag) -> Vec<MenuEntry> {
        let mut stage = BuildStage::Idle;

        if cancel.is_cancelled() {
            advance(&mut stage, BuildStage::Cancelled);
            return Vec::new();
        }

        advance(&mut stage, BuildStage::Fetching);
        let shell = Arc::clone(&self.shell);
        let filter = Arc::clone(&self.filter);
        let paths = target_paths.to_vec();
        let flags = EnumerateFlags { extended_verbs: self.config.extended_verbs };

        let raw = match tokio::task::spawn_blocking(move || shell.enumerate(&paths, flags, &filter)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                log::warn!("Shell enumeration failed: {}", e);
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Shell enumeration task failed: {}", e);
                return Vec::new();
            }
        };

        if cancel.is_cancelled() {
            advance(&mut stage, BuildStage::Cancelled);
            return Vec::new();
        }

        advance(&mut stage, BuildStage::Normalizing);
        let entries = normalize_level(raw, cancel);
        if cancel.is_cancelled() {
            advance(&mut stage, BuildStage::Cancelled);
            return Vec::new();
        }

        advance(&mut stage, BuildStage::Partitioning);
        let mut entries = apply_overflow(entries, self.config.max_visible_items);
        if cancel.is_cancelled() {
            advance(&mut stage, BuildStage::Cancelled);
            return Vec::new();
        }

        if self.config.show_icons {
            advance(&mut stage, BuildStage::IconFilling);
            let timeout = Duration::from_millis(self.config.icon_timeout_ms);
            materialize_icons(&mut entries, timeout, cancel).await;
        }

        // Cancellation after the work finished still discards the tree.
        if cancel.is_cancelled() {
            advance(&mut stage, BuildStage::Cancelled);
            return Vec::new();
        }

        advance(&mut stage, BuildStage::Ready);
        entries
    }
}

/// Detaches the "Open with" submenu (shell verb `openas`) from a built level
/// so the host can present it separately. Returns its children, if present.
pub fn take_open_with_items(entries: &mut Vec<MenuEntry>) -> Option<Vec<MenuEntry>> {
    let pos = entries.iter().position(|e| {
        e.tag
            .as_ref()
            .and_then(|t| t.verb.as_deref())
            .is_some_and(|v| v == "openas")
    })?;
    let item = entries.remove(pos);
    Some(item.children)
}

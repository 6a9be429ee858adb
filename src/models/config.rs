use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-menu-build options supplied by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuConfig {
    /// Non-separator entries shown before the rest folds into "More options".
    pub max_visible_items: usize,
    pub show_icons: bool,
    /// Bounded wait per icon decode; a corrupt or slow icon must never stall
    /// menu construction.
    pub icon_timeout_ms: u64,
    /// Ask the shell for extended (shift-click) verbs.
    pub extended_verbs: bool,
    /// Include the generic "open" verb in the aggregated menu.
    pub show_open_menu: bool,
}

impl Default for MenuConfig {
    fn default() -> Self {
        MenuConfig {
            max_visible_items: usize::MAX, // no overflow unless the host asks
            show_icons: true,
            icon_timeout_ms: 10,
            extended_verbs: false,
            show_open_menu: false,
        }
    }
}

/// Verbs the host renders through its own commands; the shell-reported
/// duplicates are filtered out of the aggregated menu.
static KNOWN_VERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "opennew",
        "opencontaining",
        "opennewprocess",
        "runas",
        "runasuser",
        "pintohome",
        "PinToStartScreen",
        "cut",
        "copy",
        "paste",
        "delete",
        "properties",
        "link",
        "Windows.ModernShare",
        "Windows.Share",
        "setdesktopwallpaper",
        "eject",
        "rename",
        "explore",
        "openinfiles",
        "extract",
        "copyaspath",
        "undelete",
        "empty",
    ])
});

/// Decides which shell verbs are excluded from enumeration. Built once per
/// session and read-only afterwards, so concurrent builds can share it
/// without synchronization.
#[derive(Debug, Clone)]
pub struct VerbFilter {
    allow_open: bool,
    /// Host-supplied additions, e.g. localized labels resolved from shell
    /// resources at startup.
    extra: Vec<String>,
}

impl VerbFilter {
    pub fn new(show_open_menu: bool) -> Self {
        VerbFilter {
            allow_open: show_open_menu,
            extra: Vec::new(),
        }
    }

    pub fn with_extra<I, S>(mut self, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra.extend(verbs.into_iter().map(Into::into));
        self
    }

    /// True if the verb must not appear in the aggregated menu.
    pub fn excludes(&self, verb: &str) -> bool {
        if verb.is_empty() {
            return false;
        }
        if KNOWN_VERBS.contains(verb) || self.extra.iter().any(|v| v == verb) {
            return true;
        }
        !self.allow_open && verb.eq_ignore_ascii_case("open")
    }
}

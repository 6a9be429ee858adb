//! Converts the raw, OS-reported entry list into the clean menu tree.
//!
//! Sibling order preserves the OS enumeration order; separators are deduped
//! while scanning and the edges of each level are trimmed once the whole level
//! (including later siblings) has been emitted.

use crate::menu::CancellationFlag;
use crate::models::{MenuEntry, RawEntryKind, RawMenuEntry};
use crate::utils::strip_mnemonics;
use std::sync::Arc;

/// Normalizes one sibling level. Returns an empty level when cancellation is
/// requested; the orchestrator is responsible for discarding the whole build.
pub fn normalize_level(raw: Vec<RawMenuEntry>, cancel: &CancellationFlag) -> Vec<MenuEntry> {
    let mut out: Vec<MenuEntry> = Vec::with_capacity(raw.len());

    for mut item in raw {
        if cancel.is_cancelled() {
            return Vec::new();
        }

        match item.kind {
            RawEntryKind::Separator => {
                if !matches!(out.last(), Some(prev) if prev.is_separator()) {
                    out.push(MenuEntry::separator());
                }
            }
            RawEntryKind::SubMenu => {
                let children = normalize_level(std::mem::take(&mut item.children), cancel);
                let label = strip_mnemonics(&item.label);
                // An entry that resolves to an empty submenu vanishes; a
                // trimmed level is empty iff it has no non-separator child.
                if !label.is_empty() && !children.is_empty() {
                    let id = item.id;
                    out.push(MenuEntry::submenu(id, label, children, Some(Arc::new(item))));
                }
            }
            RawEntryKind::Action => {
                let label = strip_mnemonics(&item.label);
                if label.is_empty() {
                    continue;
                }
                let id = item.id;
                let verb = item.verb.clone();
                out.push(MenuEntry::action(id, label, verb, Some(Arc::new(item))));
            }
        }
    }

    trim_edge_separators(&mut out);
    out
}

/// Drops leading and trailing separators from a sibling list.
pub fn trim_edge_separators(entries: &mut Vec<MenuEntry>) {
    while matches!(entries.first(), Some(e) if e.is_separator()) {
        entries.remove(0);
    }
    while matches!(entries.last(), Some(e) if e.is_separator()) {
        entries.pop();
    }
}

/// Re-establishes the separator invariants on an already-built list, used when
/// two normalized lists are concatenated (overflow append).
pub fn tidy_separators(entries: Vec<MenuEntry>) -> Vec<MenuEntry> {
    let mut out: Vec<MenuEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.is_separator() && matches!(out.last(), Some(prev) if prev.is_separator()) {
            continue;
        }
        out.push(entry);
    }
    trim_edge_separators(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MenuEntryKind;

    fn sep() -> RawMenuEntry {
        RawMenuEntry::separator()
    }

    fn kinds(entries: &[MenuEntry]) -> Vec<MenuEntryKind> {
        entries.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_separator_edges_and_duplicates_are_removed() {
        let raw = vec![
            sep(),
            RawMenuEntry::action(1, "Copy", Some("copy")),
            sep(),
            sep(),
            RawMenuEntry::action(2, "Paste", Some("paste")),
            sep(),
        ];

        let entries = normalize_level(raw, &CancellationFlag::new());

        assert_eq!(
            kinds(&entries),
            vec![MenuEntryKind::Action, MenuEntryKind::Separator, MenuEntryKind::Action]
        );
        assert_eq!(entries[0].label, "Copy");
        assert_eq!(entries[2].label, "Paste");
    }

    #[test]
    fn test_mnemonics_are_stripped_from_labels() {
        let raw = vec![RawMenuEntry::action(1, "&Extract here", Some("extracthere"))];
        let entries = normalize_level(raw, &CancellationFlag::new());
        assert_eq!(entries[0].label, "Extract here");
    }

    #[test]
    fn test_empty_label_actions_are_dropped() {
        let raw = vec![
            RawMenuEntry::action(1, "", None),
            RawMenuEntry::action(2, "Scan", Some("scan")),
        ];
        let entries = normalize_level(raw, &CancellationFlag::new());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, Some(2));
    }

    #[test]
    fn test_empty_submenu_vanishes_silently() {
        let raw = vec![
            RawMenuEntry::action(1, "Scan", None),
            RawMenuEntry::submenu(2, "Send to", vec![sep(), sep()]),
            RawMenuEntry::submenu(3, "", vec![RawMenuEntry::action(4, "Desktop", None)]),
        ];

        let entries = normalize_level(raw, &CancellationFlag::new());

        assert_eq!(entries.len(), 1);
        assert!(entries.iter().all(|e| e.children.is_empty()));
    }

    #[test]
    fn test_vanished_submenu_does_not_leave_adjacent_separators() {
        let raw = vec![
            RawMenuEntry::action(1, "Scan", None),
            sep(),
            RawMenuEntry::submenu(2, "Send to", Vec::new()),
            sep(),
            RawMenuEntry::action(3, "Share", None),
        ];

        let entries = normalize_level(raw, &CancellationFlag::new());

        assert_eq!(
            kinds(&entries),
            vec![MenuEntryKind::Action, MenuEntryKind::Separator, MenuEntryKind::Action]
        );
    }

    #[test]
    fn test_nested_submenu_is_normalized_recursively() {
        let raw = vec![RawMenuEntry::submenu(
            1,
            "&New",
            vec![
                sep(),
                RawMenuEntry::action(2, "Folder", None),
                sep(),
                RawMenuEntry::action(3, "Shortcut", None),
                sep(),
            ],
        )];

        let entries = normalize_level(raw, &CancellationFlag::new());

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, MenuEntryKind::Submenu);
        assert_eq!(entries[0].label, "New");
        assert_eq!(
            kinds(&entries[0].children),
            vec![MenuEntryKind::Action, MenuEntryKind::Separator, MenuEntryKind::Action]
        );
    }

    #[test]
    fn test_os_order_is_preserved() {
        let raw = vec![
            RawMenuEntry::action(1, "First", None),
            RawMenuEntry::action(2, "Second", None),
            RawMenuEntry::action(3, "Third", None),
        ];
        let entries = normalize_level(raw, &CancellationFlag::new());
        let ids: Vec<_> = entries.iter().map(|e| e.id.unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_cancellation_yields_an_empty_level() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let raw = vec![RawMenuEntry::action(1, "Copy", None)];
        assert!(normalize_level(raw, &cancel).is_empty());
    }

    #[test]
    fn test_tags_keep_the_raw_entry_reachable() {
        let mut raw = RawMenuEntry::action(9, "Mount", Some("mount"));
        raw.icon = vec![1, 2, 3];

        let entries = normalize_level(vec![raw], &CancellationFlag::new());

        let tag = entries[0].tag.as_ref().unwrap();
        assert_eq!(tag.id, 9);
        assert_eq!(tag.icon, vec![1, 2, 3]);
    }

    #[test]
    fn test_tidy_separators_rejoins_lists_cleanly() {
        let joined = vec![
            MenuEntry::separator(),
            MenuEntry::action(1, "A".into(), None, None),
            MenuEntry::separator(),
            MenuEntry::separator(),
            MenuEntry::action(2, "B".into(), None, None),
            MenuEntry::separator(),
        ];

        let tidied = tidy_separators(joined);

        assert_eq!(tidied.len(), 3);
        assert!(!tidied.first().unwrap().is_separator());
        assert!(!tidied.last().unwrap().is_separator());
    }
}

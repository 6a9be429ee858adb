//! Folds entries beyond the visible-count threshold into a single synthetic
//! "More options" submenu.

use crate::menu::normalize::{tidy_separators, trim_edge_separators};
use crate::models::{MenuEntry, OVERFLOW_MENU_ID, OVERFLOW_MENU_LABEL};

/// Splits `entries` so that at most `max_items` non-separator entries stay
/// visible and the remainder lands in the overflow container.
///
/// Separators never count toward the threshold. The container itself is
/// exempt from counting and from overflow, which makes the operation
/// idempotent: partitioning an already-partitioned level with the same
/// threshold is a no-op.
pub fn apply_overflow(entries: Vec<MenuEntry>, max_items: usize) -> Vec<MenuEntry> {
    let mut visible: Vec<MenuEntry> = Vec::with_capacity(entries.len());
    let mut overflow: Vec<MenuEntry> = Vec::new();

    let mut count = 0usize;
    let mut overflowing = false;
    for entry in entries {
        if !overflowing && !entry.is_separator() && !entry.is_overflow_container() {
            count += 1;
            if count > max_items {
                overflowing = true;
            }
        }
        if overflowing {
            overflow.push(entry);
        } else {
            visible.push(entry);
        }
    }

    trim_edge_separators(&mut visible);
    trim_edge_separators(&mut overflow);

    if overflow.iter().all(|e| e.is_separator()) {
        return visible;
    }

    match visible.iter_mut().find(|e| e.is_overflow_container()) {
        Some(container) => {
            let mut children = std::mem::take(&mut container.children);
            children.append(&mut overflow);
            container.children = tidy_separators(children);
        }
        None => {
            let container = MenuEntry::submenu(
                OVERFLOW_MENU_ID,
                OVERFLOW_MENU_LABEL.to_string(),
                overflow,
                None,
            );
            visible.insert(0, container);
        }
    }

    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::normalize::normalize_level;
    use crate::menu::CancellationFlag;
    use crate::models::RawMenuEntry;

    fn actions(n: usize) -> Vec<MenuEntry> {
        (1..=n as i32)
            .map(|i| MenuEntry::action(i, format!("Item {}", i), None, None))
            .collect()
    }

    fn containers(entries: &[MenuEntry]) -> usize {
        entries.iter().filter(|e| e.is_overflow_container()).count()
    }

    #[test]
    fn test_twelve_actions_with_threshold_eight() {
        let visible = apply_overflow(actions(12), 8);

        assert_eq!(visible.len(), 9);
        assert_eq!(containers(&visible), 1);

        let container = &visible[0];
        assert!(container.is_overflow_container());
        assert_eq!(container.children.len(), 4);
        let overflow_ids: Vec<_> = container.children.iter().map(|e| e.id.unwrap()).collect();
        assert_eq!(overflow_ids, vec![9, 10, 11, 12]);
    }

    #[test]
    fn test_below_threshold_is_untouched() {
        let visible = apply_overflow(actions(5), 8);
        assert_eq!(visible.len(), 5);
        assert_eq!(containers(&visible), 0);
    }

    #[test]
    fn test_partition_is_idempotent() {
        let once = apply_overflow(actions(12), 8);
        let twice = apply_overflow(once.clone(), 8);

        assert_eq!(twice.len(), once.len());
        assert_eq!(containers(&twice), 1);
        assert_eq!(twice[0].children.len(), once[0].children.len());
    }

    #[test]
    fn test_existing_container_absorbs_further_overflow() {
        let mut entries = actions(10);
        entries.insert(
            0,
            MenuEntry::submenu(
                crate::models::OVERFLOW_MENU_ID,
                OVERFLOW_MENU_LABEL.to_string(),
                actions(2),
                None,
            ),
        );

        let visible = apply_overflow(entries, 8);

        assert_eq!(containers(&visible), 1);
        // 2 pre-existing children + items 9 and 10
        assert_eq!(visible[0].children.len(), 4);
    }

    #[test]
    fn test_separators_do_not_count_toward_threshold() {
        let mut entries = Vec::new();
        for i in 1..=4 {
            entries.push(MenuEntry::action(i, format!("Item {}", i), None, None));
            entries.push(MenuEntry::separator());
        }

        let visible = apply_overflow(entries, 4);

        assert_eq!(containers(&visible), 0);
        assert_eq!(visible.iter().filter(|e| !e.is_separator()).count(), 4);
    }

    #[test]
    fn test_overflowed_separators_are_kept_only_as_delimiters() {
        let entries = vec![
            MenuEntry::action(1, "A".into(), None, None),
            MenuEntry::action(2, "B".into(), None, None),
            MenuEntry::separator(),
            MenuEntry::action(3, "C".into(), None, None),
            MenuEntry::separator(),
            MenuEntry::action(4, "D".into(), None, None),
        ];

        let visible = apply_overflow(entries, 2);

        let container = &visible[0];
        assert!(container.is_overflow_container());
        assert!(!container.children.first().unwrap().is_separator());
        assert!(!container.children.last().unwrap().is_separator());
        assert_eq!(container.children.iter().filter(|e| !e.is_separator()).count(), 2);
    }

    #[test]
    fn test_overflow_of_only_separators_is_dropped() {
        let entries = vec![
            MenuEntry::action(1, "A".into(), None, None),
            MenuEntry::action(2, "B".into(), None, None),
            MenuEntry::separator(),
        ];

        let visible = apply_overflow(entries, 2);

        assert_eq!(containers(&visible), 0);
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn test_shell_submenu_with_popup_sentinel_id_is_not_the_container() {
        // GetMenuItemID reports -1 for items that open submenus; such an
        // entry must count toward the threshold and never absorb overflow.
        let mut raw = vec![RawMenuEntry::submenu(
            -1,
            "Send to",
            vec![RawMenuEntry::action(100, "Desktop", None)],
        )];
        raw.extend((1..=6).map(|i| RawMenuEntry::action(i, &format!("Item {}", i), None)));
        let entries = normalize_level(raw, &CancellationFlag::new());

        let visible = apply_overflow(entries, 4);

        assert_eq!(containers(&visible), 1);
        assert!(visible[0].is_overflow_container());
        assert_eq!(visible[0].children.len(), 3);

        let send_to = visible.iter().find(|e| e.label == "Send to").unwrap();
        assert_eq!(send_to.children.len(), 1);
        assert_eq!(send_to.children[0].label, "Desktop");
    }

    #[test]
    fn test_container_uniqueness_holds_for_normalized_input() {
        let raw: Vec<RawMenuEntry> = (1..=20)
            .map(|i| RawMenuEntry::action(i, &format!("Item {}", i), None))
            .collect();
        let entries = normalize_level(raw, &CancellationFlag::new());

        let visible = apply_overflow(apply_overflow(entries, 6), 6);

        assert_eq!(containers(&visible), 1);
    }
}

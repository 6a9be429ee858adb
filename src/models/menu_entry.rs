use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Synthetic id of the "More options" overflow container. `GetMenuItemID`
/// reports `(UINT)-1` for items that open submenus, so `-1` does reach the
/// engine from real scrapes; the container is recognized by this id plus the
/// absence of a raw-entry tag, which no scraped entry can reproduce.
pub const OVERFLOW_MENU_ID: i32 = i32::MIN;

pub const OVERFLOW_MENU_LABEL: &str = "More options";

/// One menu item as reported by the shell-enumeration capability, before any
/// normalization. This is the external wire shape, not something we own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMenuEntry {
    pub id: i32,
    pub label: String,
    pub verb: Option<String>,
    pub kind: RawEntryKind,
    /// Encoded icon bytes (PNG/BMP) scraped from the menu item, empty if none.
    #[serde(default)]
    pub icon: Vec<u8>,
    #[serde(default)]
    pub children: Vec<RawMenuEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RawEntryKind {
    Action,
    Separator,
    SubMenu,
}

impl RawMenuEntry {
    pub fn separator() -> Self {
        RawMenuEntry {
            id: 0,
            label: String::new(),
            verb: None,
            kind: RawEntryKind::Separator,
            icon: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn action(id: i32, label: &str, verb: Option<&str>) -> Self {
        RawMenuEntry {
            id,
            label: label.to_string(),
            verb: verb.map(|v| v.to_string()),
            kind: RawEntryKind::Action,
            icon: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn submenu(id: i32, label: &str, children: Vec<RawMenuEntry>) -> Self {
        RawMenuEntry {
            id,
            label: label.to_string(),
            verb: None,
            kind: RawEntryKind::SubMenu,
            icon: Vec::new(),
            children,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MenuEntryKind {
    Action,
    Separator,
    Submenu,
}

/// A decoded, display-ready icon. `data` holds PNG-encoded RGBA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuIcon {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// One node of the normalized menu tree handed to the presentation layer.
///
/// The tree is immutable once built, except for `icon`, which transitions from
/// `None` to `Some` at most once while decodes are in flight.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub kind: MenuEntryKind,
    /// Originating OS id; unique within its sibling list only. Absent for
    /// separators.
    pub id: Option<i32>,
    /// Display label with mnemonic markers stripped.
    pub label: String,
    pub icon: Option<MenuIcon>,
    pub verb: Option<String>,
    pub children: Vec<MenuEntry>,
    /// Back-reference to the raw entry, dereferenced only while the menu
    /// session is alive (invocation, icon decode). Never serialized.
    #[serde(skip)]
    pub tag: Option<Arc<RawMenuEntry>>,
}

impl MenuEntry {
    pub fn separator() -> Self {
        MenuEntry {
            kind: MenuEntryKind::Separator,
            id: None,
            label: String::new(),
            icon: None,
            verb: None,
            children: Vec::new(),
            tag: None,
        }
    }

    pub fn action(id: i32, label: String, verb: Option<String>, tag: Option<Arc<RawMenuEntry>>) -> Self {
        MenuEntry {
            kind: MenuEntryKind::Action,
            id: Some(id),
            label,
            icon: None,
            verb,
            children: Vec::new(),
            tag,
        }
    }

    pub fn submenu(id: i32, label: String, children: Vec<MenuEntry>, tag: Option<Arc<RawMenuEntry>>) -> Self {
        MenuEntry {
            kind: MenuEntryKind::Submenu,
            id: Some(id),
            label,
            icon: None,
            verb: None,
            children,
            tag,
        }
    }

    pub fn is_separator(&self) -> bool {
        self.kind == MenuEntryKind::Separator
    }

    pub fn is_overflow_container(&self) -> bool {
        self.kind == MenuEntryKind::Submenu && self.id == Some(OVERFLOW_MENU_ID) && self.tag.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_camel_case_without_tag() {
        let entry = MenuEntry::action(7, "Open archive".to_string(), Some("extract".to_string()), None);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["kind"], "action");
        assert_eq!(json["id"], 7);
        assert_eq!(json["verb"], "extract");
        assert!(json.get("tag").is_none());
    }

    #[test]
    fn test_tagged_entries_never_match_the_overflow_container() {
        let raw = Arc::new(RawMenuEntry::submenu(OVERFLOW_MENU_ID, "Send to", Vec::new()));
        let scraped = MenuEntry::submenu(OVERFLOW_MENU_ID, "Send to".to_string(), Vec::new(), Some(raw));
        assert!(!scraped.is_overflow_container());

        let container =
            MenuEntry::submenu(OVERFLOW_MENU_ID, OVERFLOW_MENU_LABEL.to_string(), Vec::new(), None);
        assert!(container.is_overflow_container());
    }

    #[test]
    fn test_raw_entry_round_trips() {
        let raw = RawMenuEntry::submenu(3, "Send &to", vec![RawMenuEntry::action(4, "Desktop", None)]);
        let json = serde_json::to_string(&raw).unwrap();
        let back: RawMenuEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(back.kind, RawEntryKind::SubMenu);
        assert_eq!(back.children.len(), 1);
    }
}

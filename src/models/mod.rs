pub mod config;
pub mod error;
pub mod menu_entry;

pub use error::MenuError;
pub type Result<T> = std::result::Result<T, MenuError>;

pub use config::{MenuConfig, VerbFilter};
pub use menu_entry::{
    MenuEntry, MenuEntryKind, MenuIcon, RawEntryKind, RawMenuEntry, OVERFLOW_MENU_ID,
    OVERFLOW_MENU_LABEL,
};

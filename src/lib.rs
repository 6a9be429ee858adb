pub mod menu;
pub mod models;
pub mod shell;
pub mod utils;

pub use menu::aggregate::{take_open_with_items, MenuAggregator};
pub use menu::dispatch::{InvokeOutcome, MenuVerb, VerbDispatcher};
pub use menu::CancellationFlag;
pub use models::{
    MenuConfig, MenuEntry, MenuEntryKind, MenuError, MenuIcon, RawEntryKind, RawMenuEntry,
    VerbFilter,
};
pub use shell::{DiskServices, EnumerateFlags, FontInstaller, ShellMenuSource};

/// Initializes logging for hosts that do not bring their own subscriber.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

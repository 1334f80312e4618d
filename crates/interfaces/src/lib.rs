pub mod permissions;
pub mod settings_query;
pub mod terminal;

pub use permissions::ConfiguredPermissions;
pub use settings_query::SettingsStateQuery;
pub use terminal::{
    parse_input, InputError, InputLine, LogNotifier, TerminalInput, TerminalOverlayHost,
};

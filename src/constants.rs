// settings
pub const DEFAULT_TIME_WINDOW_SECS: u32 = 10;
pub const MIN_TIME_WINDOW_SECS: u32 = 3;
pub const MAX_TIME_WINDOW_SECS: u32 = 60;
pub const CONFIG_DIR_NAME: &str = "vault-undo";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

// ui
pub const MAX_ITEMS_TO_SHOW: usize = 10;
pub const SHELL_PROMPT: &str = "vault-undo> ";

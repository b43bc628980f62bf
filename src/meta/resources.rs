//! Locations of the files that the customizer reads and writes. Everything is relative to the
//! game's working directory, which is the folder containing the game executable.

use std::path::PathBuf;

/// The name of the level document, as shown to the user in error messages.
pub const CONFIG_FILE_NAME: &str = "levelCustomizer.json";

/// The folder (relative to the working directory) that holds the level document.
const CONFIG_DIR: &str = "Resources";

/// Returns the path of the level document.
pub fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join(CONFIG_FILE_NAME)
}

/// Returns the path of the log file.
pub fn log_path() -> PathBuf {
    PathBuf::from("levelCustomizer.log")
}

/// Returns the path that panic reports are written to.
pub fn panic_path() -> PathBuf {
    PathBuf::from("levelCustomizer-panic.txt")
}

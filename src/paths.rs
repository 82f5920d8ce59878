use std::path::PathBuf;

/// Name of the per-user data directory under the home directory.
const VISION_DIR_NAME: &str = ".nano-wait";

/// Returns the per-user data directory: `<home>/.nano-wait/`
///
/// Falls back to the current directory when no home directory is known.
pub fn get_vision_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(VISION_DIR_NAME)
}

/// Returns the default pattern file: `<home>/.nano-wait/vision_patterns.json`
pub fn get_patterns_file() -> PathBuf {
    get_vision_dir().join("vision_patterns.json")
}

/// Returns the default config file: `<home>/.nano-wait/config.json`
pub fn get_config_file() -> PathBuf {
    get_vision_dir().join("config.json")
}

/// Returns the logs directory: `<home>/.nano-wait/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_vision_dir().join("logs")
}

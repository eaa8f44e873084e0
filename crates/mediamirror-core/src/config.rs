use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

/// Process-wide settings, as opposed to the per-mirror `mirror.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Mirror root used when a command is given no `--root`.
    pub root: String,
    /// Executable used to resolve metadata and download media.
    pub downloader: String,
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_from("mediamirror")
}

/// Defaults, then the optional file `<name>.toml`, then `MIRROR_*` variables.
pub fn load_from(name: &str) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .set_default("root", ".")?
        .set_default("downloader", crate::provider::ytdlp::DEFAULT_PROGRAM)?
        .add_source(ConfigFile::with_name(name).required(false))
        .add_source(Environment::with_prefix("MIRROR").try_parsing(true))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid url '{0}': not a channel, playlist or video link")]
    InvalidUrl(String),

    #[error("could not parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not access {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize mirror config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("could not fetch metadata for {url}: {message}")]
    RemoteFetch { url: String, message: String },

    #[error("download of {path} failed: {message}")]
    Fetch { path: String, message: String },

    #[error("record store error: {0}")]
    Store(#[from] rocksdb::Error),

    #[error("record codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mirror at {} is in use by another process", .0.display())]
    Locked(PathBuf),

    #[error("{} is not an initialized mirror (run `init` first)", .0.display())]
    NotInitialized(PathBuf),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

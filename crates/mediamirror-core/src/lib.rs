pub mod config;
pub mod engine;
pub mod error;
pub mod mirror_config;
pub mod model;
pub mod paths;
pub mod progress;
pub mod provider;
pub mod report;
pub mod storage;

pub use config::AppConfig;
pub use engine::{
    init, show, AddOutcome, AddReport, GroupUpdate, InitReport, MirrorEngine, RemoveOutcome,
    RemoveReport, SyncOutcome, SyncReport, UpdateOutcome, UpdateReport, VerifyReport,
};
pub use error::{Error, Result};
pub use mirror_config::options::{OptionOverlay, OptionSet, Resolution};
pub use model::{FileKind, GroupKind, RemoteKind};
pub use progress::{Confirm, ProgressReporter, SilentReporter};
pub use provider::{Fetcher, MetadataCache, SourceProvider};
pub use report::{human_readable_size, ShowEntry};

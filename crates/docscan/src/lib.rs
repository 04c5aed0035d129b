pub mod categorizer;
pub mod config;
pub mod error;
pub mod media;
pub mod notify;
pub mod pipeline;
pub mod processor;
pub mod record;
pub mod remote;
pub mod sanitize;
pub mod scanner;
pub mod secrets;
pub mod stats;
pub mod storage;

pub use categorizer::DocumentClassifier;
pub use config::{load_config, load_config_from_str, DocumentProfile, ServerSettings, Settings};
pub use error::{ArchiveError, ConfigError, DocscanError, ExtractError, Result, StatisticsError};
pub use media::{ContentSniffer, MediaSniffer};
pub use notify::{DisabledNotifier, Notifier, NotifyError, SpoolNotifier};
pub use pipeline::{Pipeline, ProcessOutcome, RunSummary};
pub use processor::{apply_thread_limit, IdentityResolver, OcrEngine, RegionExtractor, TesseractEngine};
pub use record::{DocumentRecord, SyncState};
pub use remote::{RemoteError, RemoteStore, RemoteSync, SyncError, XmlRpcStore};
pub use scanner::{classify_path_arg, expand_path_args, PathArg};
pub use secrets::{resolve_secret, SecretError};
pub use stats::RankStatistics;
pub use storage::Archivist;

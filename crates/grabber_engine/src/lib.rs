//! Grabber engine: page loading, extraction, storage and the run coordinator.
mod browser;
mod config;
mod coordinator;
mod decode;
mod error;
mod events;
mod export;
mod extract;
mod fetch;
mod filename;
mod persist;
mod state_store;
mod store;
mod types;
mod visit;
mod wait;

pub use browser::{Browser, HttpBrowser, Page};
pub use config::{ConfigError, EngineConfig, DEFAULT_BASE_URL, DEFAULT_STATE_FILE};
pub use coordinator::{Coordinator, RunRequest, RunSummary};
pub use decode::{decode_page, DecodedPage};
pub use error::GrabError;
pub use events::{ChannelEventSink, EventSink, LogEventSink};
pub use export::{load_changes, ChangesExporter, ExportError};
pub use extract::{extract_app_listing, inspect_patchnotes, AppListing, DepotAnchor, DiffSection};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::changes_filename;
pub use persist::{ensure_output_dir, write_atomic, AtomicFileWriter, PersistError};
pub use state_store::StateStore;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, GrabEvent, VisitOutcome};
pub use visit::{PageReport, PageRuntime};
pub use wait::{poll_until, PollSettings, WaitError};

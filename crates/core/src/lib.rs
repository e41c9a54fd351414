pub mod config;
pub mod gc;
pub mod index;
pub mod metrics;
pub mod origin;
pub mod poller;
pub mod stream;
pub mod sync;
pub mod testing;
pub mod tree;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    DirectoryNaming, GcConfig, LibraryConfig, OriginConfig, PollerConfig, SanitizedConfig,
    ServerConfig, SyncConfig,
};
pub use gc::{GarbageCollector, GcReport};
pub use index::{IndexError, IndexStats, IndexTx, SqliteIndex};
pub use origin::{OriginError, RealDebridClient, RemoteOrigin};
pub use poller::{ChangePoller, IntervalPoller, PollError, PollEvent, PollHandler, PollerHandle};
pub use stream::{FileStat, StreamError, StreamResolver, StreamUrl};
pub use sync::{
    IngestOutcome, Reconciler, ReconcilerStatus, SyncError, SyncReport, TeardownMode,
    TriggerSource,
};
pub use tree::{FileTree, NodeId, SqliteTree, TreeError, TreeNode};

pub mod config;
pub mod engine;
pub mod matcher;
pub mod schedule;
pub mod session;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use config::{ChatConfig, ConfigFile, Variant};
pub use engine::{DelaySchedule, Effect, ResponseEngine, Script, Step, Tip};
pub use matcher::{KeywordMatcher, MatchMode};
pub use schedule::{Clock, ManualClock, SystemClock, TaskHandle, TaskQueue};
pub use session::{ChatSession, Outcome};
pub use state::{ChatMessage, Sender};
pub use store::{
    default_data_dir, load_history, open_store, save_history, FileStore, HistoryStore, MemoryStore,
    SqliteStore, StoreKind, HISTORY_KEY,
};

//! Howlthorne Core - Point Ledger and Leaderboard Engine
//!
//! This crate owns everything the bot knows independent of Discord:
//! the class catalog, the per-slot point ledger and its JSON documents,
//! the standings derived from it and the debounced refresh scheduler.

pub mod class;
pub mod config;
pub mod error;
pub mod id;
pub mod ledger;
pub mod scheduler;
pub mod standings;
pub mod store;

pub use class::{ClassId, ClassInfo, MAX_POINTS};
pub use config::BotConfig;
pub use error::{CoreError, Result, ValidationError};
pub use id::{LedgerKey, Slot, UserId};
pub use ledger::{ClassScore, Ledger, PointChange, RemovalSummary, parse_amount};
pub use scheduler::{RefreshScheduler, RefreshTarget};
pub use standings::{ChampionChange, ClassStanding, Standing};
pub use store::LedgerStore;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        BotConfig, ChampionChange, ClassId, ClassInfo, ClassScore, ClassStanding, CoreError,
        Ledger, LedgerKey, LedgerStore, MAX_POINTS, PointChange, RefreshScheduler, RefreshTarget,
        RemovalSummary, Result, Slot, Standing, UserId, ValidationError,
    };
}

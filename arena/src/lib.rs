//! # Arena
//!
//! Swiss-style squad tournament engine: ranks squads and players after each
//! round and pairs the next one.
//!
//! ## Architecture
//!
//! A round advance flows through four parts:
//!
//! - **Prizes**: each prize binds one scoring and one tiebreak variant
//! - **Standings**: every prize is ranked for the round just completed
//! - **Pairing**: the primary squad prize ranking is paired adjacently,
//!   avoiding rematches; members are sub-paired by individual rank
//! - **Rounds**: the per-tournament state machine that runs the above and
//!   stores the new round with its pairings in one step
//!
//! Persistence and the player directory sit behind the traits in [`db`];
//! PostgreSQL and in-memory implementations are provided.
//!
//! ## Example
//!
//! ```
//! use arena::db::{MemoryArenaRepository, MemoryPlayerDirectory, TimeoutConfig};
//! use arena::{RoundManager, StaticPrizeCatalog};
//! use std::sync::Arc;
//!
//! let manager = RoundManager::new(
//!     Arc::new(MemoryArenaRepository::new()),
//!     Arc::new(MemoryPlayerDirectory::new()),
//!     Arc::new(StaticPrizeCatalog::default()),
//!     TimeoutConfig::default(),
//! );
//! # let _ = manager;
//! ```

/// Persistence traits, PostgreSQL and in-memory implementations, timeouts.
pub mod db;

pub mod errors;
pub use errors::{ArenaError, ArenaResult};

pub mod models;

/// Round pairing: Swiss draw and member sub-pairing.
pub mod pairing;
pub use pairing::PairingEngine;

/// Prizes with their scoring and tiebreak variants.
pub mod prizes;
pub use prizes::{Prize, PrizeCatalog, ScoringRules, StaticPrizeCatalog};

pub mod roster;

pub mod rounds;
pub use rounds::{RoundManager, RoundState};

pub mod standings;
pub use standings::StandingsCalculator;

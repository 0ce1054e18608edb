#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Persistence adapter that saves and restores sessions through a key-value store.
//!
//! A save captures the player and the overlay of modified cells. Baselines are
//! never written; they are regenerated on load.

pub mod codec;
pub mod save_code;
mod store;

pub use codec::{CorruptBlob, SaveBlob, SavedCell};
pub use save_code::SaveCodeError;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

use geotoken_core::WorldSnapshot;
use geotoken_world::{query, World};
use log::{debug, info};
use thiserror::Error;

/// Key under which the session blob is stored.
pub const SAVE_KEY: &str = "geotoken.save";

/// Failures while writing a save.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The snapshot could not be serialised.
    #[error("failed to serialise the session")]
    Serialize(#[from] serde_json::Error),
    /// The store rejected the write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures while reading a save. All of them leave the running session untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No session has been saved yet.
    #[error("no saved session found")]
    Missing,
    /// The stored blob is malformed.
    #[error("saved session is corrupt")]
    Corrupt(#[from] CorruptBlob),
    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Saves and restores sessions in a [`KeyValueStore`].
#[derive(Debug)]
pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    /// Wraps the provided store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Writes the current state of `world`.
    pub fn save(&mut self, world: &World) -> Result<(), SaveError> {
        self.save_snapshot(&query::snapshot(world))
    }

    /// Writes `snapshot`, replacing any previous save.
    pub fn save_snapshot(&mut self, snapshot: &WorldSnapshot) -> Result<(), SaveError> {
        let text = codec::to_json(snapshot)?;
        self.store.write(SAVE_KEY, &text)?;
        debug!(
            "saved session with {} modified cells",
            snapshot.modified_cells.len()
        );
        Ok(())
    }

    /// Reads the last save. Nothing is applied; feed the result to `Command::Restore`.
    pub fn load(&self) -> Result<WorldSnapshot, LoadError> {
        let text = self.store.read(SAVE_KEY)?.ok_or(LoadError::Missing)?;
        let snapshot = codec::from_json(&text)?;
        info!(
            "loaded session with {} modified cells",
            snapshot.modified_cells.len()
        );
        Ok(snapshot)
    }

    /// Deletes the save, if any.
    pub fn erase(&mut self) -> Result<(), StoreError> {
        self.store.remove(SAVE_KEY)?;
        info!("erased saved session");
        Ok(())
    }

    /// Shared access to the backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

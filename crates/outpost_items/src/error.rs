//! Item service errors

use outpost_core::{ItemId, PropertyError, ProtoId};
use thiserror::Error;

/// Item service errors
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Proto item {0} not found")]
    TemplateNotFound(ProtoId),

    #[error("Item '{name}' destroyed during prototype initialization")]
    DestroyedDuringInit { name: String },

    #[error("Failed to restore properties for item '{name}' ({id}): {source}")]
    PropertyRestoreFailed {
        id: ItemId,
        name: String,
        #[source]
        source: PropertyError,
    },

    #[error("Item id {id} is already taken by '{name}'")]
    DuplicateId { id: ItemId, name: String },

    #[error("Item '{name}' ({id}) is not stackable")]
    NotStackable { id: ItemId, name: String },

    #[error("Invalid split of item '{name}' ({id}): count {count}, split count {split}")]
    InvalidSplitCount {
        id: ItemId,
        name: String,
        count: u32,
        split: u32,
    },

    #[error("Create of item '{name}' failed: {source}")]
    CreateFailed {
        name: String,
        #[source]
        source: Box<ItemError>,
    },

    #[error("Zero count requested for proto item {0}")]
    ZeroCount(ProtoId),
}

pub type ItemResult<T> = Result<T, ItemError>;

//! Core domain types for rating interactions.
//!
//! - Type aliases for domain clarity (UserId, ItemId)
//! - `Interaction`: a validated `(user, item, rating)` triple
//! - `RawInteraction`: the unvalidated form handed over by data preparation
//! - `ItemCatalog`: optional display names used to enrich output

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for an item
pub type ItemId = u32;

// =============================================================================
// Interaction Types
// =============================================================================

/// A single validated observation: `user` rated `item` with `rating`.
///
/// Duplicate (user, item) pairs are allowed and treated as independent
/// observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub item_id: ItemId,
    /// Always finite once constructed through the store
    pub rating: f64,
}

impl Interaction {
    pub fn new(user_id: UserId, item_id: ItemId, rating: f64) -> Self {
        Self {
            user_id,
            item_id,
            rating,
        }
    }
}

impl From<(UserId, ItemId, f64)> for Interaction {
    fn from((user_id, item_id, rating): (UserId, ItemId, f64)) -> Self {
        Self::new(user_id, item_id, rating)
    }
}

/// An interaction record before validation.
///
/// Ids are signed and every field is optional so that malformed input can be
/// represented and rejected with a precise reason.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInteraction {
    pub user_id: Option<i64>,
    pub item_id: Option<i64>,
    pub rating: Option<f64>,
}

impl RawInteraction {
    pub fn new(user_id: i64, item_id: i64, rating: f64) -> Self {
        Self {
            user_id: Some(user_id),
            item_id: Some(item_id),
            rating: Some(rating),
        }
    }
}

// =============================================================================
// Item Catalog
// =============================================================================

/// Display names for items.
///
/// Only used for post-hoc enrichment of recommendations; never consulted
/// during factorization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemCatalog {
    titles: HashMap<ItemId, String>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item_id: ItemId, title: impl Into<String>) {
        self.titles.insert(item_id, title.into());
    }

    /// Get the display name of an item, if known
    pub fn get_title(&self, item_id: ItemId) -> Option<&str> {
        self.titles.get(&item_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl FromIterator<(ItemId, String)> for ItemCatalog {
    fn from_iter<T: IntoIterator<Item = (ItemId, String)>>(iter: T) -> Self {
        Self {
            titles: iter.into_iter().collect(),
        }
    }
}

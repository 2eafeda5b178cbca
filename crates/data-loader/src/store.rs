//! The Interaction Store: validated triples indexed by user and by item.
//!
//! Built once per training run and immutable afterward. The per-user
//! adjacency feeds the user step of ALS, the per-item adjacency the item step.
//! Both indices are `BTreeMap`s so that id iteration order is sorted and
//! therefore reproducible.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct InteractionStore {
    /// Records in their original order
    interactions: Vec<Interaction>,

    /// All (item, rating) pairs observed for each user
    user_ratings: BTreeMap<UserId, Vec<(ItemId, f64)>>,
    /// All (user, rating) pairs observed for each item
    item_ratings: BTreeMap<ItemId, Vec<(UserId, f64)>>,
}

impl InteractionStore {
    /// Build a store from already-typed interactions.
    ///
    /// Fails with `ValidationError` if any rating is not finite; no partial
    /// store is ever produced.
    pub fn new(interactions: Vec<Interaction>) -> Result<Self> {
        if let Some((index, bad)) = interactions
            .iter()
            .enumerate()
            .find(|(_, interaction)| !interaction.rating.is_finite())
        {
            return Err(DataLoadError::ValidationError {
                index,
                reason: format!("non-finite rating {}", bad.rating),
            });
        }
        Ok(Self::build(interactions))
    }

    /// Validate raw records and build a store from them.
    pub fn from_raw<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = RawInteraction>,
    {
        let interactions = records
            .into_iter()
            .enumerate()
            .map(|(index, raw)| validate_record(index, &raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::build(interactions))
    }

    /// Load and validate a delimited ratings file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading interactions from {:?}", path);
        let records = parser::parse_ratings(path)?;
        let store = Self::from_raw(records)?;
        let (users, items, interactions) = store.counts();
        info!(
            "Loaded {} interactions for {} users and {} items",
            interactions, users, items
        );
        Ok(store)
    }

    /// Index already-validated interactions.
    pub(crate) fn build(interactions: Vec<Interaction>) -> Self {
        let mut user_ratings: BTreeMap<UserId, Vec<(ItemId, f64)>> = BTreeMap::new();
        let mut item_ratings: BTreeMap<ItemId, Vec<(UserId, f64)>> = BTreeMap::new();

        for interaction in &interactions {
            user_ratings
                .entry(interaction.user_id)
                .or_default()
                .push((interaction.item_id, interaction.rating));
            item_ratings
                .entry(interaction.item_id)
                .or_default()
                .push((interaction.user_id, interaction.rating));
        }

        debug!(
            users = user_ratings.len(),
            items = item_ratings.len(),
            interactions = interactions.len(),
            "Built interaction indices"
        );

        Self {
            interactions,
            user_ratings,
            item_ratings,
        }
    }

    /// All (item, rating) pairs observed for a user.
    ///
    /// Returns an empty slice for unknown users.
    pub fn get_user_ratings(&self, user_id: UserId) -> &[(ItemId, f64)] {
        self.user_ratings
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All (user, rating) pairs observed for an item
    pub fn get_item_ratings(&self, item_id: ItemId) -> &[(UserId, f64)] {
        self.item_ratings
            .get(&item_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Distinct user ids in ascending order
    pub fn user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.user_ratings.keys().copied()
    }

    /// Distinct item ids in ascending order
    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.item_ratings.keys().copied()
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.user_ratings.contains_key(&user_id)
    }

    pub fn contains_item(&self, item_id: ItemId) -> bool {
        self.item_ratings.contains_key(&item_id)
    }

    /// Set of items a user has interacted with
    pub fn rated_items(&self, user_id: UserId) -> HashSet<ItemId> {
        self.get_user_ratings(user_id)
            .iter()
            .map(|&(item_id, _)| item_id)
            .collect()
    }

    /// Records in their original order
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn num_users(&self) -> usize {
        self.user_ratings.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_ratings.len()
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// (users, items, interactions)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.num_users(), self.num_items(), self.len())
    }
}

/// Turn one raw record into an `Interaction` or explain why it is rejected.
pub fn validate_record(index: usize, raw: &RawInteraction) -> Result<Interaction> {
    let reject = |reason: String| DataLoadError::ValidationError { index, reason };

    let user_id = validate_id(raw.user_id, "userId").map_err(reject)?;
    let item_id = validate_id(raw.item_id, "itemId").map_err(reject)?;
    let rating = match raw.rating {
        None => return Err(reject("missing rating".to_string())),
        Some(rating) if !rating.is_finite() => {
            return Err(reject(format!("non-finite rating {}", rating)));
        }
        Some(rating) => rating,
    };

    Ok(Interaction::new(user_id, item_id, rating))
}

fn validate_id(id: Option<i64>, field: &str) -> std::result::Result<u32, String> {
    match id {
        None => Err(format!("missing {}", field)),
        Some(id) if id < 0 => Err(format!("negative {} {}", field, id)),
        Some(id) => u32::try_from(id).map_err(|_| format!("{} {} out of range", field, id)),
    }
}

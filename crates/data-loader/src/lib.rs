//! # Data Loader Crate
//!
//! Validated rating interactions and the indices the ALS solver reads from.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Interaction, RawInteraction, ItemCatalog)
//! - **store**: `InteractionStore`, per-user and per-item adjacency
//! - **split**: deterministic train/evaluation partitioning
//! - **parser**: thin loader for delimited rating and item files
//! - **seed**: order-independent seed mixing
//! - **error**: Error types for loading and validation
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::InteractionStore;
//! use std::path::Path;
//!
//! let store = InteractionStore::load_from_file(Path::new("data/ml-1m/ratings.dat"))?;
//! let split = store.split(0.8, 42)?;
//!
//! println!("User 1 rated {} items", store.get_user_ratings(1).len());
//! ```

pub mod error;
pub mod types;
pub mod parser;
pub mod seed;
pub mod split;
pub mod store;

pub use error::{DataLoadError, Result};
pub use split::Split;
pub use store::InteractionStore;
pub use types::{Interaction, ItemCatalog, ItemId, RawInteraction, UserId};

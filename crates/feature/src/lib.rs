//! Feature hashing: column parsing, combine-schema compilation, and
//! deterministic 64-bit feature fingerprinting.
//!
//! - [`hash`]: BKDR hashing and the fingerprint combination rule.
//! - [`split`]: column cell tokenization.
//! - [`index_batch`]: the parsed `rows x columns` table.
//! - [`combine`]: cartesian-product expansion for one combine group.
//! - [`schema`]: [`schema::CombineSchema`], the compiled combine schema.

pub mod combine;
pub mod hash;
pub mod index_batch;
pub mod schema;
pub mod split;

pub use hash::{bkdr_hash, bkdr_hash_with_equal_postfix, compute_feature_hash, ComputeFeatureHashError};
pub use index_batch::{IndexBatch, IndexBatchError, OwnedToken};
pub use schema::CombineSchema;
pub use split::{split_filter, TokenHash, TokenVec};

//! Catalog sink for canonical business records.
//!
//! The pipeline does not own the storage engine. It requires upsert semantics
//! keyed by an opaque id, a way to list all active records (the dedup
//! snapshot), and a transactional merge that re-points foreign references
//! before deleting duplicate members.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use votewallet_common::{BusinessRecord, HarvestError};

/// Kinds of rows that reference a business and must follow it through a merge.
pub const REFERENCE_KINDS: [&str; 4] = ["media", "alignment_scores", "donation_records", "tags"];

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert or update a record. A record carrying an existing id updates it;
    /// otherwise the store assigns a fresh id and returns it.
    async fn upsert(&self, record: &BusinessRecord) -> Result<Uuid, HarvestError>;

    /// Snapshot of all active records, in stable catalog order. Used by the
    /// offline dedup pass; must not be interleaved with live ingestion.
    async fn active_records(&self) -> Result<Vec<BusinessRecord>, HarvestError>;

    /// Merge duplicates: re-point every foreign reference from each id in
    /// `remove` to `keep`, then delete the removed records. Transactional —
    /// either all re-pointing and deletion succeeds or none of it is applied.
    async fn merge(&self, keep: Uuid, remove: &[Uuid]) -> Result<(), HarvestError>;
}

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

//! In-memory catalog for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use votewallet_common::{BusinessRecord, HarvestError};

use crate::{CatalogStore, REFERENCE_KINDS};

/// A row in some other table that points at a business (media, alignment
/// score, donation record, tag). Modeled generically so merge re-pointing
/// can be exercised without a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: String,
    pub row_id: Uuid,
    pub business_id: Uuid,
}

#[derive(Default)]
struct Inner {
    /// Insertion order preserved separately so snapshots are stable.
    order: Vec<Uuid>,
    records: HashMap<Uuid, BusinessRecord>,
    references: Vec<Reference>,
}

#[derive(Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a foreign reference to a business, for merge tests. The kind
    /// must be one of [`REFERENCE_KINDS`].
    pub async fn add_reference(&self, kind: &str, business_id: Uuid) -> Result<Uuid, HarvestError> {
        if !REFERENCE_KINDS.contains(&kind) {
            return Err(HarvestError::Catalog(format!(
                "unknown reference kind: {kind}"
            )));
        }
        let row_id = Uuid::new_v4();
        self.inner.write().await.references.push(Reference {
            kind: kind.to_string(),
            row_id,
            business_id,
        });
        Ok(row_id)
    }

    pub async fn references_for(&self, business_id: Uuid) -> Vec<Reference> {
        self.inner
            .read()
            .await
            .references
            .iter()
            .filter(|r| r.business_id == business_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, id: Uuid) -> Option<BusinessRecord> {
        self.inner.read().await.records.get(&id).cloned()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn upsert(&self, record: &BusinessRecord) -> Result<Uuid, HarvestError> {
        let mut inner = self.inner.write().await;
        let id = record.id.unwrap_or_else(Uuid::new_v4);
        let mut stored = record.clone();
        stored.id = Some(id);
        if inner.records.insert(id, stored).is_none() {
            inner.order.push(id);
        }
        Ok(id)
    }

    async fn active_records(&self) -> Result<Vec<BusinessRecord>, HarvestError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }

    async fn merge(&self, keep: Uuid, remove: &[Uuid]) -> Result<(), HarvestError> {
        let mut inner = self.inner.write().await;

        // Validate up front so a bad merge applies nothing.
        if !inner.records.contains_key(&keep) {
            return Err(HarvestError::Catalog(format!(
                "merge target {keep} not in catalog"
            )));
        }
        for id in remove {
            if !inner.records.contains_key(id) {
                return Err(HarvestError::Catalog(format!(
                    "merge member {id} not in catalog"
                )));
            }
        }

        for reference in inner.references.iter_mut() {
            if remove.contains(&reference.business_id) {
                reference.business_id = keep;
            }
        }
        for id in remove {
            inner.records.remove(id);
            inner.order.retain(|existing| existing != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(name: &str) -> BusinessRecord {
        BusinessRecord {
            id: None,
            name: name.to_string(),
            description: None,
            category: "Coffee".to_string(),
            address: None,
            city: None,
            state: "IA".to_string(),
            zip_code: None,
            phone: None,
            email: None,
            website: None,
            latitude: None,
            longitude: None,
            rating: None,
            review_count: None,
            image_url: None,
            data_quality: 80,
            source: "test".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn upsert_assigns_id_and_update_keeps_it() {
        let catalog = MemoryCatalog::new();
        let id = catalog.upsert(&record("Joe's Coffee")).await.unwrap();

        let mut updated = catalog.get(id).await.unwrap();
        updated.rating = Some(4.5);
        let id2 = catalog.upsert(&updated).await.unwrap();

        assert_eq!(id, id2);
        assert_eq!(catalog.len().await, 1);
        assert_eq!(catalog.get(id).await.unwrap().rating, Some(4.5));
    }

    #[tokio::test]
    async fn snapshot_skips_inactive_records() {
        let catalog = MemoryCatalog::new();
        catalog.upsert(&record("Open Shop")).await.unwrap();
        let mut closed = record("Closed Shop");
        closed.is_active = false;
        catalog.upsert(&closed).await.unwrap();

        let snapshot = catalog.active_records().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "Open Shop");
    }

    #[tokio::test]
    async fn snapshot_preserves_insertion_order() {
        let catalog = MemoryCatalog::new();
        for name in ["A", "B", "C"] {
            catalog.upsert(&record(name)).await.unwrap();
        }
        let names: Vec<_> = catalog
            .active_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn merge_repoints_references_and_deletes_members() {
        let catalog = MemoryCatalog::new();
        let keep = catalog.upsert(&record("Joe's Coffee")).await.unwrap();
        let dup = catalog.upsert(&record("Joes Coffee")).await.unwrap();
        catalog.add_reference("media", dup).await.unwrap();
        catalog.add_reference("tags", dup).await.unwrap();

        catalog.merge(keep, &[dup]).await.unwrap();

        assert!(catalog.get(dup).await.is_none());
        assert!(catalog.references_for(dup).await.is_empty());
        assert_eq!(catalog.references_for(keep).await.len(), 2);
    }

    #[tokio::test]
    async fn unknown_reference_kind_is_rejected() {
        let catalog = MemoryCatalog::new();
        let id = catalog.upsert(&record("Joe's Coffee")).await.unwrap();

        let result = catalog.add_reference("reviews", id).await;
        assert!(matches!(result, Err(HarvestError::Catalog(_))));
        assert!(catalog.references_for(id).await.is_empty());

        for kind in REFERENCE_KINDS {
            catalog.add_reference(kind, id).await.unwrap();
        }
        assert_eq!(catalog.references_for(id).await.len(), REFERENCE_KINDS.len());
    }

    #[tokio::test]
    async fn merge_with_unknown_member_applies_nothing() {
        let catalog = MemoryCatalog::new();
        let keep = catalog.upsert(&record("Joe's Coffee")).await.unwrap();
        let dup = catalog.upsert(&record("Joes Coffee")).await.unwrap();
        catalog.add_reference("media", dup).await.unwrap();

        let result = catalog.merge(keep, &[dup, Uuid::new_v4()]).await;

        assert!(result.is_err());
        assert!(catalog.get(dup).await.is_some(), "member must survive a failed merge");
        assert_eq!(catalog.references_for(dup).await.len(), 1);
    }
}

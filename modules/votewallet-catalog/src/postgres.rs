//! Postgres catalog store.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use votewallet_common::{BusinessRecord, HarvestError};

use crate::CatalogStore;

pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub async fn connect(database_url: &str) -> Result<Self, HarvestError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| HarvestError::Catalog(format!("connect failed: {e}")))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the sink tables if they don't exist. Idempotent.
    pub async fn migrate(&self) -> Result<(), HarvestError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS businesses (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                category TEXT NOT NULL,
                address TEXT,
                city TEXT,
                state TEXT NOT NULL,
                zip_code TEXT,
                phone TEXT,
                email TEXT,
                website TEXT,
                latitude DOUBLE PRECISION,
                longitude DOUBLE PRECISION,
                rating DOUBLE PRECISION,
                review_count INTEGER,
                image_url TEXT,
                data_quality SMALLINT NOT NULL DEFAULT 0,
                source TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
            "CREATE TABLE IF NOT EXISTS business_media (id UUID PRIMARY KEY, business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE, url TEXT NOT NULL)",
            "CREATE TABLE IF NOT EXISTS business_alignment_scores (id UUID PRIMARY KEY, business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE, axis TEXT NOT NULL, value DOUBLE PRECISION NOT NULL)",
            "CREATE TABLE IF NOT EXISTS business_donation_records (id UUID PRIMARY KEY, business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE, recipient TEXT NOT NULL, amount_cents BIGINT NOT NULL)",
            "CREATE TABLE IF NOT EXISTS business_tags (id UUID PRIMARY KEY, business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE, tag TEXT NOT NULL)",
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| HarvestError::Catalog(format!("migration failed: {e}")))?;
        }
        info!("Catalog schema ready");
        Ok(())
    }
}

/// Tables whose rows follow a business through a merge.
const REFERENCE_TABLES: [&str; 4] = [
    "business_media",
    "business_alignment_scores",
    "business_donation_records",
    "business_tags",
];

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn upsert(&self, record: &BusinessRecord) -> Result<Uuid, HarvestError> {
        let id = record.id.unwrap_or_else(Uuid::new_v4);
        sqlx::query(
            r#"
            INSERT INTO businesses (
                id, name, description, category, address, city, state, zip_code,
                phone, email, website, latitude, longitude, rating, review_count,
                image_url, data_quality, source, created_at, updated_at, is_active
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                address = EXCLUDED.address,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                zip_code = EXCLUDED.zip_code,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                website = EXCLUDED.website,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                rating = EXCLUDED.rating,
                review_count = EXCLUDED.review_count,
                image_url = EXCLUDED.image_url,
                data_quality = EXCLUDED.data_quality,
                source = EXCLUDED.source,
                updated_at = EXCLUDED.updated_at,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.category)
        .bind(&record.address)
        .bind(&record.city)
        .bind(&record.state)
        .bind(&record.zip_code)
        .bind(&record.phone)
        .bind(&record.email)
        .bind(&record.website)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.rating)
        .bind(record.review_count.map(|c| c as i32))
        .bind(&record.image_url)
        .bind(record.data_quality as i16)
        .bind(&record.source)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| HarvestError::Catalog(format!("upsert failed: {e}")))?;
        Ok(id)
    }

    async fn active_records(&self) -> Result<Vec<BusinessRecord>, HarvestError> {
        let rows = sqlx::query(
            "SELECT * FROM businesses WHERE is_active ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HarvestError::Catalog(format!("snapshot query failed: {e}")))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(BusinessRecord {
                id: Some(row.get("id")),
                name: row.get("name"),
                description: row.get("description"),
                category: row.get("category"),
                address: row.get("address"),
                city: row.get("city"),
                state: row.get("state"),
                zip_code: row.get("zip_code"),
                phone: row.get("phone"),
                email: row.get("email"),
                website: row.get("website"),
                latitude: row.get("latitude"),
                longitude: row.get("longitude"),
                rating: row.get("rating"),
                review_count: row.get::<Option<i32>, _>("review_count").map(|c| c as u32),
                image_url: row.get("image_url"),
                data_quality: row.get::<i16, _>("data_quality") as u8,
                source: row.get("source"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
                is_active: row.get("is_active"),
            });
        }
        Ok(records)
    }

    async fn merge(&self, keep: Uuid, remove: &[Uuid]) -> Result<(), HarvestError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| HarvestError::Catalog(format!("merge begin failed: {e}")))?;

        let remove: Vec<Uuid> = remove.to_vec();
        for table in REFERENCE_TABLES {
            sqlx::query(&format!(
                "UPDATE {table} SET business_id = $1 WHERE business_id = ANY($2)"
            ))
            .bind(keep)
            .bind(&remove)
            .execute(&mut *tx)
            .await
            .map_err(|e| HarvestError::Catalog(format!("merge re-point {table} failed: {e}")))?;
        }

        sqlx::query("DELETE FROM businesses WHERE id = ANY($1)")
            .bind(&remove)
            .execute(&mut *tx)
            .await
            .map_err(|e| HarvestError::Catalog(format!("merge delete failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| HarvestError::Catalog(format!("merge commit failed: {e}")))?;

        info!(keep = %keep, removed = remove.len(), "Merged duplicate group");
        Ok(())
    }
}

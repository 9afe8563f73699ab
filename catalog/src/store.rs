//! Persistence for the catalog.
//!
//! Handlers only talk to [`CatalogStore`]; [`PgCatalogStore`] is the
//! PostgreSQL implementation used in production. Every method that writes
//! more than one row runs inside a single transaction.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::config::Config;
use crate::errors::{CatalogError, Result};
use crate::types::{
    Category, CategoryDatasetRow, DatasetDetails, FieldMapping, MappingRegistration, MetadataRow,
    NewDataset, Participant, ParticipantMappings,
};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Rows ordered by category name, dataset title, field name.
    async fn category_dataset_rows(&self) -> Result<Vec<CategoryDatasetRow>>;

    /// Rows ordered by category name, dataset name, federated field name.
    async fn metadata_rows(&self) -> Result<Vec<MetadataRow>>;

    /// Open federated field names ordered by id
    async fn list_federated_fields(&self) -> Result<Vec<String>>;

    async fn list_participants(&self) -> Result<Vec<Participant>>;

    /// Returns the new dataset id.
    async fn create_dataset(&self, dataset: &NewDataset) -> Result<i32>;

    async fn save_dataset_details(&self, details: &DatasetDetails) -> Result<()>;

    /// Returns the number of mappings stored.
    async fn save_participant_mappings(&self, submission: &ParticipantMappings) -> Result<usize>;

    /// Upserts category, dataset and participant, then stores every mapping.
    /// Returns the number of federated field mappings stored.
    async fn register_mapping(&self, registration: &MappingRegistration) -> Result<usize>;

    fn is_ready(&self) -> bool;
}

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the configured database, applying migrations if enabled.
    pub async fn open(config: &Config) -> Result<Self> {
        let store = Self::new(config.connect().await?);
        if config.run_migrations {
            store.migrate().await?;
        }
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Catalog schema is up to date");
        Ok(())
    }
}

/// Resolves every federated field name to its id, failing before any row is
/// written when one is unknown.
async fn resolve_field_ids(
    tx: &mut Transaction<'_, Postgres>,
    mappings: &[FieldMapping],
) -> Result<Vec<i32>> {
    let mut ids = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let id: Option<i32> = sqlx::query_scalar(
            "SELECT id FROM federated_field_master WHERE federated_field_name = $1",
        )
        .bind(&mapping.field_name)
        .fetch_optional(&mut **tx)
        .await?;

        match id {
            Some(id) => ids.push(id),
            None => {
                return Err(CatalogError::Validation(format!(
                    "Federated field '{}' not found.",
                    mapping.field_name
                )));
            }
        }
    }
    Ok(ids)
}

async fn insert_field_mappings(
    tx: &mut Transaction<'_, Postgres>,
    participant_id: i32,
    dataset_id: Option<i32>,
    mappings: &[FieldMapping],
    field_ids: &[i32],
) -> Result<()> {
    for (mapping, field_id) in mappings.iter().zip(field_ids) {
        sqlx::query(
            "INSERT INTO federated_field_mapping \
             (participant_id, federated_field_id, column_name, dataset_id) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(participant_id)
        .bind(field_id)
        .bind(&mapping.column_name)
        .bind(dataset_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn ensure_dataset_exists(tx: &mut Transaction<'_, Postgres>, dataset_id: i32) -> Result<()> {
    let exists: Option<i32> =
        sqlx::query_scalar("SELECT dataset_id FROM dataset_master WHERE dataset_id = $1")
            .bind(dataset_id)
            .fetch_optional(&mut **tx)
            .await?;
    match exists {
        Some(_) => Ok(()),
        None => Err(CatalogError::NotFound(format!(
            "Dataset {dataset_id} not found."
        ))),
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT category_id, category_name FROM category_master ORDER BY category_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn category_dataset_rows(&self) -> Result<Vec<CategoryDatasetRow>> {
        let rows = sqlx::query_as::<_, CategoryDatasetRow>(
            r#"
            SELECT
                cat.category_name,
                ds.dataset_id,
                ds.title AS dataset_title,
                ds.keywords,
                ds.publication_date,
                ds.doi,
                ds.license,
                ds.metadata_modified_date AS last_updated,
                ds.registration_date,
                c.name AS contact_name,
                dm.field_name,
                dm.ontology_mapping,
                dm.data_type
            FROM category_master cat
            LEFT JOIN dataset_master ds
                ON ds.category_id = cat.category_id AND ds.is_active = TRUE
            LEFT JOIN dataset_mapping dm ON dm.dataset_id = ds.dataset_id
            LEFT JOIN dataset_contacts c ON c.dataset_id = ds.dataset_id
            ORDER BY cat.category_name, ds.title, dm.field_name, c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn metadata_rows(&self) -> Result<Vec<MetadataRow>> {
        let rows = sqlx::query_as::<_, MetadataRow>(
            r#"
            SELECT
                cat.category_name,
                ds.dataset_name,
                ffm.federated_field_name,
                ffm.description,
                mapping.column_name
            FROM category_master cat
            JOIN dataset_master ds ON ds.category_id = cat.category_id
            JOIN federated_field_mapping mapping ON mapping.dataset_id = ds.dataset_id
            JOIN federated_field_master ffm ON ffm.id = mapping.federated_field_id
            ORDER BY cat.category_name, ds.dataset_name, ffm.federated_field_name, mapping.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_federated_fields(&self) -> Result<Vec<String>> {
        let fields = sqlx::query_scalar::<_, String>(
            "SELECT federated_field_name FROM federated_field_master ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(fields)
    }

    async fn list_participants(&self) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT participant_id, participant_name, dataset_id, base_url \
             FROM participant_master ORDER BY participant_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(participants)
    }

    async fn create_dataset(&self, dataset: &NewDataset) -> Result<i32> {
        let mut tx = self.pool.begin().await?;

        let category: Option<i32> =
            sqlx::query_scalar("SELECT category_id FROM category_master WHERE category_id = $1")
                .bind(dataset.category_id)
                .fetch_optional(&mut *tx)
                .await?;
        if category.is_none() {
            return Err(CatalogError::NotFound(format!(
                "Category {} not found.",
                dataset.category_id
            )));
        }

        let dataset_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO dataset_master (
                dataset_name, title, description, citation, doi, language,
                data_language, license, publication_date, metadata_modified_date,
                registration_date, is_active, keywords, dataset_type, category_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING dataset_id
            "#,
        )
        .bind(dataset.effective_name())
        .bind(&dataset.title)
        .bind(&dataset.description)
        .bind(&dataset.citation)
        .bind(&dataset.doi)
        .bind(&dataset.language)
        .bind(&dataset.data_language)
        .bind(&dataset.license)
        .bind(dataset.publication_date)
        .bind(dataset.metadata_modified_date)
        .bind(dataset.registration_date)
        .bind(dataset.is_active)
        .bind(&dataset.keywords)
        .bind(&dataset.dataset_type)
        .bind(dataset.category_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(dataset_id)
    }

    async fn save_dataset_details(&self, details: &DatasetDetails) -> Result<()> {
        let dataset_id = details.dataset_id;
        let mut tx = self.pool.begin().await?;
        ensure_dataset_exists(&mut tx, dataset_id).await?;

        for scope in &details.scopes {
            sqlx::query(
                "INSERT INTO dataset_scope (dataset_id, temporal_start_date, temporal_end_date, \
                 geographic_scope, taxonomic_scope, taxonomic_authority) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(dataset_id)
            .bind(scope.temporal_start_date)
            .bind(scope.temporal_end_date)
            .bind(&scope.geographic_scope)
            .bind(&scope.taxonomic_scope)
            .bind(&scope.taxonomic_authority)
            .execute(&mut *tx)
            .await?;
        }

        for publisher in &details.publishers {
            sqlx::query(
                "INSERT INTO dataset_publisher (dataset_id, country, record_count) \
                 VALUES ($1, $2, $3)",
            )
            .bind(dataset_id)
            .bind(&publisher.country)
            .bind(publisher.record_count)
            .execute(&mut *tx)
            .await?;
        }

        for contact in &details.contacts {
            sqlx::query(
                "INSERT INTO dataset_contacts (dataset_id, name, role, email, organization, \
                 address, city, state, country) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(dataset_id)
            .bind(&contact.name)
            .bind(&contact.role)
            .bind(&contact.email)
            .bind(&contact.organization)
            .bind(&contact.address)
            .bind(&contact.city)
            .bind(&contact.state)
            .bind(&contact.country)
            .execute(&mut *tx)
            .await?;
        }

        for mapping in &details.mappings {
            sqlx::query(
                "INSERT INTO dataset_mapping (dataset_id, field_name, ontology_mapping, data_type) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(dataset_id)
            .bind(&mapping.field_name)
            .bind(&mapping.ontology_mapping)
            .bind(&mapping.data_type)
            .execute(&mut *tx)
            .await?;
        }

        for metric in &details.metrics {
            sqlx::query(
                "INSERT INTO dataset_metrics (dataset_id, metric_name, metric_value) \
                 VALUES ($1, $2, $3)",
            )
            .bind(dataset_id)
            .bind(&metric.metric_name)
            .bind(&metric.metric_value)
            .execute(&mut *tx)
            .await?;
        }

        for statistic in &details.statistics {
            sqlx::query(
                "INSERT INTO dataset_statistics (dataset_id, stat_name, stat_value, measurement_date) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(dataset_id)
            .bind(&statistic.stat_name)
            .bind(&statistic.stat_value)
            .bind(statistic.measurement_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_participant_mappings(&self, submission: &ParticipantMappings) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let participant: Option<(i32, Option<i32>)> = sqlx::query_as(
            "SELECT participant_id, dataset_id FROM participant_master WHERE participant_name = $1",
        )
        .bind(&submission.participant_name)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((participant_id, dataset_id)) = participant else {
            return Err(CatalogError::NotFound(format!(
                "Participant '{}' not found.",
                submission.participant_name
            )));
        };

        let field_ids = resolve_field_ids(&mut tx, &submission.mappings).await?;
        insert_field_mappings(
            &mut tx,
            participant_id,
            dataset_id,
            &submission.mappings,
            &field_ids,
        )
        .await?;

        tx.commit().await?;
        Ok(submission.mappings.len())
    }

    async fn register_mapping(&self, registration: &MappingRegistration) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let field_ids = resolve_field_ids(&mut tx, &registration.mappings).await?;

        // DO UPDATE with an unchanged value so RETURNING also yields existing rows
        let category_id: i32 = sqlx::query_scalar(
            "INSERT INTO category_master (category_name) VALUES ($1) \
             ON CONFLICT (category_name) DO UPDATE SET category_name = EXCLUDED.category_name \
             RETURNING category_id",
        )
        .bind(&registration.category)
        .fetch_one(&mut *tx)
        .await?;

        let dataset_id: i32 = sqlx::query_scalar(
            "INSERT INTO dataset_master (dataset_name, category_id) VALUES ($1, $2) \
             ON CONFLICT (dataset_name, category_id) DO UPDATE SET dataset_name = EXCLUDED.dataset_name \
             RETURNING dataset_id",
        )
        .bind(&registration.dataset)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;

        let participant_id: i32 = sqlx::query_scalar(
            "INSERT INTO participant_master (participant_name, dataset_id, base_url) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (participant_name) DO UPDATE SET \
                 dataset_id = EXCLUDED.dataset_id, \
                 base_url = COALESCE(EXCLUDED.base_url, participant_master.base_url) \
             RETURNING participant_id",
        )
        .bind(&registration.participant_name)
        .bind(dataset_id)
        .bind(&registration.base_url)
        .fetch_one(&mut *tx)
        .await?;

        insert_field_mappings(
            &mut tx,
            participant_id,
            Some(dataset_id),
            &registration.mappings,
            &field_ids,
        )
        .await?;

        for column_name in &registration.other {
            sqlx::query(
                "INSERT INTO other_field_mapping (category_id, dataset_id, column_name) \
                 VALUES ($1, $2, $3)",
            )
            .bind(category_id)
            .bind(dataset_id)
            .bind(column_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(registration.mappings.len())
    }

    fn is_ready(&self) -> bool {
        !self.pool.is_closed()
    }
}

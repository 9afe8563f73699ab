use axum::extract::{RawQuery, State};
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::errors::{CatalogError, Result};
use crate::metrics_defs::CATALOG_REQUESTS;
use crate::store::CatalogStore;
use crate::tree;
use crate::types::{
    Category, CategoryMetadata, CategoryWithDatasets, DatasetDetails, FieldMapping,
    MAPPING_FIELDS, MappingRegistration, NewDataset, ParticipantMappings,
};

type Store = Arc<dyn CatalogStore>;

pub fn router(store: Store) -> Router {
    Router::new()
        .route("/categories", get(categories))
        .route("/categories-with-datasets", get(categories_with_datasets))
        .route("/metadata", get(metadata))
        .route("/federated-fields", get(federated_fields))
        .route("/dataset-master", post(create_dataset))
        .route("/dataset-details", post(save_dataset_details))
        .route("/submit-mapping", post(submit_mapping))
        .route("/submit-mapping-new", post(submit_mapping_new))
        .with_state(store)
}

#[derive(Debug, Serialize)]
struct DatasetCreated {
    status: &'static str,
    dataset_id: i32,
}

#[derive(Debug, Serialize)]
struct Saved {
    status: &'static str,
    message: String,
}

impl Saved {
    fn new(message: impl Into<String>) -> Self {
        Saved {
            status: "success",
            message: message.into(),
        }
    }
}

fn record<T>(endpoint: &'static str, result: Result<T>) -> Result<T> {
    let status = match &result {
        Ok(_) => "ok",
        Err(e) if e.status_code().is_client_error() => "rejected",
        Err(_) => "error",
    };
    shared::counter!(CATALOG_REQUESTS, "endpoint" => endpoint, "status" => status).increment(1);
    result
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| CatalogError::Validation(rejection.body_text()))
}

async fn categories(State(store): State<Store>) -> Result<Json<Vec<Category>>> {
    record("categories", store.list_categories().await.map(Json))
}

async fn categories_with_datasets(
    State(store): State<Store>,
) -> Result<Json<Vec<CategoryWithDatasets>>> {
    let result = store
        .category_dataset_rows()
        .await
        .map(|rows| Json(tree::categories_with_datasets(rows)));
    record("categories-with-datasets", result)
}

async fn metadata(State(store): State<Store>) -> Result<Json<Vec<CategoryMetadata>>> {
    let result = store
        .metadata_rows()
        .await
        .map(|rows| Json(tree::metadata(rows)));
    record("metadata", result)
}

async fn federated_fields(State(store): State<Store>) -> Result<Json<Vec<String>>> {
    record("federated-fields", store.list_federated_fields().await.map(Json))
}

async fn create_dataset(
    State(store): State<Store>,
    payload: std::result::Result<Json<NewDataset>, JsonRejection>,
) -> Result<Json<DatasetCreated>> {
    let result = async {
        let dataset = json_body(payload)?;
        dataset.validate()?;
        let dataset_id = store.create_dataset(&dataset).await?;
        tracing::info!(dataset_id, name = dataset.effective_name(), "Created dataset");
        Ok::<_, CatalogError>(Json(DatasetCreated {
            status: "success",
            dataset_id,
        }))
    }
    .await;
    record("dataset-master", result)
}

async fn save_dataset_details(
    State(store): State<Store>,
    payload: std::result::Result<Json<DatasetDetails>, JsonRejection>,
) -> Result<Json<Saved>> {
    let result = async {
        let details = json_body(payload)?;
        store.save_dataset_details(&details).await?;
        Ok::<_, CatalogError>(Json(Saved::new("All dataset details saved")))
    }
    .await;
    record("dataset-details", result)
}

/// Query string of the mapping endpoints. Parameters may repeat (`other`),
/// so it is parsed by hand rather than into a struct.
struct MappingQuery {
    pairs: Vec<(String, String)>,
}

impl MappingQuery {
    fn parse(raw: Option<&str>) -> Self {
        let pairs = url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
        MappingQuery { pairs }
    }

    /// First non-empty value of `name`
    fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.as_str())
    }

    fn require(&self, name: &str) -> Result<String> {
        self.get(name)
            .map(str::to_string)
            .ok_or_else(|| CatalogError::Validation(format!("Missing query parameter '{name}'.")))
    }

    fn all(&self, name: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Provided mapping fields, in canonical field order.
    fn mappings(&self) -> Result<Vec<FieldMapping>> {
        let mappings: Vec<_> = MAPPING_FIELDS
            .iter()
            .filter_map(|field| {
                self.get(field).map(|column| FieldMapping {
                    field_name: field.to_string(),
                    column_name: column.to_string(),
                })
            })
            .collect();

        if mappings.is_empty() {
            return Err(CatalogError::Validation(
                "No mapping fields provided.".to_string(),
            ));
        }
        Ok(mappings)
    }
}

async fn submit_mapping(
    State(store): State<Store>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Saved>> {
    let result = async {
        let query = MappingQuery::parse(raw.as_deref());
        let submission = ParticipantMappings {
            participant_name: query.require("participant_name")?,
            mappings: query.mappings()?,
        };

        let saved = store.save_participant_mappings(&submission).await?;
        tracing::info!(participant = %submission.participant_name, saved, "Saved participant mappings");
        Ok::<_, CatalogError>(Json(Saved::new(format!(
            "Saved {saved} mappings for participant '{}'",
            submission.participant_name
        ))))
    }
    .await;
    record("submit-mapping", result)
}

async fn submit_mapping_new(
    State(store): State<Store>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Saved>> {
    let result = async {
        let query = MappingQuery::parse(raw.as_deref());
        let registration = MappingRegistration {
            category: query.require("category")?,
            dataset: query.require("dataset")?,
            participant_name: query.require("participant_name")?,
            base_url: query.get("base_url").map(str::to_string),
            mappings: query.mappings()?,
            other: query.all("other"),
        };

        let saved = store.register_mapping(&registration).await?;
        tracing::info!(
            participant = %registration.participant_name,
            category = %registration.category,
            dataset = %registration.dataset,
            saved,
            other = registration.other.len(),
            "Registered participant mappings"
        );
        Ok::<_, CatalogError>(Json(Saved::new(format!(
            "Saved {saved} mappings under category '{}' and dataset '{}'",
            registration.category, registration.dataset
        ))))
    }
    .await;
    record("submit-mapping-new", result)
}

//! Row types read from the catalog database, request bodies accepted by the
//! write endpoints, and the response trees served by the read endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::CatalogError;

/// Federated fields a participant column can be mapped to
pub const MAPPING_FIELDS: [&str; 5] = [
    "vernacular_name_common_names",
    "taxon_scientific_name",
    "family_name",
    "habitat",
    "medicinal_uses",
];

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub category_id: i32,
    pub category_name: String,
}

/// One row of `category_master LEFT JOIN dataset_master LEFT JOIN
/// dataset_mapping LEFT JOIN dataset_contacts`.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct CategoryDatasetRow {
    pub category_name: String,
    pub dataset_id: Option<i32>,
    pub dataset_title: Option<String>,
    pub keywords: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub doi: Option<String>,
    pub license: Option<String>,
    pub last_updated: Option<NaiveDate>,
    pub registration_date: Option<NaiveDate>,
    pub contact_name: Option<String>,
    pub field_name: Option<String>,
    pub ontology_mapping: Option<String>,
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MetadataRow {
    pub category_name: String,
    pub dataset_name: String,
    pub federated_field_name: String,
    pub description: Option<String>,
    pub column_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Participant {
    pub participant_id: i32,
    pub participant_name: String,
    pub dataset_id: Option<i32>,
    pub base_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Response trees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryWithDatasets {
    pub category_name: String,
    pub datasets: Vec<DatasetSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub dataset_title: String,
    pub hover_fields: HoverFields,
    pub fields: Vec<DatasetField>,
}

/// Tooltip details shown for a dataset in the catalog browser
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverFields {
    pub keywords: Option<String>,
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    pub contacts: Option<String>,
    #[serde(rename = "License")]
    pub license: Option<String>,
    #[serde(rename = "Publication Date")]
    pub publication_date: String,
    #[serde(rename = "Last Updated")]
    pub last_updated: String,
    #[serde(rename = "Registration Date")]
    pub registration_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetField {
    pub field_name: String,
    pub ontology_mapping: Option<String>,
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMetadata {
    pub category: String,
    pub datasets: Vec<DatasetMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetMetadata {
    pub name: String,
    pub fields: Vec<FieldMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMetadata {
    pub field_name: String,
    pub description: Option<String>,
    pub mappings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Accepts an identifier given either as a JSON number or as a numeric string.
fn deserialize_id<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i32),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid identifier: {text:?}"))),
    }
}

/// Body of `POST /dataset-master`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewDataset {
    /// Short identifier, unique per category. Defaults to the title.
    #[serde(default)]
    pub dataset_name: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    pub language: String,
    pub data_language: String,
    pub license: String,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub metadata_modified_date: Option<NaiveDate>,
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
    pub is_active: bool,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub dataset_type: Option<String>,
    #[serde(deserialize_with = "deserialize_id")]
    pub category_id: i32,
}

impl NewDataset {
    pub fn effective_name(&self) -> &str {
        self.dataset_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.title)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::Validation(
                "Dataset title cannot be empty.".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scope {
    pub temporal_start_date: Option<NaiveDate>,
    pub temporal_end_date: Option<NaiveDate>,
    pub geographic_scope: Option<String>,
    pub taxonomic_scope: Option<String>,
    pub taxonomic_authority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Publisher {
    pub country: String,
    pub record_count: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contact {
    pub name: String,
    pub role: String,
    pub email: String,
    pub organization: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldDescription {
    pub field_name: String,
    pub ontology_mapping: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metric {
    pub metric_name: String,
    pub metric_value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Statistic {
    pub stat_name: String,
    pub stat_value: String,
    #[serde(default)]
    pub measurement_date: Option<NaiveDate>,
}

/// Body of `POST /dataset-details`. Every list is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetDetails {
    #[serde(deserialize_with = "deserialize_id")]
    pub dataset_id: i32,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub publishers: Vec<Publisher>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub mappings: Vec<FieldDescription>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub statistics: Vec<Statistic>,
}

/// A participant column mapped to a federated field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub field_name: String,
    pub column_name: String,
}

/// Input of `POST /submit-mapping`
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantMappings {
    pub participant_name: String,
    pub mappings: Vec<FieldMapping>,
}

/// Input of `POST /submit-mapping-new`
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRegistration {
    pub category: String,
    pub dataset: String,
    pub participant_name: String,
    pub base_url: Option<String>,
    pub mappings: Vec<FieldMapping>,
    /// Participant columns with no federated counterpart
    pub other: Vec<String>,
}

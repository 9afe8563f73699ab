//! Reshapes flat join rows into the nested trees served by the read
//! endpoints.
//!
//! Both functions make a single pass over rows that arrive sorted by the
//! query, keeping insertion order through `IndexMap`/`IndexSet` lookups.

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};

use crate::types::{
    CategoryDatasetRow, CategoryMetadata, CategoryWithDatasets, DatasetField, DatasetMetadata,
    DatasetSummary, FieldMetadata, HoverFields, MetadataRow,
};

const DEFAULT_PUBLICATION_DATE: &str = "2023-06-01";
const DEFAULT_LAST_UPDATED: &str = "2025-08-06";
const DEFAULT_REGISTRATION_DATE: &str = "2023-01-01";

fn date_or(date: Option<NaiveDate>, fallback: &str) -> String {
    date.map(|date| date.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

struct DatasetEntry {
    hover_fields: HoverFields,
    fields: IndexMap<String, DatasetField>,
}

pub fn categories_with_datasets(rows: Vec<CategoryDatasetRow>) -> Vec<CategoryWithDatasets> {
    let mut categories: IndexMap<String, IndexMap<String, DatasetEntry>> = IndexMap::new();

    for row in rows {
        let datasets = categories.entry(row.category_name).or_default();

        // LEFT JOIN padding: a category without active datasets
        let Some(title) = row.dataset_title else {
            continue;
        };

        let dataset = datasets.entry(title).or_insert_with(|| DatasetEntry {
            hover_fields: HoverFields {
                keywords: row.keywords,
                doi: row.doi,
                contacts: row.contact_name,
                license: row.license,
                publication_date: date_or(row.publication_date, DEFAULT_PUBLICATION_DATE),
                last_updated: date_or(row.last_updated, DEFAULT_LAST_UPDATED),
                registration_date: date_or(row.registration_date, DEFAULT_REGISTRATION_DATE),
            },
            fields: IndexMap::new(),
        });

        // Every contact repeats the mapping rows
        if let Some(field_name) = row.field_name {
            dataset
                .fields
                .entry(field_name.clone())
                .or_insert(DatasetField {
                    field_name,
                    ontology_mapping: row.ontology_mapping,
                    data_type: row.data_type,
                });
        }
    }

    categories
        .into_iter()
        .map(|(category_name, datasets)| CategoryWithDatasets {
            category_name,
            datasets: datasets
                .into_iter()
                .map(|(dataset_title, entry)| DatasetSummary {
                    dataset_title,
                    hover_fields: entry.hover_fields,
                    fields: entry.fields.into_values().collect(),
                })
                .collect(),
        })
        .collect()
}

struct FieldEntry {
    description: Option<String>,
    mappings: IndexSet<String>,
}

pub fn metadata(rows: Vec<MetadataRow>) -> Vec<CategoryMetadata> {
    let mut categories: IndexMap<String, IndexMap<String, IndexMap<String, FieldEntry>>> =
        IndexMap::new();

    for row in rows {
        let field = categories
            .entry(row.category_name)
            .or_default()
            .entry(row.dataset_name)
            .or_default()
            .entry(row.federated_field_name)
            .or_insert_with(|| FieldEntry {
                description: row.description,
                mappings: IndexSet::new(),
            });

        if let Some(column_name) = row.column_name {
            field.mappings.insert(column_name);
        }
    }

    categories
        .into_iter()
        .map(|(category, datasets)| CategoryMetadata {
            category,
            datasets: datasets
                .into_iter()
                .map(|(name, fields)| DatasetMetadata {
                    name,
                    fields: fields
                        .into_iter()
                        .map(|(field_name, entry)| FieldMetadata {
                            field_name,
                            description: entry.description,
                            mappings: entry.mappings.into_iter().collect(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

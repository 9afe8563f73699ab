use async_trait::async_trait;
use std::sync::Mutex;

use crate::errors::{CatalogError, Result};
use crate::store::CatalogStore;
use crate::types::{
    Category, CategoryDatasetRow, DatasetDetails, FieldMapping, MAPPING_FIELDS,
    MappingRegistration, MetadataRow, NewDataset, Participant, ParticipantMappings,
};

struct StoredDataset {
    dataset_id: i32,
    dataset_name: String,
    category_id: i32,
    title: Option<String>,
    is_active: bool,
    keywords: Option<String>,
    license: Option<String>,
}

struct StoredMapping {
    participant_id: i32,
    field_id: i32,
    column_name: String,
    dataset_id: Option<i32>,
}

#[derive(Default)]
struct State {
    categories: Vec<Category>,
    datasets: Vec<StoredDataset>,
    // (dataset_id, field_name, ontology_mapping, data_type)
    dataset_fields: Vec<(i32, String, String, String)>,
    // (dataset_id, contact name)
    contacts: Vec<(i32, String)>,
    participants: Vec<Participant>,
    // (id, name)
    federated_fields: Vec<(i32, String)>,
    mappings: Vec<StoredMapping>,
    // (category_id, dataset_id, column_name)
    other_columns: Vec<(i32, i32, String)>,
}

impl State {
    fn field_ids(&self, mappings: &[FieldMapping]) -> Result<Vec<i32>> {
        mappings
            .iter()
            .map(|mapping| {
                self.federated_fields
                    .iter()
                    .find(|(_, name)| *name == mapping.field_name)
                    .map(|(id, _)| *id)
                    .ok_or_else(|| {
                        CatalogError::Validation(format!(
                            "Federated field '{}' not found.",
                            mapping.field_name
                        ))
                    })
            })
            .collect()
    }

    fn next_id(len: usize) -> i32 {
        len as i32 + 1
    }
}

/// Catalog store kept in memory, seeded with the open federated fields.
pub struct MemoryCatalogStore {
    state: Mutex<State>,
    pub ready: bool,
}

impl Default for MemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        let state = State {
            federated_fields: MAPPING_FIELDS
                .iter()
                .enumerate()
                .map(|(i, name)| (i as i32 + 1, name.to_string()))
                .collect(),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            ready: true,
        }
    }

    pub fn add_category(&self, name: &str) -> i32 {
        let mut state = self.state.lock().unwrap();
        let category_id = State::next_id(state.categories.len());
        state.categories.push(Category {
            category_id,
            category_name: name.to_string(),
        });
        category_id
    }

    pub fn add_participant(&self, name: &str, base_url: Option<&str>) -> i32 {
        let mut state = self.state.lock().unwrap();
        let participant_id = State::next_id(state.participants.len());
        state.participants.push(Participant {
            participant_id,
            participant_name: name.to_string(),
            dataset_id: None,
            base_url: base_url.map(str::to_string),
        });
        participant_id
    }

    /// Mapped column names stored for a participant, in insertion order
    pub fn mapped_columns(&self, participant_name: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let Some(participant) = state
            .participants
            .iter()
            .find(|p| p.participant_name == participant_name)
        else {
            return Vec::new();
        };
        state
            .mappings
            .iter()
            .filter(|m| m.participant_id == participant.participant_id)
            .map(|m| m.column_name.clone())
            .collect()
    }

    pub fn other_columns(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.other_columns.iter().map(|(_, _, c)| c.clone()).collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.state.lock().unwrap().categories.clone();
        categories.sort_by(|a, b| a.category_name.cmp(&b.category_name));
        Ok(categories)
    }

    async fn category_dataset_rows(&self) -> Result<Vec<CategoryDatasetRow>> {
        let state = self.state.lock().unwrap();
        let mut rows = Vec::new();

        for category in &state.categories {
            let active: Vec<_> = state
                .datasets
                .iter()
                .filter(|d| d.category_id == category.category_id && d.is_active)
                .collect();

            if active.is_empty() {
                rows.push(CategoryDatasetRow {
                    category_name: category.category_name.clone(),
                    ..Default::default()
                });
                continue;
            }

            for dataset in active {
                let base = CategoryDatasetRow {
                    category_name: category.category_name.clone(),
                    dataset_id: Some(dataset.dataset_id),
                    dataset_title: dataset.title.clone(),
                    keywords: dataset.keywords.clone(),
                    license: dataset.license.clone(),
                    ..Default::default()
                };

                let fields: Vec<_> = state
                    .dataset_fields
                    .iter()
                    .filter(|(id, ..)| *id == dataset.dataset_id)
                    .map(|(_, name, ontology, data_type)| {
                        (Some(name.clone()), Some(ontology.clone()), Some(data_type.clone()))
                    })
                    .collect();
                let contacts: Vec<_> = state
                    .contacts
                    .iter()
                    .filter(|(id, _)| *id == dataset.dataset_id)
                    .map(|(_, name)| Some(name.clone()))
                    .collect();

                let fields = if fields.is_empty() { vec![(None, None, None)] } else { fields };
                let contacts = if contacts.is_empty() { vec![None] } else { contacts };

                for (field_name, ontology_mapping, data_type) in &fields {
                    for contact_name in &contacts {
                        rows.push(CategoryDatasetRow {
                            contact_name: contact_name.clone(),
                            field_name: field_name.clone(),
                            ontology_mapping: ontology_mapping.clone(),
                            data_type: data_type.clone(),
                            ..base.clone()
                        });
                    }
                }
            }
        }

        // NULLS LAST, as in PostgreSQL
        rows.sort_by(|a, b| {
            (&a.category_name, a.dataset_title.is_none(), &a.dataset_title, a.field_name.is_none(), &a.field_name)
                .cmp(&(&b.category_name, b.dataset_title.is_none(), &b.dataset_title, b.field_name.is_none(), &b.field_name))
        });
        Ok(rows)
    }

    async fn metadata_rows(&self) -> Result<Vec<MetadataRow>> {
        let state = self.state.lock().unwrap();
        let mut rows = Vec::new();

        for mapping in &state.mappings {
            let Some(dataset) = state
                .datasets
                .iter()
                .find(|d| Some(d.dataset_id) == mapping.dataset_id)
            else {
                continue;
            };
            let Some(category) = state
                .categories
                .iter()
                .find(|c| c.category_id == dataset.category_id)
            else {
                continue;
            };
            let Some((_, field_name)) = state
                .federated_fields
                .iter()
                .find(|(id, _)| *id == mapping.field_id)
            else {
                continue;
            };

            rows.push(MetadataRow {
                category_name: category.category_name.clone(),
                dataset_name: dataset.dataset_name.clone(),
                federated_field_name: field_name.clone(),
                description: None,
                column_name: Some(mapping.column_name.clone()),
            });
        }

        rows.sort_by(|a, b| {
            (&a.category_name, &a.dataset_name, &a.federated_field_name)
                .cmp(&(&b.category_name, &b.dataset_name, &b.federated_field_name))
        });
        Ok(rows)
    }

    async fn list_federated_fields(&self) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.federated_fields.iter().map(|(_, name)| name.clone()).collect())
    }

    async fn list_participants(&self) -> Result<Vec<Participant>> {
        Ok(self.state.lock().unwrap().participants.clone())
    }

    async fn create_dataset(&self, dataset: &NewDataset) -> Result<i32> {
        let mut state = self.state.lock().unwrap();
        if !state
            .categories
            .iter()
            .any(|c| c.category_id == dataset.category_id)
        {
            return Err(CatalogError::NotFound(format!(
                "Category {} not found.",
                dataset.category_id
            )));
        }

        let dataset_id = State::next_id(state.datasets.len());
        state.datasets.push(StoredDataset {
            dataset_id,
            dataset_name: dataset.effective_name().to_string(),
            category_id: dataset.category_id,
            title: Some(dataset.title.clone()),
            is_active: dataset.is_active,
            keywords: dataset.keywords.clone(),
            license: Some(dataset.license.clone()),
        });
        Ok(dataset_id)
    }

    async fn save_dataset_details(&self, details: &DatasetDetails) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let dataset_id = details.dataset_id;
        if !state.datasets.iter().any(|d| d.dataset_id == dataset_id) {
            return Err(CatalogError::NotFound(format!(
                "Dataset {dataset_id} not found."
            )));
        }

        for mapping in &details.mappings {
            state.dataset_fields.push((
                dataset_id,
                mapping.field_name.clone(),
                mapping.ontology_mapping.clone(),
                mapping.data_type.clone(),
            ));
        }
        for contact in &details.contacts {
            state.contacts.push((dataset_id, contact.name.clone()));
        }
        Ok(())
    }

    async fn save_participant_mappings(&self, submission: &ParticipantMappings) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        let Some(participant) = state
            .participants
            .iter()
            .find(|p| p.participant_name == submission.participant_name)
            .cloned()
        else {
            return Err(CatalogError::NotFound(format!(
                "Participant '{}' not found.",
                submission.participant_name
            )));
        };

        let field_ids = state.field_ids(&submission.mappings)?;
        for (mapping, field_id) in submission.mappings.iter().zip(field_ids) {
            state.mappings.push(StoredMapping {
                participant_id: participant.participant_id,
                field_id,
                column_name: mapping.column_name.clone(),
                dataset_id: participant.dataset_id,
            });
        }
        Ok(submission.mappings.len())
    }

    async fn register_mapping(&self, registration: &MappingRegistration) -> Result<usize> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let field_ids = state.field_ids(&registration.mappings)?;

        let category_id = match state
            .categories
            .iter()
            .find(|c| c.category_name == registration.category)
        {
            Some(category) => category.category_id,
            None => {
                let category_id = State::next_id(state.categories.len());
                state.categories.push(Category {
                    category_id,
                    category_name: registration.category.clone(),
                });
                category_id
            }
        };

        let dataset_id = match state
            .datasets
            .iter()
            .find(|d| d.dataset_name == registration.dataset && d.category_id == category_id)
        {
            Some(dataset) => dataset.dataset_id,
            None => {
                let dataset_id = State::next_id(state.datasets.len());
                state.datasets.push(StoredDataset {
                    dataset_id,
                    dataset_name: registration.dataset.clone(),
                    category_id,
                    title: None,
                    is_active: true,
                    keywords: None,
                    license: None,
                });
                dataset_id
            }
        };

        let participant_id = match state
            .participants
            .iter_mut()
            .find(|p| p.participant_name == registration.participant_name)
        {
            Some(participant) => {
                participant.dataset_id = Some(dataset_id);
                if registration.base_url.is_some() {
                    participant.base_url = registration.base_url.clone();
                }
                participant.participant_id
            }
            None => {
                let participant_id = State::next_id(state.participants.len());
                state.participants.push(Participant {
                    participant_id,
                    participant_name: registration.participant_name.clone(),
                    dataset_id: Some(dataset_id),
                    base_url: registration.base_url.clone(),
                });
                participant_id
            }
        };

        for (mapping, field_id) in registration.mappings.iter().zip(field_ids) {
            state.mappings.push(StoredMapping {
                participant_id,
                field_id,
                column_name: mapping.column_name.clone(),
                dataset_id: Some(dataset_id),
            });
        }
        for column_name in &registration.other {
            state
                .other_columns
                .push((category_id, dataset_id, column_name.clone()));
        }
        Ok(registration.mappings.len())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

//! Owner-scoped access to date entries.
//!
//! Every call takes the owner id resolved from a verified token. A record
//! that exists but belongs to someone else is reported exactly like one
//! that does not exist.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::date_entry::{DateEntry, DateEntryPatch, DateFields};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSummary {
    pub total_dates: usize,
    pub average_rating: Option<f64>,
    pub average_chemistry: Option<f64>,
    pub average_attraction: Option<f64>,
}

#[derive(Clone)]
pub struct DateService {
    store: Arc<dyn RecordStore>,
}

fn not_found() -> AppError {
    AppError::NotFound("The specified date could not be found".into())
}

impl DateService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner_id: Uuid, fields: DateFields) -> AppResult<DateEntry> {
        let entry = self.store.insert_date(DateEntry::new(owner_id, fields)).await?;
        tracing::info!(user_id = %owner_id, date_id = %entry.id, "Date created");
        Ok(entry)
    }

    pub async fn list(&self, owner_id: Uuid) -> AppResult<Vec<DateEntry>> {
        Ok(self.store.dates_by_owner(owner_id).await?)
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> AppResult<DateEntry> {
        match self.store.date_by_id(id).await? {
            Some(entry) if entry.owner_id == owner_id => Ok(entry),
            Some(_) => {
                tracing::warn!(user_id = %owner_id, date_id = %id, "Cross-owner date access refused");
                Err(not_found())
            }
            None => Err(not_found()),
        }
    }

    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        patch: &DateEntryPatch,
    ) -> AppResult<DateEntry> {
        if patch.is_empty() {
            return self.get(owner_id, id).await;
        }
        let entry = self
            .store
            .update_date(id, owner_id, patch)
            .await?
            .ok_or_else(not_found)?;
        tracing::info!(user_id = %owner_id, date_id = %id, "Date updated");
        Ok(entry)
    }

    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> AppResult<bool> {
        let removed = self.store.remove_date(id, owner_id).await?;
        if removed {
            tracing::info!(user_id = %owner_id, date_id = %id, "Date deleted");
        }
        Ok(removed)
    }

    pub async fn summary(&self, owner_id: Uuid) -> AppResult<DateSummary> {
        let dates = self.list(owner_id).await?;
        Ok(DateSummary {
            total_dates: dates.len(),
            average_rating: average(dates.iter().filter_map(|d| d.rating)),
            average_chemistry: average(dates.iter().filter_map(|d| d.chemistry_rating)),
            average_attraction: average(dates.iter().filter_map(|d| d.attraction_rating)),
        })
    }
}

pub(crate) fn average(values: impl Iterator<Item = i32>) -> Option<f64> {
    let (sum, count) = values.fold((0i64, 0u32), |(s, c), v| (s + v as i64, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

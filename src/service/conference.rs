use sqlx::PgPool;

use crate::db::queries;
use crate::error::AppError;
use crate::models::{
    BoxFilter, BoxPatch, BoxRecord, Conference, ConferenceDetail, ConferenceFilter,
    ConferenceItem, ConferencePatch, ImportItem, ItemPatch, NewBox, NewConference, Patch,
};
use crate::service::aggregate;
use crate::service::recompute::{recompute_item, BoxLookup};

/// Conference service: loads snapshots, runs the pure recompute/aggregate
/// functions, persists the results. All storage access lives here; the
/// engines never touch the pool.
pub struct ConferenceService {
    pool: PgPool,
}

/// Box row fetched ahead of a recompute so the pipeline stays synchronous.
/// An id that does not match (or no row at all) reads as "box unknown".
struct PrefetchedBox(Option<(i32, f64)>);

impl PrefetchedBox {
    fn new(row: Option<&BoxRecord>) -> Self {
        Self(row.map(|b| (b.id, b.weight)))
    }
}

impl BoxLookup for PrefetchedBox {
    fn tare_weight(&self, box_id: i32) -> Result<Option<f64>, AppError> {
        Ok(self.0.filter(|(id, _)| *id == box_id).map(|(_, w)| w))
    }
}

/// Writes the editable header fields onto the conference. A status value is
/// only accepted when it does not move backward; a completed conference stays
/// completed.
fn apply_conference_patch(
    mut conference: Conference,
    patch: &ConferencePatch,
) -> Result<Conference, AppError> {
    patch.supplier_name.apply_to(&mut conference.supplier_name);
    patch.invoice_number.apply_to(&mut conference.invoice_number);
    patch.observations.apply_to(&mut conference.observations);
    if let Patch::Value(status) = patch.status {
        if !conference.status.can_transition_to(status) {
            return Err(AppError::InvalidInput("status cannot move backward"));
        }
        conference.status = status;
    }
    Ok(conference)
}

impl ConferenceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== Conferences ====================

    pub async fn create_conference(&self, new: NewConference) -> Result<Conference, AppError> {
        let conference = queries::insert_conference(&self.pool, &new).await?;
        tracing::info!("Conference {} created for {:?}", conference.id, conference.supplier_name);
        Ok(conference)
    }

    pub async fn list_conferences(
        &self,
        filter: ConferenceFilter,
    ) -> Result<Vec<Conference>, AppError> {
        Ok(queries::list_conferences(&self.pool, &filter).await?)
    }

    pub async fn get_conference(&self, conference_id: i32) -> Result<ConferenceDetail, AppError> {
        let (conference, items) = futures::try_join!(
            queries::get_conference(&self.pool, conference_id),
            queries::list_conference_items(&self.pool, conference_id),
        )?;
        let conference = conference.ok_or(AppError::NotFound("conference"))?;
        Ok(ConferenceDetail { conference, items })
    }

    /// Edits the conference header (supplier, invoice number, observations,
    /// status). Status edits are forward-only.
    pub async fn update_conference(
        &self,
        conference_id: i32,
        patch: ConferencePatch,
    ) -> Result<Conference, AppError> {
        let conference = queries::get_conference(&self.pool, conference_id)
            .await?
            .ok_or(AppError::NotFound("conference"))?;

        let next = apply_conference_patch(conference, &patch)?;
        queries::update_conference(&self.pool, &next).await?;
        Ok(next)
    }

    /// Removes a conference and everything imported into it.
    pub async fn delete_conference(&self, conference_id: i32) -> Result<(), AppError> {
        if !queries::delete_conference(&self.pool, conference_id).await? {
            return Err(AppError::NotFound("conference"));
        }
        tracing::info!("Conference {} deleted", conference_id);
        Ok(())
    }

    /// Bulk item import. Advances a pending conference to in_progress; a
    /// conference that already moved on keeps its status.
    pub async fn import_items(
        &self,
        conference_id: i32,
        rows: Vec<ImportItem>,
    ) -> Result<Vec<ConferenceItem>, AppError> {
        if rows.is_empty() {
            return Err(AppError::InvalidInput("no items to import"));
        }
        let conference = queries::get_conference(&self.pool, conference_id)
            .await?
            .ok_or(AppError::NotFound("conference"))?;

        let items = queries::insert_items(&self.pool, conference_id, &rows).await?;

        let next_status = conference.status.advance_on_import();
        if next_status != conference.status {
            queries::update_conference_status(&self.pool, conference_id, next_status).await?;
        }

        tracing::info!("Conference {}: imported {} items", conference_id, items.len());
        Ok(items)
    }

    /// Applies a partial update to one item and persists the recomputed
    /// snapshot. The effective box row is fetched up front (one lookup per
    /// update, uncached). There is no version column: concurrent updates to
    /// the same item are last-write-wins.
    pub async fn update_item(
        &self,
        conference_id: i32,
        item_id: i32,
        patch: ItemPatch,
    ) -> Result<ConferenceItem, AppError> {
        let item = queries::get_item(&self.pool, conference_id, item_id)
            .await?
            .ok_or(AppError::NotFound("item"))?;

        let box_row = match patch.box_id.resolve(item.box_id) {
            Some(box_id) => queries::get_box(&self.pool, box_id).await?,
            None => None,
        };

        let next = recompute_item(&item, &patch, &PrefetchedBox::new(box_row.as_ref()))?;
        let next = queries::update_item(&self.pool, &next).await?;

        tracing::debug!(
            "Conference {} item {}: net {:?}, new cost {:?}",
            conference_id,
            item_id,
            next.net_weight,
            next.new_cost
        );
        Ok(next)
    }

    /// Freezes the conference: aggregates item totals, marks it completed.
    /// The item read and the conference write are not one transaction; an
    /// item update landing in between leaves the persisted totals stale, and
    /// that window is accepted.
    pub async fn finalize(&self, conference_id: i32) -> Result<Conference, AppError> {
        let (conference, items) = futures::try_join!(
            queries::get_conference(&self.pool, conference_id),
            queries::list_conference_items(&self.pool, conference_id),
        )?;
        let conference = conference.ok_or(AppError::NotFound("conference"))?;

        let finalized = aggregate::finalize(conference, &items);
        queries::save_conference_totals(&self.pool, &finalized).await?;

        tracing::info!(
            "Conference {} finalized: expected {:.3} kg, actual {:.3} kg, cost {:.2}",
            conference_id,
            finalized.total_expected_weight.unwrap_or_default(),
            finalized.total_actual_weight.unwrap_or_default(),
            finalized.total_cost.unwrap_or_default(),
        );
        Ok(finalized)
    }

    /// Conference items rendered as CSV for back-office export.
    pub async fn export_items(&self, conference_id: i32) -> Result<Vec<u8>, AppError> {
        let detail = self.get_conference(conference_id).await?;
        Ok(queries::export_items_csv(&detail.items)?)
    }

    // ==================== Boxes ====================

    pub async fn list_boxes(&self, filter: BoxFilter) -> Result<Vec<BoxRecord>, AppError> {
        Ok(queries::list_boxes(&self.pool, &filter).await?)
    }

    pub async fn create_box(&self, new: NewBox) -> Result<BoxRecord, AppError> {
        Ok(queries::insert_box(&self.pool, &new).await?)
    }

    pub async fn update_box(&self, box_id: i32, patch: BoxPatch) -> Result<BoxRecord, AppError> {
        let mut record = queries::get_box(&self.pool, box_id)
            .await?
            .ok_or(AppError::NotFound("box"))?;

        if let Patch::Value(name) = &patch.name {
            record.name = name.clone();
        }
        patch.description.apply_to(&mut record.description);
        if let Patch::Value(weight) = patch.weight {
            record.weight = weight;
        }
        if let Patch::Value(active) = patch.active {
            record.active = active;
        }
        patch.photo_url.apply_to(&mut record.photo_url);

        queries::update_box(&self.pool, &record).await?;
        Ok(record)
    }

    pub async fn delete_box(&self, box_id: i32) -> Result<(), AppError> {
        if !queries::delete_box(&self.pool, box_id).await? {
            return Err(AppError::NotFound("box"));
        }
        Ok(())
    }
}

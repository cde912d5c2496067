use crate::models::{
    BoxFilter, BoxRecord, Conference, ConferenceFilter, ConferenceItem, ConferenceStatus,
    ImportItem, NewBox, NewConference,
};
use sqlx::PgPool;

const CONFERENCE_COLUMNS: &str = "id, company_id, supplier_name, invoice_number, \
    conference_date, status, total_expected_weight, total_actual_weight, total_cost, \
    observations, created_at";

const ITEM_COLUMNS: &str = "id, conference_id, barcode, product_name, curve, section, \
    product_group, sub_group, current_cost, current_sale_price, reference_margin, \
    current_margin, product_type, total_paid_value, new_cost, supplier_id, box_id, \
    box_quantity, gross_weight, net_weight, expected_weight, weight_difference, \
    total_units, units_per_box, invoice_box_quantity, invoice_status, suggested_price, \
    margin_if_keep_price, quality, photo_url, observations, checked, created_at, updated_at";

const BOX_COLUMNS: &str = "id, company_id, name, description, weight, photo_url, active";

// ==================== Conferences ====================

pub async fn get_conference(
    pool: &PgPool,
    conference_id: i32,
) -> Result<Option<Conference>, sqlx::Error> {
    let sql = format!("SELECT {CONFERENCE_COLUMNS} FROM hortfrut_conferences WHERE id = $1");
    sqlx::query_as::<_, Conference>(&sql)
        .bind(conference_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_conferences(
    pool: &PgPool,
    filter: &ConferenceFilter,
) -> Result<Vec<Conference>, sqlx::Error> {
    let mut qb = sqlx::QueryBuilder::new(format!(
        "SELECT {CONFERENCE_COLUMNS} FROM hortfrut_conferences WHERE 1 = 1"
    ));
    if let Some(company_id) = &filter.company_id {
        qb.push(" AND company_id = ").push_bind(company_id.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        qb.push(" AND conference_date BETWEEN ")
            .push_bind(start)
            .push(" AND ")
            .push_bind(end);
    }
    qb.push(" ORDER BY conference_date DESC, created_at DESC");
    qb.build_query_as::<Conference>().fetch_all(pool).await
}

pub async fn insert_conference(
    pool: &PgPool,
    new: &NewConference,
) -> Result<Conference, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO hortfrut_conferences
            (company_id, supplier_name, invoice_number, conference_date, observations, status)
        VALUES ($1, $2, $3, $4, $5, 'pending')
        RETURNING {CONFERENCE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Conference>(&sql)
        .bind(new.company_id.clone())
        .bind(new.supplier_name.clone())
        .bind(new.invoice_number.clone())
        .bind(new.conference_date)
        .bind(new.observations.clone())
        .fetch_one(pool)
        .await
}

pub async fn update_conference_status(
    pool: &PgPool,
    conference_id: i32,
    status: ConferenceStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE hortfrut_conferences SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(conference_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persists the frozen totals and the terminal status in one statement.
pub async fn save_conference_totals(
    pool: &PgPool,
    conference: &Conference,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE hortfrut_conferences
        SET total_expected_weight = $1,
            total_actual_weight = $2,
            total_cost = $3,
            status = $4
        WHERE id = $5
        "#,
    )
    .bind(conference.total_expected_weight)
    .bind(conference.total_actual_weight)
    .bind(conference.total_cost)
    .bind(conference.status)
    .bind(conference.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persists the editable header fields (supplier, invoice number,
/// observations, status). Totals are only ever written by finalize.
pub async fn update_conference(
    pool: &PgPool,
    conference: &Conference,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE hortfrut_conferences
        SET supplier_name = $1, invoice_number = $2, observations = $3, status = $4
        WHERE id = $5
        "#,
    )
    .bind(conference.supplier_name.clone())
    .bind(conference.invoice_number.clone())
    .bind(conference.observations.clone())
    .bind(conference.status)
    .bind(conference.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes a conference and its items. Items go first; the foreign key has no
/// cascade. Returns whether the conference row existed.
pub async fn delete_conference(pool: &PgPool, conference_id: i32) -> Result<bool, sqlx::Error> {
    sqlx::query("DELETE FROM hortfrut_conference_items WHERE conference_id = $1")
        .bind(conference_id)
        .execute(pool)
        .await?;
    let result = sqlx::query("DELETE FROM hortfrut_conferences WHERE id = $1")
        .bind(conference_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== Conference items ====================

pub async fn get_item(
    pool: &PgPool,
    conference_id: i32,
    item_id: i32,
) -> Result<Option<ConferenceItem>, sqlx::Error> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM hortfrut_conference_items \
         WHERE id = $1 AND conference_id = $2"
    );
    sqlx::query_as::<_, ConferenceItem>(&sql)
        .bind(item_id)
        .bind(conference_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_conference_items(
    pool: &PgPool,
    conference_id: i32,
) -> Result<Vec<ConferenceItem>, sqlx::Error> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM hortfrut_conference_items \
         WHERE conference_id = $1 ORDER BY id"
    );
    sqlx::query_as::<_, ConferenceItem>(&sql)
        .bind(conference_id)
        .fetch_all(pool)
        .await
}

/// Bulk insert of imported lines, chunked at 1000 rows per statement.
pub async fn insert_items(
    pool: &PgPool,
    conference_id: i32,
    rows: &[ImportItem],
) -> Result<Vec<ConferenceItem>, sqlx::Error> {
    let mut created = Vec::with_capacity(rows.len());
    for chunk in rows.chunks(1000) {
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO hortfrut_conference_items (
                conference_id, barcode, product_name, curve, section, product_group,
                sub_group, current_cost, current_sale_price, reference_margin,
                current_margin, expected_weight, checked
            ) ",
        );
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(conference_id)
                .push_bind(row.barcode.clone())
                .push_bind(row.product_name.clone())
                .push_bind(row.curve.clone())
                .push_bind(row.section.clone())
                .push_bind(row.product_group.clone())
                .push_bind(row.sub_group.clone())
                .push_bind(row.current_cost)
                .push_bind(row.current_sale_price)
                .push_bind(row.reference_margin)
                .push_bind(row.current_margin)
                .push_bind(row.expected_weight)
                .push_bind(false);
        });
        qb.push(" RETURNING ");
        qb.push(ITEM_COLUMNS);
        created.extend(qb.build_query_as::<ConferenceItem>().fetch_all(pool).await?);
    }
    Ok(created)
}

/// Persists a recomputed item snapshot and returns the stored row (so the
/// caller sees the refreshed updated_at). Whole-row write: two concurrent
/// updates to the same item race and the last one wins.
pub async fn update_item(
    pool: &PgPool,
    item: &ConferenceItem,
) -> Result<ConferenceItem, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE hortfrut_conference_items
        SET product_type = $1,
            total_paid_value = $2,
            invoice_box_quantity = $3,
            invoice_status = $4,
            units_per_box = $5,
            total_units = $6,
            box_id = $7,
            box_quantity = $8,
            gross_weight = $9,
            net_weight = $10,
            new_cost = $11,
            suggested_price = $12,
            margin_if_keep_price = $13,
            current_margin = $14,
            quality = $15,
            photo_url = $16,
            observations = $17,
            checked = $18,
            supplier_id = $19,
            updated_at = now()
        WHERE id = $20 AND conference_id = $21
        RETURNING {ITEM_COLUMNS}
        "#
    );
    sqlx::query_as::<_, ConferenceItem>(&sql)
        .bind(item.product_type)
        .bind(item.total_paid_value)
        .bind(item.invoice_box_quantity)
        .bind(item.invoice_status.clone())
        .bind(item.units_per_box)
        .bind(item.total_units)
        .bind(item.box_id)
        .bind(item.box_quantity)
        .bind(item.gross_weight)
        .bind(item.net_weight)
        .bind(item.new_cost)
        .bind(item.suggested_price)
        .bind(item.margin_if_keep_price)
        .bind(item.current_margin)
        .bind(item.quality.clone())
        .bind(item.photo_url.clone())
        .bind(item.observations.clone())
        .bind(item.checked)
        .bind(item.supplier_id)
        .bind(item.id)
        .bind(item.conference_id)
        .fetch_one(pool)
        .await
}

// ==================== Boxes ====================

pub async fn get_box(pool: &PgPool, box_id: i32) -> Result<Option<BoxRecord>, sqlx::Error> {
    let sql = format!("SELECT {BOX_COLUMNS} FROM hortfrut_boxes WHERE id = $1");
    sqlx::query_as::<_, BoxRecord>(&sql)
        .bind(box_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_boxes(pool: &PgPool, filter: &BoxFilter) -> Result<Vec<BoxRecord>, sqlx::Error> {
    let mut qb = sqlx::QueryBuilder::new(format!(
        "SELECT {BOX_COLUMNS} FROM hortfrut_boxes WHERE 1 = 1"
    ));
    if let Some(company_id) = &filter.company_id {
        qb.push(" AND company_id = ").push_bind(company_id.clone());
    }
    if let Some(active) = filter.active {
        qb.push(" AND active = ").push_bind(active);
    }
    qb.push(" ORDER BY name ASC");
    qb.build_query_as::<BoxRecord>().fetch_all(pool).await
}

pub async fn insert_box(pool: &PgPool, new: &NewBox) -> Result<BoxRecord, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO hortfrut_boxes (company_id, name, description, weight, photo_url, active)
        VALUES ($1, $2, $3, $4, $5, true)
        RETURNING {BOX_COLUMNS}
        "#
    );
    sqlx::query_as::<_, BoxRecord>(&sql)
        .bind(new.company_id.clone())
        .bind(new.name.clone())
        .bind(new.description.clone())
        .bind(new.weight)
        .bind(new.photo_url.clone())
        .fetch_one(pool)
        .await
}

pub async fn update_box(pool: &PgPool, record: &BoxRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE hortfrut_boxes
        SET name = $1, description = $2, weight = $3, photo_url = $4, active = $5
        WHERE id = $6
        "#,
    )
    .bind(record.name.clone())
    .bind(record.description.clone())
    .bind(record.weight)
    .bind(record.photo_url.clone())
    .bind(record.active)
    .bind(record.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns whether the box row existed. A box still referenced by items fails
/// the foreign key and surfaces as a database error, as in the legacy backend.
pub async fn delete_box(pool: &PgPool, box_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM hortfrut_boxes WHERE id = $1")
        .bind(box_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== CSV export ====================

/// Formats an optional numeric column as a CSV cell.
fn option_to_csv<T: ToString>(val: &Option<T>) -> String {
    val.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// Renders conference items as CSV (one line per invoice item).
pub fn export_items_csv(items: &[ConferenceItem]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "barcode",
        "product_name",
        "quality",
        "box_quantity",
        "gross_weight",
        "net_weight",
        "expected_weight",
        "total_paid_value",
        "new_cost",
        "suggested_price",
        "current_margin",
        "margin_if_keep_price",
        "checked",
    ])?;

    for item in items {
        writer.write_record(&[
            item.barcode.clone().unwrap_or_default(),
            item.product_name.clone(),
            item.quality.clone().unwrap_or_default(),
            option_to_csv(&item.box_quantity),
            option_to_csv(&item.gross_weight),
            option_to_csv(&item.net_weight),
            option_to_csv(&item.expected_weight),
            option_to_csv(&item.total_paid_value),
            option_to_csv(&item.new_cost),
            option_to_csv(&item.suggested_price),
            option_to_csv(&item.current_margin),
            option_to_csv(&item.margin_if_keep_price),
            item.checked.to_string(),
        ])?;
    }

    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_export_renders_header_and_rows() {
        let items = vec![ConferenceItem {
            product_name: "Tomate Italiano".to_string(),
            barcode: Some("7891000100103".to_string()),
            net_weight: Some(8.0),
            new_cost: Some(2.5),
            ..ConferenceItem::default()
        }];
        let bytes = export_items_csv(&items).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("barcode,product_name"));
        let row = lines.next().unwrap();
        assert!(row.contains("Tomate Italiano"));
        assert!(row.contains("2.5"));
    }
}

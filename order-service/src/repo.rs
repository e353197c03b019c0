use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use common_money::PriceBreakdown;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::status::{OrderStatus, ReconciledUpdate};

const ORDER_COLUMNS: &str = "id, user_id, payment_method, items_total, tax_total, \
     shipping_total, discount_total, grand_total, shipping_name, shipping_address, \
     shipping_city, shipping_postal_code, shipping_country, status, is_paid, paid_at, \
     payment_id, payment_status, is_delivered, delivered_at, awb_number, created_at, updated_at";

/// Canonical order row. Monetary columns stay `numeric`; line items live in
/// `order_items` as immutable snapshots.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_method: String,
    pub items_total: BigDecimal,
    pub tax_total: BigDecimal,
    pub shipping_total: BigDecimal,
    pub discount_total: BigDecimal,
    pub grand_total: BigDecimal,
    pub shipping_name: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub shipping_country: String,
    pub status: String,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_id: Option<String>,
    pub payment_status: Option<String>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub awb_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItemRecord {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub image_url: Option<String>,
}

/// Shipping details captured at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShippingSnapshot {
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Admin listing row: the order plus owner display fields.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminOrderRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: OrderRecord,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
}

pub struct NewOrder<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_method: &'a str,
    pub totals: &'a PriceBreakdown,
    pub shipping: &'a ShippingSnapshot,
    pub items: &'a [OrderItemRecord],
}

/// Insert the order row and its line-item snapshots in one transaction.
pub async fn insert_order(pool: &PgPool, new: NewOrder<'_>) -> Result<OrderRecord, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, OrderRecord>(&format!(
        "INSERT INTO orders (id, user_id, payment_method, items_total, tax_total, \
             shipping_total, discount_total, grand_total, shipping_name, shipping_address, \
             shipping_city, shipping_postal_code, shipping_country, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending') \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(new.id)
    .bind(new.user_id)
    .bind(new.payment_method)
    .bind(&new.totals.items_total)
    .bind(&new.totals.tax_total)
    .bind(&new.totals.shipping_total)
    .bind(&new.totals.discount_total)
    .bind(&new.totals.grand_total)
    .bind(&new.shipping.name)
    .bind(&new.shipping.address)
    .bind(&new.shipping.city)
    .bind(&new.shipping.postal_code)
    .bind(&new.shipping.country)
    .fetch_one(&mut *tx)
    .await?;

    for item in new.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, name, unit_price, quantity, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(new.id)
        .bind(item.product_id)
        .bind(&item.name)
        .bind(&item.unit_price)
        .bind(item.quantity)
        .bind(&item.image_url)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(order)
}

pub async fn fetch_order(pool: &PgPool, id: Uuid) -> Result<Option<OrderRecord>, sqlx::Error> {
    sqlx::query_as::<_, OrderRecord>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_items(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderItemRecord>, sqlx::Error> {
    sqlx::query_as::<_, OrderItemRecord>(
        "SELECT product_id, name, unit_price, quantity, image_url \
         FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<OrderRecord>, sqlx::Error> {
    sqlx::query_as::<_, OrderRecord>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<AdminOrderRow>, sqlx::Error> {
    sqlx::query_as::<_, AdminOrderRow>(
        "SELECT o.*, u.name AS owner_name, u.email AS owner_email \
         FROM orders o LEFT JOIN users u ON u.id = o.user_id \
         ORDER BY o.created_at DESC",
    )
    .fetch_all(pool)
    .await
}

/// Apply a reconciled fulfillment patch as one field-scoped write. Columns
/// not named by the patch are left untouched so concurrent writers on
/// disjoint fields (e.g. payment verification) cannot be clobbered.
pub async fn apply_fulfillment(
    pool: &PgPool,
    id: Uuid,
    update: &ReconciledUpdate,
) -> Result<Option<OrderRecord>, sqlx::Error> {
    sqlx::query_as::<_, OrderRecord>(&format!(
        "UPDATE orders SET \
             status = COALESCE($2, status), \
             awb_number = COALESCE($3, awb_number), \
             is_delivered = COALESCE($4, is_delivered), \
             delivered_at = CASE \
                 WHEN $4 IS NULL THEN delivered_at \
                 WHEN $4 THEN COALESCE(delivered_at, now()) \
                 ELSE NULL END, \
             is_paid = COALESCE($5, is_paid), \
             paid_at = CASE \
                 WHEN $5 IS NULL THEN paid_at \
                 WHEN $5 THEN COALESCE(paid_at, now()) \
                 ELSE NULL END, \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.awb_number.as_deref())
    .bind(update.delivered)
    .bind(update.paid)
    .fetch_optional(pool)
    .await
}

/// Batched status transition. One statement covers every matched id, so a
/// transport failure applies either all matched rows or none; unmatched ids
/// simply do not count.
pub async fn bulk_set_status(
    pool: &PgPool,
    ids: &[Uuid],
    status: OrderStatus,
) -> Result<u64, sqlx::Error> {
    let delivered = status == OrderStatus::Delivered;

    let result = sqlx::query(
        "UPDATE orders SET \
             status = $2, \
             is_delivered = $3, \
             delivered_at = CASE WHEN $3 THEN COALESCE(delivered_at, now()) ELSE NULL END, \
             updated_at = now() \
         WHERE id = ANY($1)",
    )
    .bind(ids)
    .bind(status.as_str())
    .bind(delivered)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use common_money::{is_negative, PriceBreakdown};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::app::AppState;
use crate::identity::{resolve_owner, OwnerError};
use crate::repo::{self, AdminOrderRow, NewOrder, OrderItemRecord, OrderRecord, ShippingSnapshot};
use crate::status::{reconcile, FulfillmentPatch, OrderStatus};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRecord>,
    pub shipping: ShippingSnapshot,
    pub payment_method: String,
    pub totals: PriceBreakdown,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkStatusRequest {
    pub order_ids: Vec<Uuid>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct BulkStatusResponse {
    pub count: u64,
}

fn ensure_admin(auth: &AuthContext) -> ApiResult<()> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(ApiError::ForbiddenMissingRole {
            role: "admin",
            trace_id: None,
        })
    }
}

fn db_error(context: &'static str, err: sqlx::Error) -> ApiError {
    error!(error = %err, context, "database operation failed");
    ApiError::internal(None)
}

pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    if req.items.is_empty() {
        return Err(ApiError::bad_request("empty_order"));
    }
    for item in &req.items {
        if item.quantity < 1 || is_negative(&item.unit_price) {
            return Err(ApiError::bad_request("invalid_line_item"));
        }
    }
    req.totals.validate().map_err(|err| match err {
        common_money::BreakdownError::TotalMismatch { .. } => {
            ApiError::bad_request_with("total_mismatch", err.to_string())
        }
        common_money::BreakdownError::Negative(_) => {
            ApiError::bad_request_with("negative_amount", err.to_string())
        }
    })?;

    let owner = resolve_owner(&state.db, &auth.claims, req.customer_id)
        .await
        .map_err(|err| match err {
            OwnerError::NoValidOwner => ApiError::bad_request("no_valid_owner"),
            OwnerError::Db(db) => db_error("resolve_owner", db),
        })?;

    let order_id = Uuid::new_v4();
    let order = repo::insert_order(
        &state.db,
        NewOrder {
            id: order_id,
            user_id: owner,
            payment_method: &req.payment_method,
            totals: &req.totals,
            shipping: &req.shipping,
            items: &req.items,
        },
    )
    .await
    .map_err(|err| db_error("insert_order", err))?;

    info!(order_id = %order.id, owner = %owner, "order created");
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            order,
            items: req.items,
        }),
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = repo::fetch_order(&state.db, order_id)
        .await
        .map_err(|err| db_error("fetch_order", err))?
        .ok_or_else(|| ApiError::not_found("order_not_found"))?;

    let is_owner = auth.claims.subject.user_id() == Some(order.user_id);
    if !is_owner && !auth.is_admin() {
        return Err(ApiError::forbidden());
    }

    let items = repo::fetch_items(&state.db, order_id)
        .await
        .map_err(|err| db_error("fetch_items", err))?;

    Ok(Json(OrderResponse { order, items }))
}

pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<OrderRecord>>> {
    // The break-glass credential owns no rows of its own.
    let Some(user_id) = auth.claims.subject.user_id() else {
        return Ok(Json(Vec::new()));
    };
    let orders = repo::list_for_user(&state.db, user_id)
        .await
        .map_err(|err| db_error("list_for_user", err))?;
    Ok(Json(orders))
}

pub async fn admin_list_orders(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<AdminOrderRow>>> {
    ensure_admin(&auth)?;
    let orders = repo::list_all(&state.db)
        .await
        .map_err(|err| db_error("list_all", err))?;
    Ok(Json(orders))
}

pub async fn admin_update_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(order_id): Path<Uuid>,
    Json(patch): Json<FulfillmentPatch>,
) -> ApiResult<Json<OrderRecord>> {
    ensure_admin(&auth)?;

    let update = reconcile(patch);
    let order = repo::apply_fulfillment(&state.db, order_id, &update)
        .await
        .map_err(|err| db_error("apply_fulfillment", err))?
        .ok_or_else(|| ApiError::not_found("order_not_found"))?;

    info!(order_id = %order.id, status = %order.status, "order updated");
    Ok(Json(order))
}

pub async fn admin_bulk_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<BulkStatusRequest>,
) -> ApiResult<Json<BulkStatusResponse>> {
    ensure_admin(&auth)?;

    if req.order_ids.is_empty() {
        return Err(ApiError::bad_request("invalid_request"));
    }
    let Some(status) = OrderStatus::parse(&req.status) else {
        return Err(ApiError::bad_request("invalid_request"));
    };

    let count = repo::bulk_set_status(&state.db, &req.order_ids, status)
        .await
        .map_err(|err| db_error("bulk_set_status", err))?;

    info!(count, status = status.as_str(), "bulk status transition applied");
    Ok(Json(BulkStatusResponse { count }))
}

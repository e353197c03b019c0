use axum::extract::State;
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::app::AppState;
use crate::rollup::{
    report_day_start, report_month_start, summarize, PaidOrderRow, RevenueFacet, TrendDay,
};

#[derive(Debug, Serialize)]
pub struct RevenueSummary {
    pub all: RevenueFacet,
    pub today: RevenueFacet,
    pub month: RevenueFacet,
}

#[derive(Debug, Serialize)]
pub struct OrderCounts {
    pub all: i64,
    pub today: i64,
    pub month: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProductQuantity {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProductRevenue {
    pub product_id: Uuid,
    pub name: String,
    pub revenue: BigDecimal,
}

#[derive(Debug, Serialize)]
pub struct TopProducts {
    pub by_quantity: Vec<TopProductQuantity>,
    pub by_revenue: Vec<TopProductRevenue>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StockAlert {
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
}

#[derive(Debug, Serialize)]
pub struct StockAlerts {
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: Vec<StockAlert>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecentOrder {
    pub id: Uuid,
    pub grand_total: BigDecimal,
    pub status: String,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub owner_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub revenue: RevenueSummary,
    pub orders: OrderCounts,
    pub trend: Vec<TrendDay>,
    pub top_products: TopProducts,
    pub products: StockAlerts,
    pub recent_orders: Vec<RecentOrder>,
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
    error!(error = %err, context, "dashboard query failed");
    ApiError::internal(None)
}

/// Assemble the admin dashboard. All reads, no locks; each query sees its
/// own read-committed snapshot of the store.
pub async fn get_dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<DashboardResponse>> {
    ensure_admin(&auth)?;

    let now = Utc::now();

    let paid_rows = sqlx::query_as::<_, PaidOrderRow>(
        "SELECT created_at, grand_total, shipping_address FROM orders WHERE is_paid = TRUE",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_error("paid_orders", err))?;

    let rollup = summarize(&paid_rows, now);

    let (all, today, month) = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT COUNT(*), \
                COUNT(*) FILTER (WHERE created_at >= $1), \
                COUNT(*) FILTER (WHERE created_at >= $2) \
         FROM orders",
    )
    .bind(report_day_start(now))
    .bind(report_month_start(now))
    .fetch_one(&state.db)
    .await
    .map_err(|err| db_error("order_counts", err))?;

    let by_quantity = sqlx::query_as::<_, TopProductQuantity>(
        "SELECT oi.product_id, \
                (ARRAY_AGG(oi.name ORDER BY o.created_at DESC))[1] AS name, \
                SUM(oi.quantity)::BIGINT AS quantity \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         GROUP BY oi.product_id \
         ORDER BY quantity DESC \
         LIMIT 5",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_error("top_by_quantity", err))?;

    let by_revenue = sqlx::query_as::<_, TopProductRevenue>(
        "SELECT oi.product_id, \
                (ARRAY_AGG(oi.name ORDER BY o.created_at DESC))[1] AS name, \
                SUM(oi.unit_price * oi.quantity) AS revenue \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         WHERE o.is_paid \
         GROUP BY oi.product_id \
         ORDER BY revenue DESC \
         LIMIT 5",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_error("top_by_revenue", err))?;

    let low_stock = sqlx::query_as::<_, StockAlert>(
        "SELECT id, name, stock FROM products \
         WHERE stock > 0 AND stock <= 10 \
         ORDER BY stock ASC, name ASC \
         LIMIT 5",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_error("low_stock", err))?;

    let out_of_stock = sqlx::query_as::<_, StockAlert>(
        "SELECT id, name, stock FROM products WHERE stock = 0 ORDER BY name ASC LIMIT 5",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_error("out_of_stock", err))?;

    let recent_orders = sqlx::query_as::<_, RecentOrder>(
        "SELECT o.id, o.grand_total, o.status, o.is_paid, o.created_at, u.name AS owner_name \
         FROM orders o \
         LEFT JOIN users u ON u.id = o.user_id \
         ORDER BY o.created_at DESC \
         LIMIT 5",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_error("recent_orders", err))?;

    Ok(Json(DashboardResponse {
        revenue: RevenueSummary {
            all: rollup.all,
            today: rollup.today,
            month: rollup.month,
        },
        orders: OrderCounts { all, today, month },
        trend: rollup.trend,
        top_products: TopProducts {
            by_quantity,
            by_revenue,
        },
        products: StockAlerts {
            low_stock,
            out_of_stock,
        },
        recent_orders,
    }))
}

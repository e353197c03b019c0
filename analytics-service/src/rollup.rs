use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// Fixed reporting offset (UTC+05:30). Calendar-day boundaries for the
/// dashboard are taken in this offset, not in UTC.
pub const REPORT_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Days covered by the dashboard trend, today included.
pub const TREND_DAYS: i64 = 7;

fn report_offset() -> FixedOffset {
    FixedOffset::east_opt(REPORT_UTC_OFFSET_SECS).expect("offset is in range")
}

/// Counter sales are flagged by the client writing this literal into the
/// shipping-address line. Brittle, but historical orders depend on it; keep
/// the sentinel behind this predicate only.
pub fn is_counter_sale(shipping_address: &str) -> bool {
    shipping_address == "Counter Sale"
}

/// The calendar date of an instant in the reporting offset.
pub fn report_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&report_offset()).date_naive()
}

/// UTC instant of local midnight today (reporting offset).
pub fn report_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    utc_midnight(report_date(now))
}

/// UTC instant of local midnight on the 1st of the current month.
pub fn report_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = report_date(now).with_day(1).expect("day 1 is always valid");
    utc_midnight(first)
}

fn utc_midnight(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid");
    Utc.from_utc_datetime(&(midnight - Duration::seconds(i64::from(REPORT_UTC_OFFSET_SECS))))
}

/// Paid order fields the rollup needs; fetched in one read so aggregation
/// never blocks concurrent writers.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaidOrderRow {
    pub created_at: DateTime<Utc>,
    pub grand_total: BigDecimal,
    pub shipping_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevenueFacet {
    pub total: BigDecimal,
    pub pos: BigDecimal,
    pub online: BigDecimal,
}

impl RevenueFacet {
    fn add(&mut self, row: &PaidOrderRow) {
        self.total = &self.total + &row.grand_total;
        if is_counter_sale(&row.shipping_address) {
            self.pos = &self.pos + &row.grand_total;
        } else {
            self.online = &self.online + &row.grand_total;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendDay {
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub pos: BigDecimal,
    pub online: BigDecimal,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueRollup {
    pub all: RevenueFacet,
    pub today: RevenueFacet,
    pub month: RevenueFacet,
    pub trend: Vec<TrendDay>,
}

/// Aggregate paid orders into the dashboard facets and the gap-filled
/// 7-day trend. The three facets are three independent passes with their
/// own date filters.
pub fn summarize(rows: &[PaidOrderRow], now: DateTime<Utc>) -> RevenueRollup {
    let today = report_date(now);
    let month_first = report_date(now).with_day(1).expect("day 1 is always valid");
    let window_start = today - Duration::days(TREND_DAYS - 1);

    let mut all = RevenueFacet::default();
    for row in rows {
        all.add(row);
    }

    let mut today_facet = RevenueFacet::default();
    for row in rows.iter().filter(|r| report_date(r.created_at) == today) {
        today_facet.add(row);
    }

    let mut month = RevenueFacet::default();
    for row in rows.iter().filter(|r| report_date(r.created_at) >= month_first) {
        month.add(row);
    }

    // Every day of the window appears, zeros included.
    let mut trend = Vec::with_capacity(TREND_DAYS as usize);
    for offset in 0..TREND_DAYS {
        let date = window_start + Duration::days(offset);
        let mut facet = RevenueFacet::default();
        let mut orders = 0i64;
        for row in rows.iter().filter(|r| report_date(r.created_at) == date) {
            facet.add(row);
            orders += 1;
        }
        trend.push(TrendDay {
            date,
            amount: facet.total,
            pos: facet.pos,
            online: facet.online,
            orders,
        });
    }

    RevenueRollup {
        all,
        today: today_facet,
        month,
        trend,
    }
}

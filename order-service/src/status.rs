use serde::{Deserialize, Serialize};

/// Fulfillment lifecycle of an order. Automated paths only ever move
/// forward; the administrative update path may set any value (operator
/// correction) but always through [`reconcile`] so derived fields follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipping,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "shipping" => Some(OrderStatus::Shipping),
            "delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

/// Administrative fulfillment patch as received on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FulfillmentPatch {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub awb_number: Option<String>,
    #[serde(default)]
    pub is_delivered: Option<bool>,
    #[serde(default)]
    pub is_paid: Option<bool>,
}

/// Column-level update with the coupled-field rules already applied.
/// `delivered`/`paid` carry both the boolean and the timestamp action:
/// `Some(true)` stamps the timestamp (keeping an existing one), `Some(false)`
/// clears it, `None` leaves both columns alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciledUpdate {
    pub status: Option<OrderStatus>,
    pub awb_number: Option<String>,
    pub delivered: Option<bool>,
    pub paid: Option<bool>,
}

/// Resolve the coupled-field rules for a fulfillment patch:
/// - status `delivered` implies `is_delivered = true` (stamped);
/// - any other status implies `is_delivered = false` (cleared);
/// - explicit `is_delivered = true` forces status `delivered`;
/// - explicit `is_paid` stamps or clears `paid_at`.
pub fn reconcile(patch: FulfillmentPatch) -> ReconciledUpdate {
    let mut status = patch.status;
    let mut delivered = match patch.status {
        Some(OrderStatus::Delivered) => Some(true),
        Some(_) => Some(false),
        None => None,
    };

    match patch.is_delivered {
        Some(true) => {
            status = Some(OrderStatus::Delivered);
            delivered = Some(true);
        }
        // An explicit false cannot undo a status that itself means delivered.
        Some(false) if status != Some(OrderStatus::Delivered) => {
            delivered = Some(false);
        }
        _ => {}
    }

    ReconciledUpdate {
        status,
        awb_number: patch.awb_number,
        delivered,
        paid: patch.is_paid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(status: Option<OrderStatus>, is_delivered: Option<bool>) -> FulfillmentPatch {
        FulfillmentPatch {
            status,
            is_delivered,
            ..FulfillmentPatch::default()
        }
    }

    #[test]
    fn delivered_status_stamps_delivery_fields() {
        let update = reconcile(patch(Some(OrderStatus::Delivered), None));
        assert_eq!(update.status, Some(OrderStatus::Delivered));
        assert_eq!(update.delivered, Some(true));
    }

    #[test]
    fn regression_from_delivered_clears_delivery_fields() {
        let update = reconcile(patch(Some(OrderStatus::Processing), None));
        assert_eq!(update.status, Some(OrderStatus::Processing));
        assert_eq!(update.delivered, Some(false));
    }

    #[test]
    fn explicit_delivered_flag_forces_status() {
        let update = reconcile(patch(None, Some(true)));
        assert_eq!(update.status, Some(OrderStatus::Delivered));
        assert_eq!(update.delivered, Some(true));

        // Even when the patch carries an earlier status.
        let update = reconcile(patch(Some(OrderStatus::Shipping), Some(true)));
        assert_eq!(update.status, Some(OrderStatus::Delivered));
        assert_eq!(update.delivered, Some(true));
    }

    #[test]
    fn explicit_undelivered_flag_clears_without_touching_status() {
        let update = reconcile(patch(None, Some(false)));
        assert_eq!(update.status, None);
        assert_eq!(update.delivered, Some(false));

        // Contradictory patch: delivered status wins over the stale flag.
        let update = reconcile(patch(Some(OrderStatus::Delivered), Some(false)));
        assert_eq!(update.status, Some(OrderStatus::Delivered));
        assert_eq!(update.delivered, Some(true));
    }

    #[test]
    fn paid_flag_passes_through_untouched_by_delivery_rules() {
        let update = reconcile(FulfillmentPatch {
            is_paid: Some(true),
            ..FulfillmentPatch::default()
        });
        assert_eq!(update.paid, Some(true));
        assert_eq!(update.status, None);
        assert_eq!(update.delivered, None);
    }

    #[test]
    fn awb_only_patch_touches_nothing_else() {
        let update = reconcile(FulfillmentPatch {
            awb_number: Some("AWB123".to_string()),
            ..FulfillmentPatch::default()
        });
        assert_eq!(
            update,
            ReconciledUpdate {
                awb_number: Some("AWB123".to_string()),
                ..ReconciledUpdate::default()
            }
        );
    }

    #[test]
    fn status_parse_round_trips() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipping,
            OrderStatus::Delivered,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("cancelled"), None);
    }
}

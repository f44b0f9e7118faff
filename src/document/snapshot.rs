//! # Order Snapshots
//!
//! The upstream order screen hands the printer an already-validated JSON
//! snapshot of the order. This module deserializes it and converts it into a
//! [`Document`].
//!
//! Legacy backends encode the paid/complementary flags in several ways
//! (`1`, `true`, `"1"`, or a payment method of `COMPLEMENTARY`). They are
//! resolved here, once, into [`PaymentStatus`].
//!
//! ```
//! use kotprint::document::{OrderSnapshot, PaymentStatus};
//!
//! let json = r#"{
//!     "outlet": { "name": "Udupi Cafe", "address": "12 MG Road" },
//!     "bill_no": 1042,
//!     "items": [{ "name": "Medu Vada", "quantity": 2, "price": 40.0 }],
//!     "total": 80.0,
//!     "is_complementary": "1"
//! }"#;
//! let order: OrderSnapshot = serde_json::from_str(json).unwrap();
//! assert_eq!(order.payment_status(), PaymentStatus::Complementary);
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use super::{ChargeLine, Document, Header, LineItem, Payment, PaymentStatus};
use crate::error::{PrintError, Result};
use crate::layout;

/// Charges at or below this magnitude are treated as absent.
pub const AMOUNT_EPSILON: f64 = 0.001;

/// Payment method string that marks an order as on the house.
pub const COMPLEMENTARY_METHOD: &str = "COMPLEMENTARY";

/// Outlet details printed in the header and trailer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Outlet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// One item as sent by the order screen.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotItem {
    #[serde(default)]
    pub name: String,
    pub quantity: u32,
    pub price: f64,
    pub total: Option<f64>,
}

/// Order data consumed by the print engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderSnapshot {
    #[serde(default)]
    pub outlet: Outlet,
    #[serde(default, deserialize_with = "string_or_number")]
    pub bill_no: String,
    #[serde(default)]
    pub order_type: String,
    pub table: Option<String>,
    pub customer_name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub items: Vec<SnapshotItem>,

    pub discount: Option<f64>,
    pub special_discount: Option<f64>,
    pub extra_charges: Option<f64>,
    pub service_charge: Option<f64>,
    pub gst: Option<f64>,
    pub gst_rate: Option<f64>,
    pub tip: Option<f64>,

    pub subtotal: Option<f64>,
    #[serde(default)]
    pub total: f64,
    pub final_total: Option<f64>,

    pub payment_method: Option<String>,
    pub is_paid: Option<Value>,
    pub is_complementary: Option<Value>,
    /// UPI virtual payment address for the pay-by-QR code
    pub upi_id: Option<String>,
}

impl OrderSnapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve the legacy flags. Paid wins over complementary.
    pub fn payment_status(&self) -> PaymentStatus {
        if self.is_paid.as_ref().is_some_and(is_truthy) {
            PaymentStatus::Paid
        } else if self.is_complementary.as_ref().is_some_and(is_truthy)
            || self
                .payment_method
                .as_deref()
                .is_some_and(|m| m.trim().eq_ignore_ascii_case(COMPLEMENTARY_METHOD))
        {
            PaymentStatus::Complementary
        } else {
            PaymentStatus::Unpaid
        }
    }

    fn header(&self, printed_at: NaiveDateTime) -> Header {
        Header {
            outlet_name: self.outlet.name.clone(),
            outlet_address: self.outlet.address.clone(),
            outlet_phone: self.outlet.phone.clone(),
            outlet_website: self.outlet.website.clone(),
            bill_no: self.bill_no.clone(),
            order_type: self.order_type.clone(),
            table_label: self.table.clone(),
            datetime: layout::format_timestamp(self.created_at.unwrap_or(printed_at)),
            customer_name: self.customer_name.clone(),
        }
    }

    fn lines(&self) -> Result<Vec<LineItem>> {
        self.items
            .iter()
            .map(|item| {
                if item.quantity == 0 {
                    return Err(PrintError::InvalidOrder(format!(
                        "item '{}' has zero quantity",
                        item.name
                    )));
                }
                let line = LineItem::new(item.name.clone(), item.quantity, item.price);
                Ok(match item.total {
                    Some(total) => line.with_total(total),
                    None => line,
                })
            })
            .collect()
    }

    fn charges(&self) -> Vec<ChargeLine> {
        let gst_label = match self.gst_rate {
            Some(rate) if rate.fract() == 0.0 => format!("GST ({:.0}%)", rate),
            Some(rate) => format!("GST ({}%)", rate),
            None => "GST".to_string(),
        };

        [
            (self.discount, ChargeLine::discount("Discount", 0.0)),
            (
                self.special_discount,
                ChargeLine::special_discount("Special Discount", 0.0),
            ),
            (self.extra_charges, ChargeLine::extra_charge("Extra Charges", 0.0)),
            (
                self.service_charge,
                ChargeLine::service_charge("Service Charge", 0.0),
            ),
            (self.gst, ChargeLine::gst(gst_label, 0.0)),
            (self.tip, ChargeLine::tip("Tip", 0.0)),
        ]
        .into_iter()
        .filter_map(|(amount, template)| {
            amount
                .filter(|a| a.abs() > AMOUNT_EPSILON)
                .map(|amount| ChargeLine { amount, ..template })
        })
        .collect()
    }

    /// The UPI intent for the unpaid amount. The payee name is
    /// percent-encoded; a VPA that is not a plain `handle@bank` yields no QR.
    fn upi_payload(&self, amount: f64) -> Option<String> {
        let vpa = self.upi_id.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        if !is_valid_vpa(vpa) {
            warn!(upi_id = vpa, "skipping payment QR, malformed UPI id");
            return None;
        }
        Some(format!(
            "upi://pay?pa={}&pn={}&am={:.2}&cu=INR",
            vpa,
            urlencoding::encode(&self.outlet.name),
            amount
        ))
    }
}

impl Document {
    /// Build a customer receipt from an order snapshot.
    ///
    /// `printed_at` is used for the header when the order carries no
    /// creation time.
    pub fn receipt_from(order: &OrderSnapshot, printed_at: NaiveDateTime) -> Result<Self> {
        let lines = order.lines()?;
        let status = order.payment_status();
        let payment = Payment {
            status,
            method: order.payment_method.clone(),
            total: order.total,
            subtotal: order.subtotal,
            final_total: order.final_total,
        };
        let qr_payload = match status {
            PaymentStatus::Unpaid if payment.grand_total() > AMOUNT_EPSILON => {
                order.upi_payload(payment.grand_total())
            }
            _ => None,
        };

        let doc = Document {
            kind: super::DocumentKind::Receipt,
            header: order.header(printed_at),
            lines,
            charges: order.charges(),
            payment,
            qr_payload,
        };
        doc.validate()?;
        Ok(doc)
    }

    /// Build a kitchen order ticket from an order snapshot.
    pub fn kot_from(order: &OrderSnapshot, printed_at: NaiveDateTime) -> Result<Self> {
        let doc = Document::kot(order.header(printed_at), order.lines()?);
        doc.validate()?;
        Ok(doc)
    }
}

/// Legacy truthiness: numeric 1, boolean true, or the string "1".
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => s.trim() == "1",
        _ => false,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// `handle@bank`, both parts drawn from `[A-Za-z0-9._-]`.
fn is_valid_vpa(vpa: &str) -> bool {
    let allowed = |part: &str| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
    };
    match vpa.split_once('@') {
        Some((handle, bank)) => allowed(handle) && allowed(bank),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ChargeKind, DocumentKind};
    use chrono::NaiveDate;
    use serde_json::json;

    fn printed_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(19, 45, 0))
            .unwrap()
    }

    fn order(extra: Value) -> OrderSnapshot {
        let mut base = json!({
            "outlet": { "name": "Udupi Cafe", "address": "12 MG Road", "website": "udupi.example" },
            "bill_no": "B-1042",
            "order_type": "Dine In",
            "table": "T4",
            "items": [
                { "name": "Medu Vada", "quantity": 2, "price": 40.0 },
                { "name": "Filter Coffee", "quantity": 1, "price": 25.0, "total": 20.0 }
            ],
            "total": 100.0
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn test_truthy_encodings() {
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!("1")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("0")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(null)));
    }

    #[test]
    fn test_status_precedence() {
        assert_eq!(order(json!({})).payment_status(), PaymentStatus::Unpaid);
        assert_eq!(
            order(json!({ "is_complementary": true })).payment_status(),
            PaymentStatus::Complementary
        );
        assert_eq!(
            order(json!({ "payment_method": "complementary" })).payment_status(),
            PaymentStatus::Complementary
        );
        assert_eq!(
            order(json!({ "is_paid": 1, "is_complementary": "1" })).payment_status(),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_numeric_bill_no() {
        let o = order(json!({ "bill_no": 77 }));
        assert_eq!(o.bill_no, "77");
    }

    #[test]
    fn test_receipt_from_snapshot() {
        let doc = Document::receipt_from(&order(json!({})), printed_at()).unwrap();
        assert_eq!(doc.kind, DocumentKind::Receipt);
        assert_eq!(doc.header.datetime, "05 MAR 2024 07:45 PM");
        assert_eq!(doc.header.table_label.as_deref(), Some("T4"));
        assert_eq!(doc.lines[0].line_total, 80.0);
        assert_eq!(doc.lines[1].line_total, 20.0);
        assert!(doc.qr_payload.is_none());
    }

    #[test]
    fn test_zero_charges_dropped() {
        let o = order(json!({ "discount": 0.0, "gst": 5.0, "gst_rate": 5, "tip": 0.0005 }));
        let doc = Document::receipt_from(&o, printed_at()).unwrap();
        assert_eq!(doc.charges.len(), 1);
        assert_eq!(doc.charges[0].kind, ChargeKind::Gst);
        assert_eq!(doc.charges[0].label, "GST (5%)");
    }

    #[test]
    fn test_upi_payload_only_when_unpaid() {
        let o = order(json!({ "upi_id": "cafe@okbank", "final_total": 105.0 }));
        let doc = Document::receipt_from(&o, printed_at()).unwrap();
        assert_eq!(
            doc.qr_payload.as_deref(),
            Some("upi://pay?pa=cafe@okbank&pn=Udupi%20Cafe&am=105.00&cu=INR")
        );

        let paid = order(json!({ "upi_id": "cafe@okbank", "is_paid": true }));
        let doc = Document::receipt_from(&paid, printed_at()).unwrap();
        assert!(doc.qr_payload.is_none());
    }

    #[test]
    fn test_upi_payee_name_cannot_inject_params() {
        let o = order(json!({
            "upi_id": "cafe@okbank",
            "final_total": 105.0,
            "outlet": { "name": "Dosa & Co=1#2", "address": "12 MG Road" }
        }));
        let doc = Document::receipt_from(&o, printed_at()).unwrap();
        assert_eq!(
            doc.qr_payload.as_deref(),
            Some("upi://pay?pa=cafe@okbank&pn=Dosa%20%26%20Co%3D1%232&am=105.00&cu=INR")
        );
    }

    #[test]
    fn test_malformed_upi_id_skips_qr() {
        for bad in ["cafe okbank", "cafe@ok&am=1", "cafe", "@okbank", "a@b@c"] {
            let o = order(json!({ "upi_id": bad, "final_total": 105.0 }));
            let doc = Document::receipt_from(&o, printed_at()).unwrap();
            assert!(doc.qr_payload.is_none(), "{bad} should not produce a QR");
        }
        assert!(is_valid_vpa("udupi.cafe-1_x@okbank"));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let o = order(json!({ "items": [{ "name": "Air", "quantity": 0, "price": 1.0 }] }));
        assert!(matches!(
            Document::receipt_from(&o, printed_at()),
            Err(PrintError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_kot_from_snapshot() {
        let doc = Document::kot_from(&order(json!({})), printed_at()).unwrap();
        assert_eq!(doc.kind, DocumentKind::Kot);
        assert_eq!(doc.item_count(), 3);
        assert!(doc.charges.is_empty());
    }
}

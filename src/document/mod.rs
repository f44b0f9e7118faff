//! # Document Model
//!
//! Typed representation of a printable document: a customer receipt or a
//! kitchen order ticket (KOT).
//!
//! A [`Document`] is built fresh for every print request, usually from an
//! [`OrderSnapshot`](snapshot::OrderSnapshot), and is read-only afterwards.
//! Legacy flag encodings are resolved before a `Document` exists, so the
//! encoder only ever matches on [`PaymentStatus`].
//!
//! ## Example
//!
//! ```
//! use kotprint::document::{ChargeLine, Document, Header, LineItem, Payment};
//!
//! let doc = Document::receipt(
//!     Header::new("Udupi Cafe", "12 MG Road", "B-1042"),
//!     vec![LineItem::new("Medu Vada", 2, 40.0)],
//! )
//! .charge(ChargeLine::gst("GST", 4.0))
//! .payment(Payment::unpaid(80.0).final_total(84.0));
//!
//! assert!(doc.validate().is_ok());
//! ```

pub mod snapshot;

pub use snapshot::OrderSnapshot;

use crate::error::{PrintError, Result};

/// Which ticket is being printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentKind {
    /// Customer bill with prices, charges and payment QR
    #[default]
    Receipt,
    /// Kitchen order ticket: items and quantities only
    Kot,
}

/// Header block shared by receipts and KOTs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub outlet_name: String,
    pub outlet_address: String,
    pub outlet_phone: Option<String>,
    pub outlet_website: Option<String>,
    pub bill_no: String,
    pub order_type: String,
    pub table_label: Option<String>,
    /// Pre-formatted `DD MON YYYY hh:mm AM/PM`
    pub datetime: String,
    pub customer_name: Option<String>,
}

impl Header {
    pub fn new(
        outlet_name: impl Into<String>,
        outlet_address: impl Into<String>,
        bill_no: impl Into<String>,
    ) -> Self {
        Self {
            outlet_name: outlet_name.into(),
            outlet_address: outlet_address.into(),
            bill_no: bill_no.into(),
            ..Default::default()
        }
    }
}

/// One ordered menu item.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    /// Trusted as supplied; may differ from `quantity * unit_price` when the
    /// upstream applied an item discount.
    pub line_total: f64,
}

impl LineItem {
    /// Create a line item whose total is `quantity * unit_price`.
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
            line_total: quantity as f64 * unit_price,
        }
    }

    /// Override the line total.
    pub fn with_total(mut self, line_total: f64) -> Self {
        self.line_total = line_total;
        self
    }
}

/// Rendered sign of an amount column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sign {
    /// No sign character (totals)
    #[default]
    None,
    Plus,
    Minus,
}

impl Sign {
    pub fn symbol(self) -> &'static str {
        match self {
            Sign::None => "",
            Sign::Plus => "+",
            Sign::Minus => "-",
        }
    }
}

/// Category of a charge or deduction; fixes where it prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeKind {
    Discount,
    SpecialDiscount,
    ExtraCharge,
    ServiceCharge,
    Gst,
    Tip,
}

impl ChargeKind {
    /// Charges that adjust the item total before the subtotal line.
    pub fn is_pre_subtotal(self) -> bool {
        matches!(
            self,
            ChargeKind::Discount | ChargeKind::SpecialDiscount | ChargeKind::ExtraCharge
        )
    }

    /// The sign these charges print with by default.
    pub fn default_sign(self) -> Sign {
        match self {
            ChargeKind::Discount | ChargeKind::SpecialDiscount => Sign::Minus,
            _ => Sign::Plus,
        }
    }
}

/// A discount, surcharge, tax or tip line.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeLine {
    pub kind: ChargeKind,
    pub label: String,
    pub amount: f64,
    pub sign: Sign,
}

impl ChargeLine {
    pub fn new(kind: ChargeKind, label: impl Into<String>, amount: f64) -> Self {
        Self {
            kind,
            label: label.into(),
            amount,
            sign: kind.default_sign(),
        }
    }

    pub fn discount(label: impl Into<String>, amount: f64) -> Self {
        Self::new(ChargeKind::Discount, label, amount)
    }

    pub fn special_discount(label: impl Into<String>, amount: f64) -> Self {
        Self::new(ChargeKind::SpecialDiscount, label, amount)
    }

    pub fn extra_charge(label: impl Into<String>, amount: f64) -> Self {
        Self::new(ChargeKind::ExtraCharge, label, amount)
    }

    pub fn service_charge(label: impl Into<String>, amount: f64) -> Self {
        Self::new(ChargeKind::ServiceCharge, label, amount)
    }

    pub fn gst(label: impl Into<String>, amount: f64) -> Self {
        Self::new(ChargeKind::Gst, label, amount)
    }

    pub fn tip(label: impl Into<String>, amount: f64) -> Self {
        Self::new(ChargeKind::Tip, label, amount)
    }

    /// Amount with its sign applied.
    pub fn signed_amount(&self) -> f64 {
        match self.sign {
            Sign::Minus => -self.amount.abs(),
            _ => self.amount.abs(),
        }
    }
}

/// Normalized payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Complementary,
}

/// Payment block of a receipt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payment {
    pub status: PaymentStatus,
    pub method: Option<String>,
    /// Sum of line totals
    pub total: f64,
    /// Supplied subtotal; computed from pre-subtotal charges when absent
    pub subtotal: Option<f64>,
    /// Grand total; preferred over `total` when present
    pub final_total: Option<f64>,
}

impl Payment {
    pub fn unpaid(total: f64) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn subtotal(mut self, subtotal: f64) -> Self {
        self.subtotal = Some(subtotal);
        self
    }

    pub fn final_total(mut self, final_total: f64) -> Self {
        self.final_total = Some(final_total);
        self
    }

    /// The amount printed on the grand total line.
    pub fn grand_total(&self) -> f64 {
        self.final_total.unwrap_or(self.total)
    }
}

/// A printable receipt or KOT.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub kind: DocumentKind,
    pub header: Header,
    pub lines: Vec<LineItem>,
    pub charges: Vec<ChargeLine>,
    pub payment: Payment,
    pub qr_payload: Option<String>,
}

impl Document {
    /// Create a receipt. The payment total defaults to the sum of line totals.
    pub fn receipt(header: Header, lines: Vec<LineItem>) -> Self {
        let total = lines.iter().map(|l| l.line_total).sum();
        Self {
            kind: DocumentKind::Receipt,
            header,
            lines,
            payment: Payment::unpaid(total),
            ..Default::default()
        }
    }

    /// Create a kitchen order ticket.
    pub fn kot(header: Header, lines: Vec<LineItem>) -> Self {
        Self {
            kind: DocumentKind::Kot,
            header,
            lines,
            ..Default::default()
        }
    }

    /// Append a charge line.
    pub fn charge(mut self, charge: ChargeLine) -> Self {
        self.charges.push(charge);
        self
    }

    pub fn payment(mut self, payment: Payment) -> Self {
        self.payment = payment;
        self
    }

    pub fn qr_payload(mut self, payload: impl Into<String>) -> Self {
        self.qr_payload = Some(payload.into());
        self
    }

    /// Charges of one kind, in document order.
    pub fn charges_of(&self, kind: ChargeKind) -> impl Iterator<Item = &ChargeLine> {
        self.charges.iter().filter(move |c| c.kind == kind)
    }

    /// Subtotal as printed: the supplied value, or the item total adjusted by
    /// discounts and extra charges.
    pub fn subtotal(&self) -> f64 {
        self.payment.subtotal.unwrap_or_else(|| {
            self.payment.total
                + self
                    .charges
                    .iter()
                    .filter(|c| c.kind.is_pre_subtotal())
                    .map(ChargeLine::signed_amount)
                    .sum::<f64>()
        })
    }

    /// Total number of units across all lines, saturating at `u32::MAX`.
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |n, l| n.saturating_add(l.quantity))
    }

    /// Check model invariants.
    pub fn validate(&self) -> Result<()> {
        if self.kind == DocumentKind::Receipt && self.lines.is_empty() {
            return Err(PrintError::InvalidDocument(
                "receipt has no line items".into(),
            ));
        }
        if let Some(line) = self.lines.iter().find(|l| l.quantity == 0) {
            return Err(PrintError::InvalidDocument(format!(
                "line '{}' has zero quantity",
                line.name
            )));
        }
        if self.payment.grand_total() < 0.0 {
            return Err(PrintError::InvalidDocument(format!(
                "final total is negative: {:.2}",
                self.payment.grand_total()
            )));
        }
        Ok(())
    }
}

//! # Ticket Encoder
//!
//! Builds the IR program for a [`Document`] and compiles it to ESC/POS.
//!
//! ## Receipt Layout
//!
//! ```text
//!          Udupi Cafe            ← ESC ! 0x18, centered
//!         12 MG Road
//! --------------------------------
//! Bill No: B-7
//! Order: Dine In
//! Table: T4
//! Date: 05 MAR 2024 07:45 PM
//!            PAID                ← ESC ! 0x10, centered
//! --------------------------------
//! Item          Qt Rate   Amount
//! --------------------------------
//! Medu Vada     2    40    80.00
//! --------------------------------
//! Total                       80.00
//! Discount                   -10.00
//! Sub Total                   70.00
//! --------------------------------
//! Grand Total                 70.00
//!         [QR if unpaid]
//!   GPay | PhonePe | Paytm | BHIM
//!    Thank you! Visit again
//! ✂
//! ```
//!
//! The KOT variant carries the header, an item/quantity table and the total
//! unit count. It never prints prices, QR codes or payment state.

use crate::document::{ChargeKind, Document, DocumentKind, PaymentStatus, Sign};
use crate::error::Result;
use crate::ir::{Op, Program};
use crate::layout::{
    dotted_rule, format_amount_line, format_kot_header, format_kot_row, format_kot_total,
    format_menu_header, format_menu_row,
};
use crate::printer::PrinterConfig;
use crate::protocol::text::{Alignment, PrintMode};

/// Amounts at or below this magnitude are not printed.
const CHARGE_EPSILON: f64 = 0.001;

/// Payment apps accepted by the UPI QR code.
const PAYMENT_BADGES: &str = "GPay | PhonePe | Paytm | BHIM";

const THANK_YOU: &str = "Thank you! Visit again";

/// Charges printed between the item total and the subtotal.
const PRE_SUBTOTAL: [ChargeKind; 3] = [
    ChargeKind::Discount,
    ChargeKind::SpecialDiscount,
    ChargeKind::ExtraCharge,
];

/// Charges printed after the subtotal.
const POST_SUBTOTAL: [ChargeKind; 3] = [
    ChargeKind::ServiceCharge,
    ChargeKind::Gst,
    ChargeKind::Tip,
];

// ============================================================================
// PUBLIC API
// ============================================================================

/// Encode a document for the default 58mm profile.
///
/// ## Errors
///
/// [`PrintError::EncodingOverflow`](crate::error::PrintError) when the QR
/// payload exceeds 252 bytes. No partial stream is returned.
///
/// ## Example
///
/// ```
/// use kotprint::document::{Document, Header, LineItem};
///
/// let doc = Document::kot(
///     Header::new("Udupi Cafe", "12 MG Road", "B-7"),
///     vec![LineItem::new("Masala Dosa", 2, 90.0)],
/// );
/// let bytes = kotprint::receipt::encode(&doc).unwrap();
/// assert!(bytes.starts_with(&[0x1B, 0x40]));
/// assert!(bytes.ends_with(&[0x1D, 0x56, 0x42, 0x40]));
/// ```
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    encode_with(doc, &PrinterConfig::default())
}

/// Encode a document for a specific printer profile.
pub fn encode_with(doc: &Document, config: &PrinterConfig) -> Result<Vec<u8>> {
    program(doc, config).to_bytes()
}

/// Build the IR program for a document without compiling it.
pub fn program(doc: &Document, config: &PrinterConfig) -> Program {
    let mut p = prologue(config);
    match doc.kind {
        DocumentKind::Receipt => receipt_body(&mut p, doc, config),
        DocumentKind::Kot => kot_body(&mut p, doc),
    }
    p.push(Op::Cut);
    p
}

// ============================================================================
// SECTIONS
// ============================================================================

fn prologue(config: &PrinterConfig) -> Program {
    let mut p = Program::with_init();
    p.push(Op::SelectCharTable(config.char_table));
    p.push(Op::PrintSpeed(config.print_speed));
    p.push(Op::LineSpacing(config.line_spacing));
    p
}

/// Centered text in the given mode, then back to normal.
fn banner(p: &mut Program, text: &str, mode: PrintMode) {
    p.push(Op::SetAlign(Alignment::Center));
    p.push(Op::SetMode(mode));
    p.push(Op::Text(text.to_string()));
    p.push(Op::Newline);
    p.push(Op::SetMode(PrintMode::NORMAL));
    p.push(Op::SetAlign(Alignment::Left));
}

fn line(p: &mut Program, text: String) {
    p.push(Op::Text(text));
    p.push(Op::Newline);
}

fn receipt_body(p: &mut Program, doc: &Document, config: &PrinterConfig) {
    let header = &doc.header;
    let rule = dotted_rule(DocumentKind::Receipt);

    // Outlet block
    banner(
        p,
        &header.outlet_name,
        PrintMode::DOUBLE_HEIGHT.with(PrintMode::EMPHASIZED),
    );
    p.push(Op::SetAlign(Alignment::Center));
    for address_line in header.outlet_address.lines().filter(|l| !l.trim().is_empty()) {
        line(p, address_line.trim().to_string());
    }
    if let Some(phone) = &header.outlet_phone {
        line(p, format!("Ph: {}", phone));
    }
    p.push(Op::SetAlign(Alignment::Left));
    p.push(Op::Text(rule.clone()));

    // Order details
    line(p, format!("Bill No: {}", header.bill_no));
    if !header.order_type.is_empty() {
        line(p, format!("Order: {}", header.order_type));
    }
    if let Some(table) = &header.table_label {
        line(p, format!("Table: {}", table));
    }
    line(p, format!("Date: {}", header.datetime));
    if let Some(customer) = &header.customer_name {
        line(p, format!("Customer: {}", customer));
    }

    // Paid wins when both flags are set
    match doc.payment.status {
        PaymentStatus::Paid => banner(p, "PAID", PrintMode::DOUBLE_HEIGHT),
        PaymentStatus::Complementary => banner(p, "COMPLEMENTARY", PrintMode::DOUBLE_HEIGHT),
        PaymentStatus::Unpaid => {}
    }

    // Items
    p.push(Op::Text(rule.clone()));
    p.push(Op::Text(format_menu_header()));
    p.push(Op::Text(rule.clone()));
    for item in &doc.lines {
        p.push(Op::Text(format_menu_row(
            &item.name,
            item.quantity,
            item.unit_price,
            item.line_total,
        )));
    }
    p.push(Op::Text(rule.clone()));

    // Charges
    p.push(Op::Text(format_amount_line(
        "Total",
        doc.payment.total,
        Sign::None,
    )));
    charge_lines(p, doc, &PRE_SUBTOTAL);
    p.push(Op::Text(format_amount_line(
        "Sub Total",
        doc.subtotal(),
        Sign::None,
    )));
    charge_lines(p, doc, &POST_SUBTOTAL);
    p.push(Op::Text(rule));

    p.push(Op::SetMode(PrintMode::EMPHASIZED));
    p.push(Op::Text(format_amount_line(
        "Grand Total",
        doc.payment.grand_total(),
        Sign::None,
    )));
    p.push(Op::SetMode(PrintMode::NORMAL));

    // Payment QR
    if let Some(payload) = &doc.qr_payload {
        p.push(Op::SetAlign(Alignment::Center));
        line(p, "Scan & Pay".to_string());
        p.push(Op::QrCode {
            data: payload.clone(),
            module_size: config.qr_module_size,
            error_level: config.qr_error_level,
        });
        p.push(Op::Newline);
        p.push(Op::SetAlign(Alignment::Left));
    }

    // Trailer
    p.push(Op::SetAlign(Alignment::Center));
    line(p, PAYMENT_BADGES.to_string());
    line(p, THANK_YOU.to_string());
    if let Some(website) = &header.outlet_website {
        line(p, website.clone());
    }
    p.push(Op::SetAlign(Alignment::Left));
}

fn charge_lines(p: &mut Program, doc: &Document, kinds: &[ChargeKind]) {
    for kind in kinds {
        for charge in doc.charges_of(*kind) {
            if charge.amount.abs() <= CHARGE_EPSILON {
                continue;
            }
            p.push(Op::Text(format_amount_line(
                &charge.label,
                charge.amount,
                charge.sign,
            )));
        }
    }
}

fn kot_body(p: &mut Program, doc: &Document) {
    let header = &doc.header;
    let rule = dotted_rule(DocumentKind::Kot);

    banner(p, "KOT", PrintMode::DOUBLE_HEIGHT.with(PrintMode::EMPHASIZED));
    if !header.outlet_name.is_empty() {
        p.push(Op::SetAlign(Alignment::Center));
        line(p, header.outlet_name.clone());
        p.push(Op::SetAlign(Alignment::Left));
    }
    line(p, format!("Bill No: {}", header.bill_no));
    if let Some(table) = &header.table_label {
        line(p, format!("Table: {}", table));
    }
    if !header.order_type.is_empty() {
        line(p, format!("Order: {}", header.order_type));
    }
    line(p, format!("Date: {}", header.datetime));

    p.push(Op::Text(rule.clone()));
    p.push(Op::Text(format_kot_header()));
    p.push(Op::Text(rule.clone()));
    for item in &doc.lines {
        p.push(Op::Text(format_kot_row(&item.name, item.quantity)));
    }
    p.push(Op::Text(rule));
    p.push(Op::Text(format_kot_total(doc.item_count())));
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ChargeLine, Header, LineItem, Payment};
    use crate::error::PrintError;
    use pretty_assertions::assert_eq;

    fn medu_vada() -> Document {
        Document::receipt(
            Header::new("Udupi Cafe", "12 MG Road", "B-7"),
            vec![LineItem::new("Medu Vada", 2, 40.0).with_total(80.0)],
        )
        .payment(Payment::unpaid(80.0).final_total(80.0))
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn test_prologue() {
        let bytes = encode(&medu_vada()).unwrap();
        assert_eq!(
            &bytes[..16],
            &[
                0x1B, 0x40, // init
                0x1B, 0x74, 0x00, // ESC t 0
                0x1D, 0x28, 0x4B, 0x02, 0x00, 0x32, 0x09, // speed
                0x1B, 0x33, 60, // spacing
                0x1B, // first ESC a
            ]
        );
    }

    #[test]
    fn test_scenario_lines() {
        let text = program(&medu_vada(), &PrinterConfig::default()).text();
        assert!(text.contains("Medu Vada     2    40    80.00\n"));
        assert!(text.contains("Total                       80.00\n"));
        assert!(text.contains("Grand Total                 80.00\n"));
    }

    #[test]
    fn test_ends_with_full_cut() {
        let bytes = encode(&medu_vada()).unwrap();
        assert!(bytes.ends_with(&[0x1D, 0x56, 0x42, 0x40]));
    }

    #[test]
    fn test_banner_paid_only() {
        let doc = medu_vada().payment(Payment::unpaid(80.0).status(PaymentStatus::Paid));
        let text = program(&doc, &PrinterConfig::default()).text();
        assert!(text.contains("PAID\n"));
        assert!(!text.contains("COMPLEMENTARY"));
    }

    #[test]
    fn test_banner_complementary() {
        let doc =
            medu_vada().payment(Payment::unpaid(80.0).status(PaymentStatus::Complementary));
        let bytes = encode(&doc).unwrap();
        let banner: Vec<u8> = [
            &[0x1B, 0x21, 0x10][..],
            &b"COMPLEMENTARY\n"[..],
            &[0x1B, 0x21, 0x00][..],
        ]
        .concat();
        assert_eq!(count(&bytes, &banner), 1);
    }

    #[test]
    fn test_unpaid_has_no_banner() {
        let text = program(&medu_vada(), &PrinterConfig::default()).text();
        assert!(!text.contains("PAID"));
        assert!(!text.contains("COMPLEMENTARY"));
    }

    #[test]
    fn test_charge_order() {
        let doc = medu_vada()
            .charge(ChargeLine::gst("GST (5%)", 3.5))
            .charge(ChargeLine::discount("Discount", 10.0))
            .charge(ChargeLine::tip("Tip", 5.0))
            .charge(ChargeLine::extra_charge("Packing", 2.0))
            .charge(ChargeLine::service_charge("Service", 4.0))
            .charge(ChargeLine::special_discount("Special Disc", 1.0))
            .payment(Payment::unpaid(80.0).final_total(83.5));
        let text = program(&doc, &PrinterConfig::default()).text();

        let labels = [
            "Total ",
            "Discount ",
            "Special Disc ",
            "Packing ",
            "Sub Total ",
            "Service ",
            "GST (5%) ",
            "Tip ",
            "Grand Total ",
        ];
        let positions: Vec<usize> = labels
            .iter()
            .map(|l| text.find(&format!("\n{}", l)).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
        assert!(text.contains("Discount                   -10.00\n"));
        assert!(text.contains("Sub Total                   71.00\n"));
        assert!(text.contains("Grand Total                 83.50\n"));
    }

    #[test]
    fn test_negligible_charge_skipped() {
        let doc = medu_vada().charge(ChargeLine::discount("Discount", 0.0005));
        let text = program(&doc, &PrinterConfig::default()).text();
        assert!(!text.contains("Discount"));
    }

    #[test]
    fn test_qr_emitted_when_payload_present() {
        let doc = medu_vada().qr_payload("upi://pay?pa=cafe@okbank&am=80.00&cu=INR");
        let bytes = encode(&doc).unwrap();
        assert_eq!(count(&bytes, &[0x1D, 0x28, 0x6B]), 5);
    }

    #[test]
    fn test_qr_overflow_aborts_encoding() {
        let doc = medu_vada().qr_payload("u".repeat(253));
        assert!(matches!(
            encode(&doc),
            Err(PrintError::EncodingOverflow { len: 253, max: 252 })
        ));
    }

    #[test]
    fn test_trailer() {
        let mut doc = medu_vada();
        doc.header.outlet_website = Some("udupicafe.in".into());
        let text = program(&doc, &PrinterConfig::default()).text();
        assert!(text.contains(PAYMENT_BADGES));
        assert!(text.contains(THANK_YOU));
        assert!(text.ends_with("udupicafe.in\n"));
    }

    #[test]
    fn test_kot_layout() {
        let mut header = Header::new("Udupi Cafe", "12 MG Road", "B-7");
        header.table_label = Some("T4".into());
        let doc = Document::kot(
            header,
            vec![
                LineItem::new("Masala Dosa", 2, 90.0),
                LineItem::new("Filter Coffee", 3, 30.0),
            ],
        );
        let text = program(&doc, &PrinterConfig::default()).text();
        assert!(text.starts_with("KOT\n"));
        assert!(text.contains("Table: T4\n"));
        assert!(text.contains(&format!("{}\n", "-".repeat(31))));
        assert!(text.contains("Masala Dosa            2\n"));
        assert!(text.contains("Total Items            5\n"));
        assert!(!text.contains("90.00"));
        assert!(!text.contains("Rate"));
        assert!(!text.contains("Grand Total"));
    }

    #[test]
    fn test_kot_ignores_qr() {
        let doc = Document::kot(
            Header::new("Udupi Cafe", "", "B-7"),
            vec![LineItem::new("Idli", 1, 30.0)],
        )
        .qr_payload("u".repeat(400));
        let bytes = encode(&doc).unwrap();
        assert_eq!(count(&bytes, &[0x1D, 0x28, 0x6B]), 0);
    }
}

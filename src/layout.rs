//! # Fixed-Width Layout
//!
//! Pure text layout for 58mm thermal paper (32 columns in Font A).
//!
//! Every function here returns complete, `\n`-terminated lines and never
//! fails: an empty name renders as an empty column, and content wider than
//! its column is wrapped (names) or allowed to overflow (amount labels)
//! rather than clipped.
//!
//! ## Column Grids
//!
//! ```text
//! Receipt menu row (30 cols):
//! |name..........|qt|rate.| total...|
//!  Medu Vada     2    40    80.00
//!
//! Amount line (label + padding + 13):
//! |label|padding (>= 2)| |amount......|
//!  Total                       80.00
//!
//! KOT row:
//! |name...................|qty
//!  Masala Dosa            2
//! ```

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::document::{DocumentKind, Sign};

/// Receipt line width in characters.
pub const RECEIPT_WIDTH: usize = 32;

/// KOT separator width in characters.
pub const KOT_RULE_WIDTH: usize = 31;

/// Width of the right-aligned amount field.
pub const AMOUNT_WIDTH: usize = 12;

/// Minimum gap between a label and its amount.
pub const MIN_LABEL_GAP: usize = 2;

/// Receipt menu column widths.
pub const MENU_NAME_WIDTH: usize = 14;
pub const MENU_QTY_WIDTH: usize = 2;
pub const MENU_RATE_WIDTH: usize = 5;
pub const MENU_TOTAL_WIDTH: usize = 8;

/// KOT name column width.
pub const KOT_NAME_WIDTH: usize = 23;

/// KOT continuation lines pad to this width, not to `KOT_NAME_WIDTH`.
pub const KOT_CONTINUATION_WIDTH: usize = 26;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

// ============================================================================
// AMOUNTS
// ============================================================================

/// Format a label with a right-aligned amount.
///
/// The gap is `max(2, 32 - len(label) - 12)` spaces, followed by one
/// separator column and the amount (`sign` + absolute value, 2 decimals)
/// right-aligned in the last 12 columns. Labels longer than 18 characters
/// push the line past the paper width; that overflow is left as-is.
///
/// ```
/// use kotprint::document::Sign;
/// use kotprint::layout::format_amount_line;
///
/// assert_eq!(
///     format_amount_line("Total", 80.0, Sign::None),
///     "Total                       80.00\n"
/// );
/// assert_eq!(
///     format_amount_line("Discount", 10.0, Sign::Minus),
///     "Discount                   -10.00\n"
/// );
/// ```
pub fn format_amount_line(label: &str, amount: f64, sign: Sign) -> String {
    let label_len = label.chars().count();
    let padding = RECEIPT_WIDTH
        .saturating_sub(label_len + AMOUNT_WIDTH)
        .max(MIN_LABEL_GAP);
    let value = format!("{}{:.2}", sign.symbol(), amount.abs());
    format!(
        "{}{} {:>width$}\n",
        label,
        " ".repeat(padding),
        value,
        width = AMOUNT_WIDTH
    )
}

// ============================================================================
// ITEM ROWS
// ============================================================================

/// Format one receipt menu row, wrapping long names.
///
/// Names longer than 14 characters are split into 14-character chunks. The
/// first line carries quantity, rate (price floored to a whole number) and
/// line total; the remaining chunks follow on name-only lines.
pub fn format_menu_row(name: &str, qty: u32, rate: f64, total: f64) -> String {
    let mut out = String::new();
    for (i, chunk) in chunk_chars(name, MENU_NAME_WIDTH).iter().enumerate() {
        if i == 0 {
            out.push_str(&format!(
                "{:<nw$}{:<qw$}{:>rw$} {:>tw$.2}\n",
                chunk,
                qty,
                rate.floor() as i64,
                total,
                nw = MENU_NAME_WIDTH,
                qw = MENU_QTY_WIDTH,
                rw = MENU_RATE_WIDTH,
                tw = MENU_TOTAL_WIDTH,
            ));
        } else {
            out.push_str(&format!("{:<nw$}\n", chunk, nw = MENU_NAME_WIDTH));
        }
    }
    out
}

/// Column titles matching [`format_menu_row`].
pub fn format_menu_header() -> String {
    format!(
        "{:<nw$}{:<qw$}{:>rw$} {:>tw$}\n",
        "Item",
        "Qt",
        "Rate",
        "Amount",
        nw = MENU_NAME_WIDTH,
        qw = MENU_QTY_WIDTH,
        rw = MENU_RATE_WIDTH,
        tw = MENU_TOTAL_WIDTH,
    )
}

/// Format one KOT row, wrapping long names at 23 characters.
///
/// Continuation lines are padded to 26 columns, three wider than the first
/// line's name column.
pub fn format_kot_row(name: &str, qty: u32) -> String {
    let mut out = String::new();
    for (i, chunk) in chunk_chars(name, KOT_NAME_WIDTH).iter().enumerate() {
        if i == 0 {
            out.push_str(&format!("{:<w$}{}\n", chunk, qty, w = KOT_NAME_WIDTH));
        } else {
            out.push_str(&format!("{:<w$}\n", chunk, w = KOT_CONTINUATION_WIDTH));
        }
    }
    out
}

/// Column titles matching [`format_kot_row`].
pub fn format_kot_header() -> String {
    format!("{:<w$}{}\n", "Item", "Qty", w = KOT_NAME_WIDTH)
}

/// Total unit count, aligned under the KOT quantity column.
pub fn format_kot_total(count: u32) -> String {
    format!("{:<w$}{}\n", "Total Items", count, w = KOT_NAME_WIDTH)
}

/// Split into chunks of at most `width` characters. Always yields at least
/// one (possibly empty) chunk.
fn chunk_chars(s: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(width.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

// ============================================================================
// SEPARATORS AND TIME
// ============================================================================

/// Dashed separator line for the given ticket kind.
pub fn dotted_rule(kind: DocumentKind) -> String {
    let width = match kind {
        DocumentKind::Receipt => RECEIPT_WIDTH,
        DocumentKind::Kot => KOT_RULE_WIDTH,
    };
    format!("{}\n", "-".repeat(width))
}

/// Format a timestamp as `DD MON YYYY hh:mm AM/PM`.
///
/// Month names are fixed English abbreviations regardless of locale, and the
/// hour uses a 12-hour clock where midnight and noon are `12`.
///
/// ```
/// use chrono::NaiveDate;
/// use kotprint::layout::format_timestamp;
///
/// let dt = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap().and_hms_opt(0, 5, 0).unwrap();
/// assert_eq!(format_timestamp(dt), "09 JAN 2024 12:05 AM");
/// ```
pub fn format_timestamp(dt: NaiveDateTime) -> String {
    let (pm, hour) = dt.hour12();
    format!(
        "{:02} {} {} {:02}:{:02} {}",
        dt.day(),
        MONTHS[dt.month0() as usize],
        dt.year(),
        hour,
        dt.minute(),
        if pm { "PM" } else { "AM" }
    )
}

/// Current local time formatted with [`format_timestamp`].
pub fn current_timestamp() -> String {
    format_timestamp(chrono::Local::now().naive_local())
}

// ============================================================================
// TESTS
// ============================================================================

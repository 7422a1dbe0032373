//! WhatsApp reminder text.

use num_format::{Locale, ToFormattedString as _};

/// Format an amount with two decimals and `,` thousands separators.
///
/// Rounds to whole cents first, so `15.999` shows as `16.00`.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as i64;
    let sign = if amount < 0.0 && cents != 0 { "-" } else { "" };
    format!(
        "{sign}{}.{:02}",
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// Body of the reminder sent when an expense is added automatically.
pub fn reminder_message(description: &str, amount: f64) -> String {
    format!(
        "Expensease Reminder: Your recurring expense \"{description}\" for {} has been automatically added to your group.",
        format_amount(amount)
    )
}

/// WhatsApp address for a phone number as stored on a template.
pub fn whatsapp_address(number: &str) -> String {
    format!("whatsapp:{}", number.trim())
}

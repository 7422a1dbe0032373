pub mod expense;
pub mod frequency;
pub mod reminder;
pub mod template;

pub use expense::{DEFAULT_CATEGORY, Expense};
pub use frequency::{Frequency, advance_due_date};
pub use reminder::{format_amount, reminder_message, whatsapp_address};
pub use template::{
    DecodeError, RecurringTemplate, TemplateDocument, TemplateFields, TemplateRef,
    ValidationError,
};

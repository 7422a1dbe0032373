//! Expenses materialized from recurring templates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RecurringTemplate;

/// Category given to materialized expenses whose template has none.
pub const DEFAULT_CATEGORY: &str = "Bill";

/// A concrete expense stored under `groups/{group}/expenses/{id}`.
///
/// Created once per due cycle and never updated by the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub description: String,
    pub total_amount: f64,
    pub paid_by_id: String,
    pub split_between: BTreeMap<String, f64>,
    pub date: DateTime<Utc>,
    pub category: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    /// Id of the template this expense was generated from.
    pub recurring_source_id: String,
}

impl Expense {
    /// Build the expense for one due cycle of `template`, stamped at `now`.
    pub fn from_template(template: &RecurringTemplate, now: DateTime<Utc>) -> Self {
        Self {
            description: template.description.clone(),
            total_amount: template.total_amount,
            paid_by_id: template.paid_by.clone(),
            split_between: template.split.clone(),
            date: now,
            category: template
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            created_at: now,
            notes: template.notes.clone(),
            receipt_url: template.receipt_url.clone(),
            recurring_source_id: template.id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Frequency;
    use chrono::TimeZone;

    fn template() -> RecurringTemplate {
        RecurringTemplate {
            id: "netflix".into(),
            group_id: "flat".into(),
            description: "Netflix".into(),
            total_amount: 15.99,
            paid_by: "alice".into(),
            split: BTreeMap::from([("alice".into(), 8.0), ("bob".into(), 7.99)]),
            frequency: Frequency::Monthly,
            next_due_date: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
            category: None,
            notes: Some("family plan".into()),
            receipt_url: None,
            whatsapp_number: None,
        }
    }

    #[test]
    fn copies_template_fields() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 1, 0, 0).unwrap();
        let e = Expense::from_template(&template(), now);
        assert_eq!(e.description, "Netflix");
        assert_eq!(e.paid_by_id, "alice");
        assert_eq!(e.split_between.len(), 2);
        assert_eq!(e.date, now);
        assert_eq!(e.created_at, now);
        assert_eq!(e.category, DEFAULT_CATEGORY);
        assert_eq!(e.recurring_source_id, "netflix");
    }

    #[test]
    fn absent_optionals_are_omitted_from_document() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 1, 0, 0).unwrap();
        let json = serde_json::to_value(Expense::from_template(&template(), now)).unwrap();
        assert_eq!(json["paidById"], "alice");
        assert_eq!(json["splitBetween"]["bob"], 7.99);
        assert_eq!(json["notes"], "family plan");
        assert_eq!(json["recurringSourceId"], "netflix");
        assert!(json.get("receiptUrl").is_none());
    }

    #[test]
    fn template_category_wins_over_default() {
        let mut t = template();
        t.category = Some("Entertainment".into());
        let e = Expense::from_template(&t, Utc::now());
        assert_eq!(e.category, "Entertainment");
    }
}

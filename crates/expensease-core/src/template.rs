//! Recurring-expense templates as stored under each group.
//!
//! Template documents are written by the mobile client and are loosely
//! typed. [`TemplateFields::decode`] lifts a raw document into optional typed
//! fields (failing only on a wrong JSON type), and
//! [`TemplateFields::validate`] checks that every required field is present
//! and non-empty.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Frequency;

/// Location of a template document: `groups/{group_path}/recurringExpenses/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRef {
    /// The group the document lives under (from its path, not its `groupId` field).
    pub group_path: String,
    pub id: String,
}

impl TemplateRef {
    pub fn new(group_path: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            group_path: group_path.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "groups/{}/recurringExpenses/{}", self.group_path, self.id)
    }
}

/// A raw template document as returned by the due query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    pub group_path: String,
    pub id: String,
    pub data: serde_json::Value,
}

impl TemplateDocument {
    pub fn reference(&self) -> TemplateRef {
        TemplateRef::new(self.group_path.clone(), self.id.clone())
    }

    /// The stored `nextDueDate`, if it is present and a valid RFC 3339 timestamp.
    pub fn next_due_date(&self) -> Option<DateTime<Utc>> {
        self.data
            .get("nextDueDate")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Overwrite the stored `nextDueDate`. No-op if the document is not an object.
    pub fn set_next_due_date(&mut self, next: DateTime<Utc>) {
        if let Some(fields) = self.data.as_object_mut() {
            fields.insert(
                "nextDueDate".to_string(),
                serde_json::Value::String(next.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
    }
}

/// A template document whose fields have the wrong JSON type.
#[derive(Debug, Error)]
#[error("template {id} has an unexpected shape: {source}")]
pub struct DecodeError {
    pub id: String,
    #[source]
    pub source: serde_json::Error,
}

/// A required template field that is absent or empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing essential field `{field}`")]
pub struct ValidationError {
    pub field: &'static str,
}

/// Typed view of a template document. Every field is optional here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFields {
    pub group_id: Option<String>,
    pub description: Option<String>,
    pub total_amount: Option<f64>,
    pub paid_by: Option<String>,
    pub split: Option<BTreeMap<String, f64>>,
    pub frequency: Option<String>,
    pub next_due_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub receipt_url: Option<String>,
    pub whatsapp_number: Option<String>,
}

impl TemplateFields {
    pub fn decode(doc: &TemplateDocument) -> Result<Self, DecodeError> {
        Self::deserialize(&doc.data).map_err(|source| DecodeError {
            id: doc.id.clone(),
            source,
        })
    }

    /// Check required fields in the order the job reports them.
    pub fn validate(self, id: &str) -> Result<RecurringTemplate, ValidationError> {
        let group_id = required_text(self.group_id, "groupId")?;
        let description = required_text(self.description, "description")?;
        let total_amount = self
            .total_amount
            .filter(|a| a.is_finite() && *a > 0.0)
            .ok_or(ValidationError {
                field: "totalAmount",
            })?;
        let paid_by = required_text(self.paid_by, "paidBy")?;
        let split = self
            .split
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError { field: "split" })?;
        let frequency = required_text(self.frequency, "frequency")?;
        let next_due_date = self.next_due_date.ok_or(ValidationError {
            field: "nextDueDate",
        })?;

        Ok(RecurringTemplate {
            id: id.to_string(),
            group_id,
            description,
            total_amount,
            paid_by,
            split,
            frequency: Frequency::parse(&frequency),
            next_due_date,
            category: optional_text(self.category),
            notes: optional_text(self.notes),
            receipt_url: optional_text(self.receipt_url),
            whatsapp_number: optional_text(self.whatsapp_number),
        })
    }
}

fn required_text(
    value: Option<String>,
    field: &'static str,
) -> Result<String, ValidationError> {
    optional_text(value).ok_or(ValidationError { field })
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// A template that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringTemplate {
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub total_amount: f64,
    pub paid_by: String,
    pub split: BTreeMap<String, f64>,
    pub frequency: Frequency,
    pub next_due_date: DateTime<Utc>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub receipt_url: Option<String>,
    pub whatsapp_number: Option<String>,
}

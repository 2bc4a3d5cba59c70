//! Loan renewal form and its date rules

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::book_instance::InstanceView;
use crate::error::FieldErrors;

/// Weeks added to today for the proposed renewal date
pub const PROPOSED_RENEWAL_WEEKS: i64 = 3;
/// Furthest a renewal may push the due date
pub const MAX_RENEWAL_WEEKS: i64 = 4;

pub const RENEWAL_DATE_FIELD: &str = "renewal_date";

/// Renewal form as first presented
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenewalForm {
    pub instance: InstanceView,
    pub proposed_renewal_date: NaiveDate,
}

/// Submitted renewal. The date is kept raw so a malformed value is reported
/// as a field error rather than a rejected body.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RenewalInput {
    /// Date between now and 4 weeks (default 3), as YYYY-MM-DD
    #[schema(value_type = Option<String>, format = Date)]
    pub renewal_date: Option<Value>,
}

impl RenewalInput {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            renewal_date: Some(Value::String(date.format("%Y-%m-%d").to_string())),
        }
    }

    /// Submitted date as text; `null` counts as missing
    pub fn raw_date(&self) -> Option<String> {
        match &self.renewal_date {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

pub fn proposed_renewal_date(today: NaiveDate) -> NaiveDate {
    today + Duration::weeks(PROPOSED_RENEWAL_WEEKS)
}

/// Parse and check a submitted renewal date against `today`
pub fn validate_renewal_date(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, FieldErrors> {
    let raw = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(FieldErrors::single(RENEWAL_DATE_FIELD, "This field is required.")),
    };

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| FieldErrors::single(RENEWAL_DATE_FIELD, "Enter a valid date."))?;

    if date < today {
        return Err(FieldErrors::single(
            RENEWAL_DATE_FIELD,
            "Invalid date - renewal in past",
        ));
    }

    if date > today + Duration::weeks(MAX_RENEWAL_WEEKS) {
        return Err(FieldErrors::single(
            RENEWAL_DATE_FIELD,
            "Invalid date - renewal more than 4 weeks ahead",
        ));
    }

    Ok(date)
}

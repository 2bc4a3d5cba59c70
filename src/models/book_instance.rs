//! Book instance (a specific lendable copy) and the loan rules that apply to it

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::not_blank;
use crate::error::{AppResult, FieldErrors};

/// Availability of a copy. Stored as a one-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Maintenance,
        LoanStatus::OnLoan,
        LoanStatus::Available,
        LoanStatus::Reserved,
    ];

    /// Storage code
    pub fn code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        }
    }

    /// Whether a copy in this status may move to `next`
    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, next),
            (Maintenance, Available)
                | (Available, Maintenance)
                | (Available, OnLoan)
                | (Available, Reserved)
                | (OnLoan, Available)
                | (Reserved, Maintenance)
                | (Reserved, Available)
                | (Reserved, OnLoan)
        )
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" | "maintenance" => Ok(LoanStatus::Maintenance),
            "o" | "on_loan" => Ok(LoanStatus::OnLoan),
            "a" | "available" => Ok(LoanStatus::Available),
            "r" | "reserved" => Ok(LoanStatus::Reserved),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.code(), buf)
    }
}

/// A specific copy of a book that can be borrowed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    /// Random identifier, unique across the whole library
    pub id: Uuid,
    /// Cleared when the book is deleted
    pub book_id: Option<i32>,
    /// Details of the specific printing
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    /// External user id of the current borrower
    pub borrower_id: Option<i32>,
}

impl BookInstance {
    /// New copy, in maintenance with no due date and no borrower
    pub fn new(book_id: Option<i32>, imprint: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            imprint: imprint.into(),
            due_back: None,
            status: LoanStatus::default(),
            borrower_id: None,
        }
    }

    /// True only when a due date is set and lies strictly before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.due_back, Some(due) if due < today)
    }

    pub fn is_on_loan(&self) -> bool {
        self.status == LoanStatus::OnLoan
    }

    /// "id (book title)"
    pub fn label(&self, book_title: Option<&str>) -> String {
        format!("{} ({})", self.id, book_title.unwrap_or("no book"))
    }
}

/// Copy as presented, with the date-dependent flags computed for the request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InstanceView {
    #[serde(flatten)]
    pub instance: BookInstance,
    pub book_title: Option<String>,
    pub label: String,
    pub status_label: String,
    pub is_overdue: bool,
    pub is_on_loan: bool,
}

impl InstanceView {
    pub fn new(instance: BookInstance, book_title: Option<String>, today: NaiveDate) -> Self {
        Self {
            label: instance.label(book_title.as_deref()),
            status_label: instance.status.label().to_string(),
            is_overdue: instance.is_overdue(today),
            is_on_loan: instance.is_on_loan(),
            book_title,
            instance,
        }
    }
}

/// Create / update copy request (staff)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookInstanceInput {
    pub book_id: Option<i32>,
    #[validate(
        length(max = 200, message = "Imprint must be at most 200 characters"),
        custom(function = "not_blank")
    )]
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    /// Defaults to maintenance
    pub status: Option<LoanStatus>,
    pub borrower_id: Option<i32>,
}

impl BookInstanceInput {
    pub fn check(&self) -> AppResult<()> {
        self.validate().map_err(FieldErrors::from)?;
        Ok(())
    }
}

/// Copy listing filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct InstanceFilter {
    pub status: Option<LoanStatus>,
    pub book_id: Option<i32>,
    pub borrower_id: Option<i32>,
    /// Due on or after this date; undated copies never match
    pub due_from: Option<NaiveDate>,
    /// Due on or before this date; undated copies never match
    pub due_until: Option<NaiveDate>,
}

impl InstanceFilter {
    pub fn with_status(status: LoanStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Copies currently lent to `borrower_id`
    pub fn on_loan_to(borrower_id: i32) -> Self {
        Self {
            status: Some(LoanStatus::OnLoan),
            borrower_id: Some(borrower_id),
            ..Self::default()
        }
    }

    pub fn for_book(book_id: i32) -> Self {
        Self {
            book_id: Some(book_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, instance: &BookInstance) -> bool {
        if self.status.is_some_and(|s| s != instance.status) {
            return false;
        }
        if self.book_id.is_some() && instance.book_id != self.book_id {
            return false;
        }
        if self.borrower_id.is_some() && instance.borrower_id != self.borrower_id {
            return false;
        }
        if let Some(from) = self.due_from {
            if !instance.due_back.is_some_and(|due| due >= from) {
                return false;
            }
        }
        if let Some(until) = self.due_until {
            if !instance.due_back.is_some_and(|due| due <= until) {
                return false;
            }
        }
        true
    }
}

/// Default ordering: due date ascending, copies without a due date first
pub fn due_back_order(a: &BookInstance, b: &BookInstance) -> std::cmp::Ordering {
    a.due_back.cmp(&b.due_back).then_with(|| a.id.cmp(&b.id))
}

/// Check-out request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutInput {
    pub borrower_id: i32,
    pub due_back: NaiveDate,
}

/// Reservation request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReserveInput {
    pub borrower_id: Option<i32>,
    pub due_back: Option<NaiveDate>,
}

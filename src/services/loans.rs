//! Loan service: active loan listings, renewals and the copy lifecycle
//!
//! Every operation checks the caller's permission before touching storage.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use super::catalog::{instance_views, into_page};
use crate::{
    clock::Clock,
    error::{AppError, AppResult, FieldErrors},
    models::{
        book_instance::{CheckoutInput, ReserveInput},
        renewal::{proposed_renewal_date, validate_renewal_date, RenewalForm, RenewalInput},
        BookInstance, InstanceFilter, InstanceView, LoanStatus, Page, PageQuery, Paginator,
        UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    paginator: Paginator,
}

impl LoansService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, paginator: Paginator) -> Self {
        Self {
            repository,
            clock,
            paginator,
        }
    }

    /// Copies currently lent to the caller, soonest due first
    pub async fn my_loans(
        &self,
        claims: &UserClaims,
        query: &PageQuery,
    ) -> AppResult<Page<InstanceView>> {
        self.loans(&InstanceFilter::on_loan_to(claims.user_id), query)
            .await
    }

    /// Every copy on loan, soonest due first
    pub async fn all_loans(
        &self,
        claims: &UserClaims,
        query: &PageQuery,
    ) -> AppResult<Page<InstanceView>> {
        claims.require_view_all_loans()?;
        self.loans(&InstanceFilter::with_status(LoanStatus::OnLoan), query)
            .await
    }

    async fn loans(
        &self,
        filter: &InstanceFilter,
        query: &PageQuery,
    ) -> AppResult<Page<InstanceView>> {
        let request = self.paginator.resolve(query)?;
        let (rows, total) = self
            .repository
            .instances
            .list(filter, request.window())
            .await?;
        let items = instance_views(&self.repository, rows, self.clock.as_ref()).await?;
        into_page(items, total, &request)
    }

    // =========================================================================
    // Renewal
    // =========================================================================

    /// Copy to renew, with a proposed date three weeks out
    pub async fn renewal_form(&self, claims: &UserClaims, id: Uuid) -> AppResult<RenewalForm> {
        claims.require_mark_returned()?;
        let instance = self.repository.instances.get(id).await?;
        let today = self.clock.today();

        Ok(RenewalForm {
            instance: self.view(instance).await?,
            proposed_renewal_date: proposed_renewal_date(today),
        })
    }

    /// Move the due date. Status and borrower are left untouched.
    pub async fn renew(
        &self,
        claims: &UserClaims,
        id: Uuid,
        input: &RenewalInput,
    ) -> AppResult<InstanceView> {
        claims.require_mark_returned()?;
        let mut instance = self.repository.instances.get(id).await?;

        let renewal_date = validate_renewal_date(input.raw_date().as_deref(), self.clock.today())?;
        instance.due_back = Some(renewal_date);
        let saved = self.repository.instances.save(&instance).await?;

        tracing::info!(
            instance_id = %id,
            renewed_by = claims.user_id,
            due_back = %renewal_date,
            "Loan renewed"
        );
        self.view(saved).await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Put a copy on the shelf
    pub async fn stock(&self, claims: &UserClaims, id: Uuid) -> AppResult<InstanceView> {
        claims.require_mark_returned()?;
        let mut instance = self.repository.instances.get(id).await?;

        transition(&mut instance, LoanStatus::Available)?;
        instance.due_back = None;
        instance.borrower_id = None;

        self.store(instance, claims).await
    }

    pub async fn check_out(
        &self,
        claims: &UserClaims,
        id: Uuid,
        input: &CheckoutInput,
    ) -> AppResult<InstanceView> {
        claims.require_mark_returned()?;
        let mut instance = self.repository.instances.get(id).await?;

        self.ensure_not_past(input.due_back)?;
        if instance.status == LoanStatus::Reserved {
            if let Some(holder) = instance.borrower_id {
                if holder != input.borrower_id {
                    return Err(AppError::BusinessRule(format!(
                        "Book instance {} is reserved for another borrower",
                        id
                    )));
                }
            }
        }

        transition(&mut instance, LoanStatus::OnLoan)?;
        instance.due_back = Some(input.due_back);
        instance.borrower_id = Some(input.borrower_id);

        self.store(instance, claims).await
    }

    pub async fn mark_returned(&self, claims: &UserClaims, id: Uuid) -> AppResult<InstanceView> {
        claims.require_mark_returned()?;
        let mut instance = self.repository.instances.get(id).await?;

        if !instance.is_on_loan() {
            return Err(AppError::BusinessRule(format!(
                "Book instance {} is not on loan",
                id
            )));
        }
        transition(&mut instance, LoanStatus::Available)?;
        instance.due_back = None;
        instance.borrower_id = None;

        self.store(instance, claims).await
    }

    pub async fn reserve(
        &self,
        claims: &UserClaims,
        id: Uuid,
        input: &ReserveInput,
    ) -> AppResult<InstanceView> {
        claims.require_mark_returned()?;
        let mut instance = self.repository.instances.get(id).await?;

        if let Some(due_back) = input.due_back {
            self.ensure_not_past(due_back)?;
        }
        transition(&mut instance, LoanStatus::Reserved)?;
        instance.due_back = input.due_back;
        instance.borrower_id = input.borrower_id;

        self.store(instance, claims).await
    }

    fn ensure_not_past(&self, due_back: NaiveDate) -> AppResult<()> {
        if due_back < self.clock.today() {
            return Err(FieldErrors::single("due_back", "Due date cannot be in the past").into());
        }
        Ok(())
    }

    async fn store(&self, instance: BookInstance, claims: &UserClaims) -> AppResult<InstanceView> {
        let saved = self.repository.instances.save(&instance).await?;
        tracing::info!(
            instance_id = %saved.id,
            status = saved.status.code(),
            staff_id = claims.user_id,
            "Book instance status changed"
        );
        self.view(saved).await
    }

    async fn view(&self, instance: BookInstance) -> AppResult<InstanceView> {
        instance_views(&self.repository, vec![instance], self.clock.as_ref())
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Empty instance view".to_string()))
    }
}

fn transition(instance: &mut BookInstance, next: LoanStatus) -> AppResult<()> {
    if !instance.status.can_transition_to(next) {
        return Err(AppError::BusinessRule(format!(
            "Book instance {} cannot go from {} to {}",
            instance.id, instance.status, next
        )));
    }
    instance.status = next;
    Ok(())
}

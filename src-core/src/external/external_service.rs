use chrono::Utc;
use log::{error, info, warn};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::sleep;

use crate::constants::{
    AUDIT_LOG_TARGET, EVENT_EXTERNAL_UPDATE_COMPLETED, EVENT_EXTERNAL_UPDATE_FAILED,
    EVENT_TARGET_ACHIEVED, EVENT_TARGET_CONTRIBUTION_PROGRESS, EVENT_TARGET_UPDATED,
    MATERIAL_PROGRESS_POINTS,
};
use crate::db::{get_connection, is_lock_contention_error, DbPool, DbTransactionExecutor};
use crate::errors::Result;
use crate::external::external_model::{
    AuditRecord, ConflictDetails, ExternalUpdateOutcome, ExternalUpdateRequest, FieldContribution,
    FieldDelta, RetryPolicy, TargetFieldUpdates, UpdateMode, UpdateReceipt,
};
use crate::external::external_repository::{insert_receipt, ReceiptRepository};
use crate::notifications::{NotificationEvent, NotificationPriority, NotifierTrait};
use crate::targets::{
    load_target, newly_achieved, persist_target, validate_aggregate, TargetError, TargetField,
    UserTarget, ValidatorConfig,
};
use crate::users::UserRepositoryTrait;

/// Applies structured updates pushed by an external system (typically the
/// ERP) to a user's target aggregate. The read-modify-write runs under the
/// database write lock, taken up front, and is retried with exponential
/// backoff on contention.
pub struct ExternalTargetUpdateService<U, N>
where
    U: UserRepositoryTrait,
    N: NotifierTrait,
{
    pool: Arc<DbPool>,
    user_repo: Arc<U>,
    receipts: ReceiptRepository,
    notifier: Arc<N>,
    validator: ValidatorConfig,
    retry: RetryPolicy,
}

impl<U, N> ExternalTargetUpdateService<U, N>
where
    U: UserRepositoryTrait,
    N: NotifierTrait,
{
    pub fn new(pool: Arc<DbPool>, user_repo: Arc<U>, notifier: Arc<N>) -> Self {
        ExternalTargetUpdateService {
            receipts: ReceiptRepository::new(pool.clone()),
            pool,
            user_repo,
            notifier,
            validator: ValidatorConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Applies one external update. Returns the three-way outcome
    /// (applied / invalid / conflict); a missing user or aggregate and an
    /// integrity violation surface as typed errors instead.
    pub async fn apply_external_update(
        &self,
        user_id: &str,
        company_id: &str,
        request: &ExternalUpdateRequest,
    ) -> Result<ExternalUpdateOutcome> {
        // Resolve the user inside the tenant scope, then the aggregate.
        // Both are NotFound conditions, never validation errors.
        self.user_repo.find_in_scope(user_id, company_id)?;

        let current = {
            let mut conn = get_connection(&self.pool)?;
            load_target(&mut conn, user_id)?
        }
        .ok_or_else(|| {
            TargetError::NotFound(format!("User {} has no target aggregate", user_id))
        })?;

        // Field-level validation happens before any lock is taken
        let mut violations = validate_request(request);

        // All-or-nothing pre-check: a DECREMENT that would push any field
        // negative rejects the whole request before a write is attempted
        if violations.is_empty() && request.update_mode == UpdateMode::Decrement {
            violations = decrement_violations(&current, &request.updates);
        }

        if !violations.is_empty() {
            return Ok(ExternalUpdateOutcome::Invalid { errors: violations });
        }

        // Idempotent replay: an unexpired receipt short-circuits with the
        // recorded outcome and never touches the aggregate again
        let now = Utc::now().naive_utc();
        if let Err(e) = self.receipts.purge_expired(now) {
            // Housekeeping only; a locked database must not fail the request
            warn!("Failed to purge expired update receipts: {}", e);
        }
        if let Some(receipt) = self.receipts.find_valid(&request.transaction_id, now)? {
            info!(
                "Transaction {} from {} already applied; replaying recorded outcome",
                request.transaction_id, receipt.source
            );
            return Ok(receipt.outcome);
        }

        let mut retries = 0u32;
        let (outcome, before_state, after_state) = loop {
            let attempt = self.pool.execute_immediate(|conn| {
                // Fresh read under the write lock
                let fresh = load_target(conn, user_id)?.ok_or_else(|| {
                    TargetError::NotFound(format!("User {} has no target aggregate", user_id))
                })?;

                let (next, deltas) = apply_mode(&fresh, request.update_mode, &request.updates);

                if let Err(issues) = validate_aggregate(&next, &self.validator) {
                    error!(
                        "External update {} for user {} produced an invalid aggregate: {}",
                        request.transaction_id,
                        user_id,
                        issues.join("; ")
                    );
                    return Err(TargetError::IntegrityViolation(issues).into());
                }

                let persisted = persist_target(conn, &next)?;

                let applied_at = Utc::now().naive_utc();
                let audit = AuditRecord {
                    user_id: user_id.to_string(),
                    transaction_id: request.transaction_id.clone(),
                    source: request.source_label().to_string(),
                    update_mode: request.update_mode,
                    before: fresh.current_values(),
                    after: persisted.current_values(),
                    deltas,
                    applied_at,
                };
                info!(target: AUDIT_LOG_TARGET, "{}", serde_json::to_string(&audit)?);

                let outcome = ExternalUpdateOutcome::Applied {
                    values: persisted.current_values(),
                };
                let receipt = UpdateReceipt::new(
                    &request.transaction_id,
                    user_id,
                    request.source_label(),
                    outcome.clone(),
                    applied_at,
                );
                insert_receipt(conn, &receipt)?;

                Ok((outcome, fresh, persisted))
            });

            match attempt {
                Ok(committed) => break committed,
                Err(e) if is_lock_contention_error(&e) && retries < self.retry.max_retries => {
                    retries += 1;
                    let delay = self.retry.delay_before_retry(retries);
                    warn!(
                        "Aggregate row for user {} is locked; retry {}/{} in {:?}",
                        user_id, retries, self.retry.max_retries, delay
                    );
                    sleep(delay).await;
                }
                Err(e) if is_lock_contention_error(&e) => {
                    warn!(
                        "External update {} for user {} still locked after {} retries; surfacing conflict",
                        request.transaction_id, user_id, retries
                    );
                    self.emit_failed(user_id, request, "lock conflict", retries);
                    return Ok(ExternalUpdateOutcome::Conflict {
                        details: ConflictDetails {
                            retry_count: retries,
                            retry_after_ms: self
                                .retry
                                .delay_before_retry(retries + 1)
                                .as_millis() as u64,
                        },
                    });
                }
                Err(e) => {
                    self.emit_failed(user_id, request, &e.to_string(), retries);
                    return Err(e);
                }
            }
        };

        // Post-commit side effects are best effort; the committed mutation
        // stands whatever happens here
        self.emit_post_commit(user_id, request, &before_state, &after_state);

        Ok(outcome)
    }

    fn emit_post_commit(
        &self,
        user_id: &str,
        request: &ExternalUpdateRequest,
        before: &UserTarget,
        after: &UserTarget,
    ) {
        self.notifier.emit(NotificationEvent::new(
            EVENT_EXTERNAL_UPDATE_COMPLETED,
            user_id,
            json!({
                "userId": user_id,
                "source": request.source_label(),
                "transactionId": request.transaction_id,
                "updatedValues": after.current_values(),
            }),
            NotificationPriority::Normal,
        ));

        self.notifier.emit(NotificationEvent::new(
            EVENT_TARGET_UPDATED,
            user_id,
            json!({
                "userId": user_id,
                "source": request.source_label(),
                "values": after.current_values(),
            }),
            NotificationPriority::Normal,
        ));

        if request.update_mode == UpdateMode::Increment {
            let contributions = contribution_summary(before, after, &request.updates);
            if has_material_movement(&contributions) {
                self.notifier.emit(NotificationEvent::new(
                    EVENT_TARGET_CONTRIBUTION_PROGRESS,
                    user_id,
                    json!({
                        "userId": user_id,
                        "source": request.source_label(),
                        "contributions": contributions,
                    }),
                    NotificationPriority::Normal,
                ));
            }
        }

        for field in newly_achieved(before, after) {
            self.notifier.emit(NotificationEvent::new(
                EVENT_TARGET_ACHIEVED,
                user_id,
                json!({
                    "userId": user_id,
                    "metric": field.as_str(),
                    "current": after.current_of(field),
                    "target": after.target_of(field),
                }),
                NotificationPriority::High,
            ));
        }
    }

    fn emit_failed(
        &self,
        user_id: &str,
        request: &ExternalUpdateRequest,
        error: &str,
        retries: u32,
    ) {
        self.notifier.emit(NotificationEvent::new(
            EVENT_EXTERNAL_UPDATE_FAILED,
            user_id,
            json!({
                "userId": user_id,
                "source": request.source_label(),
                "transactionId": request.transaction_id,
                "error": error,
                "retryCount": retries,
            }),
            NotificationPriority::High,
        ));
    }
}

/// Field-level request validation. Returns every violated rule, so a caller
/// can fix the whole request in one round trip.
pub(crate) fn validate_request(request: &ExternalUpdateRequest) -> Vec<String> {
    let mut errors = Vec::new();

    if request.transaction_id.trim().is_empty() {
        errors.push("transactionId must not be empty".to_string());
    }

    if request.updates.names_sales_amount() {
        errors.push(
            "currentSalesAmount is derived from quotations and orders; supply \
             currentQuotationsAmount or currentOrdersAmount instead"
                .to_string(),
        );
    }

    let supplied = request.updates.supplied();
    if supplied.is_empty() && !request.updates.names_sales_amount() {
        errors.push("updates must contain at least one field".to_string());
    }

    for (field, value) in &supplied {
        match request.update_mode {
            UpdateMode::Increment | UpdateMode::Decrement => {
                if *value <= Decimal::ZERO {
                    errors.push(format!(
                        "{} value for {} must be strictly positive, got {}",
                        request.update_mode.as_str(),
                        field.as_str(),
                        value
                    ));
                }
            }
            UpdateMode::Replace => {
                if *value < Decimal::ZERO {
                    errors.push(format!(
                        "REPLACE value for {} must not be negative, got {}",
                        field.as_str(),
                        value
                    ));
                }
            }
        }

        if field.is_count() && value.fract() != Decimal::ZERO {
            errors.push(format!(
                "{} is a count and must be an integer, got {}",
                field.as_str(),
                value
            ));
        }
    }

    errors
}

/// Pre-computes every DECREMENT result; any field that would go negative
/// rejects the whole request
pub(crate) fn decrement_violations(
    current: &UserTarget,
    updates: &TargetFieldUpdates,
) -> Vec<String> {
    updates
        .supplied()
        .into_iter()
        .filter(|(field, value)| current.current_of(*field) - *value < Decimal::ZERO)
        .map(|(field, value)| {
            format!(
                "DECREMENT of {} by {} would make the stored value {} negative",
                field.as_str(),
                value,
                current.current_of(field)
            )
        })
        .collect()
}

/// Applies the update mode to every supplied field and re-derives the sales
/// amount. Returns the proposed next state and the per-field movements.
pub(crate) fn apply_mode(
    current: &UserTarget,
    mode: UpdateMode,
    updates: &TargetFieldUpdates,
) -> (UserTarget, Vec<FieldDelta>) {
    let mut next = current.clone();

    for (field, value) in updates.supplied() {
        let previous = next.current_of(field);
        let new_value = match mode {
            UpdateMode::Increment => previous + value,
            UpdateMode::Decrement => previous - value,
            UpdateMode::Replace => value,
        };
        next.set_current(field, new_value);
    }
    next.recompute_sales();

    let mut deltas = Vec::new();
    for field in std::iter::once(TargetField::SalesAmount).chain(TargetField::UPDATABLE) {
        let previous = current.current_of(field);
        let new_value = next.current_of(field);
        if previous != new_value {
            deltas.push(FieldDelta {
                field: field.as_str().to_string(),
                previous,
                new_value,
                delta: new_value - previous,
            });
        }
    }

    (next, deltas)
}

/// Human-facing summary of how an INCREMENT moved each supplied field. When
/// a sales component moved, the derived sales movement is reported as well,
/// since sales is the field carrying the target.
pub(crate) fn contribution_summary(
    before: &UserTarget,
    after: &UserTarget,
    updates: &TargetFieldUpdates,
) -> Vec<FieldContribution> {
    let supplied = updates.supplied();
    let touches_sales = supplied.iter().any(|(field, _)| {
        matches!(
            field,
            TargetField::QuotationsAmount | TargetField::OrdersAmount
        )
    });

    let mut fields: Vec<TargetField> = supplied.into_iter().map(|(field, _)| field).collect();
    if touches_sales {
        fields.push(TargetField::SalesAmount);
    }

    fields
        .into_iter()
        .map(|field| {
            let previous = before.current_of(field);
            let new_value = after.current_of(field);
            let delta = new_value - previous;
            let target = after.target_of(field);
            FieldContribution {
                field: field.as_str().to_string(),
                previous,
                new_value,
                delta,
                percent_of_target: if target > Decimal::ZERO {
                    Some(delta / target * Decimal::ONE_HUNDRED)
                } else {
                    None
                },
            }
        })
        .collect()
}

/// True when at least one field moved by the material-progress threshold
pub(crate) fn has_material_movement(contributions: &[FieldContribution]) -> bool {
    let threshold = Decimal::from_str(MATERIAL_PROGRESS_POINTS).unwrap_or_default();
    contributions
        .iter()
        .any(|contribution| contribution.percent_of_target.is_some_and(|pct| pct >= threshold))
}

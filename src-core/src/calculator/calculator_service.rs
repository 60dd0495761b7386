use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, info};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::constants::EVENT_TARGET_ACHIEVED;
use crate::errors::Result;
use crate::notifications::{NotificationEvent, NotificationPriority, NotifierTrait};
use crate::records::{RecordDeltas, RecordSourceTrait, ScanWindow};
use crate::targets::{
    newly_achieved, validate_aggregate, TargetError, TargetField, TargetRepositoryTrait,
    UserTarget, ValidatorConfig,
};

/// Outcome of one recalculation request
#[derive(Debug, Clone, PartialEq)]
pub enum RecalculationOutcome {
    /// The user has no aggregate; nothing to do
    NoAggregate,
    /// No qualifying records inside the scan window; nothing was written,
    /// so externally-set values survive a no-op recalculation untouched
    NoNewRecords,
    /// A pass for the same user was already in flight; awaited its
    /// completion instead of starting a second one
    JoinedActive,
    /// New records were folded into the aggregate
    Applied {
        target: UserTarget,
        deltas: RecordDeltas,
        achieved: Vec<TargetField>,
    },
}

/// Event-driven incremental calculator. Only records created since the
/// watermark are summed; the whole period is never recomputed.
pub struct TargetCalculatorService<T, R, N>
where
    T: TargetRepositoryTrait,
    R: RecordSourceTrait,
    N: NotifierTrait,
{
    target_repo: Arc<T>,
    record_source: Arc<R>,
    notifier: Arc<N>,
    validator: ValidatorConfig,
    // One entry per user with a pass in flight. Single-process guard only:
    // a second process instance is tolerated because an empty-window pass
    // never writes.
    active: DashMap<String, broadcast::Sender<()>>,
}

impl<T, R, N> TargetCalculatorService<T, R, N>
where
    T: TargetRepositoryTrait,
    R: RecordSourceTrait,
    N: NotifierTrait,
{
    pub fn new(target_repo: Arc<T>, record_source: Arc<R>, notifier: Arc<N>) -> Self {
        TargetCalculatorService {
            target_repo,
            record_source,
            notifier,
            validator: ValidatorConfig::default(),
            active: DashMap::new(),
        }
    }

    pub fn with_validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }

    /// Entry point for `target.recalculation.requested` events. Failures are
    /// logged and swallowed; the aggregate stays at its last-known-good
    /// state.
    pub async fn on_recalculation_requested(&self, user_id: &str) {
        if let Err(e) = self.recalculate(user_id).await {
            error!("Target recalculation for user {} failed: {}", user_id, e);
        }
    }

    /// Recalculates one user's aggregate from the records created since the
    /// watermark. Safe to call repeatedly; concurrent calls for the same
    /// user join the pass already in flight.
    pub async fn recalculate(&self, user_id: &str) -> Result<RecalculationOutcome> {
        let guard_tx = match self.active.entry(user_id.to_string()) {
            Entry::Occupied(entry) => {
                let mut waiter = entry.get().subscribe();
                drop(entry);
                let _ = waiter.recv().await;
                debug!("Joined active recalculation for user {}", user_id);
                return Ok(RecalculationOutcome::JoinedActive);
            }
            Entry::Vacant(entry) => {
                let (tx, _) = broadcast::channel(1);
                entry.insert(tx.clone());
                tx
            }
        };

        let result = self.run_pass(user_id).await;

        self.active.remove(user_id);
        let _ = guard_tx.send(());

        result
    }

    async fn run_pass(&self, user_id: &str) -> Result<RecalculationOutcome> {
        let target = match self.target_repo.get_by_user_id(user_id)? {
            Some(target) => target,
            None => {
                debug!(
                    "User {} has no target aggregate; skipping recalculation",
                    user_id
                );
                return Ok(RecalculationOutcome::NoAggregate);
            }
        };

        let scan_end = Utc::now().naive_utc();
        let window = ScanWindow {
            from: target.scan_start(),
            to: scan_end,
            include_start: target.last_calculated_at.is_none(),
        };

        let deltas = self.record_source.deltas_between(user_id, &window)?;

        if deltas.is_empty() {
            debug!(
                "No new business records for user {} since {}; leaving aggregate untouched",
                user_id, window.from
            );
            return Ok(RecalculationOutcome::NoNewRecords);
        }

        let before = target.clone();
        let mut next = target;
        next.current_quotations_amount += deltas.open_quotations_amount;
        next.current_orders_amount += deltas.orders_amount;
        next.current_new_leads += deltas.new_leads;
        next.current_new_clients += deltas.new_clients;
        next.current_check_ins += deltas.check_ins;
        next.recompute_sales();

        // The watermark never moves backwards
        if scan_end > before.scan_start() {
            next.last_calculated_at = Some(scan_end);
        }

        if let Err(issues) = validate_aggregate(&next, &self.validator) {
            error!(
                "Recalculation for user {} produced an invalid aggregate, discarding: {}",
                user_id,
                issues.join("; ")
            );
            return Err(TargetError::IntegrityViolation(issues).into());
        }

        let saved = self.target_repo.save(&next)?;
        info!(
            "Recalculated targets for user {}: quotations +{}, orders +{}, leads +{}, clients +{}, check-ins +{}",
            user_id,
            deltas.open_quotations_amount,
            deltas.orders_amount,
            deltas.new_leads,
            deltas.new_clients,
            deltas.check_ins
        );

        let achieved = newly_achieved(&before, &saved);
        for field in &achieved {
            self.notifier.emit(NotificationEvent::new(
                EVENT_TARGET_ACHIEVED,
                &saved.user_id,
                json!({
                    "userId": saved.user_id,
                    "metric": field.as_str(),
                    "current": saved.current_of(*field),
                    "target": saved.target_of(*field),
                }),
                NotificationPriority::High,
            ));
        }

        Ok(RecalculationOutcome::Applied {
            target: saved,
            deltas,
            achieved,
        })
    }
}

/// Drives the calculator from an explicit request channel. Producers push a
/// user id per business event; delivery stops when every sender is dropped.
pub fn spawn_recalculation_worker<T, R, N>(
    service: Arc<TargetCalculatorService<T, R, N>>,
    mut requests: mpsc::UnboundedReceiver<String>,
) -> tokio::task::JoinHandle<()>
where
    T: TargetRepositoryTrait + 'static,
    R: RecordSourceTrait + 'static,
    N: NotifierTrait + 'static,
{
    tokio::spawn(async move {
        while let Some(user_id) = requests.recv().await {
            service.on_recalculation_requested(&user_id).await;
        }
        debug!("Recalculation request channel closed; worker exiting");
    })
}

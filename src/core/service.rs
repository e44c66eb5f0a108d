//! Quality service - the operations users perform on points, checks and alerts
//!
//! Every operation validates before it mutates, and nothing touches disk
//! until [`QualityService::commit`], so an error leaves the project as it was.

use rand::Rng;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::core::action::Action;
use crate::core::config::Config;
use crate::core::context::Context;
use crate::core::error::{QualityError, QualityResult};
use crate::core::identity::EntityId;
use crate::core::project::Project;
use crate::core::store::QualityStore;
use crate::entities::alert::QualityAlert;
use crate::entities::check::{MeasureSuccess, QualityCheck, QualityState};
use crate::entities::point::{CheckKind, QualityPoint};

/// One product line of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationLine {
    pub product: String,
    pub lot: Option<String>,
}

/// An inventory or production operation to run quality points against
#[derive(Debug, Clone, Default)]
pub struct Operation {
    /// Batch reference, e.g. "WH/IN/00042"
    pub reference: String,
    pub operation_type: Option<String>,
    pub lines: Vec<OperationLine>,
}

/// A check that processing an operation created (or would create)
#[derive(Debug, Clone)]
pub struct PlannedCheck {
    pub point: EntityId,
    pub point_ref: String,
    pub title: String,
    pub product: Option<String>,
    pub lot: Option<String>,
    /// None on a dry run
    pub check: Option<EntityId>,
}

/// Parameters for a manually created check
#[derive(Debug, Clone, Default)]
pub struct NewCheck {
    pub title: Option<String>,
    pub point: Option<EntityId>,
    pub test: Option<CheckKind>,
    pub product: Option<String>,
    pub lot: Option<String>,
    pub operation: Option<String>,
    pub operation_type: Option<String>,
    pub note: Option<String>,
}

/// Operations over a loaded store
pub struct QualityService {
    store: QualityStore,
    reasons: Vec<String>,
}

impl QualityService {
    pub fn new(store: QualityStore, reasons: Vec<String>) -> Self {
        Self { store, reasons }
    }

    /// Load a project's records with the configured root cause reasons
    pub fn open(project: &Project, config: &Config) -> QualityResult<Self> {
        Ok(Self::new(QualityStore::open(project)?, config.reasons()))
    }

    pub fn store(&self) -> &QualityStore {
        &self.store
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Persist every change made through this service
    pub fn commit(&mut self) -> QualityResult<()> {
        self.store.commit()
    }

    // =====================================================================
    // Points
    // =====================================================================

    pub fn create_point(&mut self, mut point: QualityPoint, ctx: &Context) -> QualityResult<EntityId> {
        point.created = ctx.now;
        if point.company.is_none() {
            point.company = ctx.company.clone();
        }
        let id = self.store.insert_point(point)?;
        tracing::info!(point = %id, user = %ctx.user, "quality point created");
        Ok(id)
    }

    /// Stop a point from generating checks
    pub fn archive_point(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<()> {
        let point = self.store.point_mut(id)?;
        if !point.active {
            return Err(QualityError::validation(format!(
                "quality point {} is already archived",
                point.reference
            )));
        }
        point.active = false;
        tracing::info!(point = %point.reference, user = %ctx.user, "quality point archived");
        Ok(())
    }

    pub fn restore_point(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<()> {
        let point = self.store.point_mut(id)?;
        if point.active {
            return Err(QualityError::validation(format!(
                "quality point {} is not archived",
                point.reference
            )));
        }
        point.active = true;
        tracing::info!(point = %point.reference, user = %ctx.user, "quality point restored");
        Ok(())
    }

    /// Delete a point no check references
    ///
    /// Referenced points are refused with [`QualityError::Referenced`];
    /// archive those instead.
    pub fn delete_point(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<QualityPoint> {
        let point = self.store.remove_point(id)?;
        tracing::info!(point = %point.reference, user = %ctx.user, "quality point deleted");
        Ok(point)
    }

    // =====================================================================
    // Checks
    // =====================================================================

    /// Create a check by hand
    ///
    /// A check tied to a point inherits its test (and norm) unless one is
    /// given; a check without a point defaults to pass/fail.
    pub fn create_check(&mut self, new: NewCheck, ctx: &Context) -> QualityResult<EntityId> {
        let mut check = match &new.point {
            Some(point_id) => {
                let point = self.store.point(point_id).ok_or_else(|| QualityError::NotFound {
                    kind: "quality point",
                    reference: point_id.to_string(),
                })?;
                QualityCheck::from_point(point, new.test.clone(), ctx)
            }
            None => {
                let title = new
                    .title
                    .clone()
                    .ok_or_else(|| QualityError::validation("a check without a point needs a title"))?;
                QualityCheck::new(title, new.test.clone().unwrap_or_default(), ctx)
            }
        };

        if let CheckKind::Measure(norm) = &check.test {
            norm.validate()?;
        }
        if let Some(title) = new.title {
            check.title = title;
        }
        if new.product.is_some() {
            check.product = new.product;
        }
        check.lot = new.lot;
        check.operation = new.operation;
        check.operation_type = new.operation_type;
        check.note = new.note;

        let id = self.store.insert_check(check)?;
        tracing::info!(check = %id, user = %ctx.user, "quality check created");
        Ok(id)
    }

    pub fn record_measure(&mut self, id: &EntityId, value: f64) -> QualityResult<MeasureSuccess> {
        self.store.check_mut(id)?.record_measure(value)
    }

    pub fn attach_picture(&mut self, id: &EntityId, path: impl Into<String>) -> QualityResult<()> {
        self.store.check_mut(id)?.attach_picture(path);
        Ok(())
    }

    /// Pass a check and point at the next one to inspect
    pub fn pass(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<Action> {
        self.store.check_mut(id)?.do_pass(ctx)?;
        Ok(self.next_in_batch(id))
    }

    /// Fail a check and point at the next one to inspect
    pub fn fail(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<Action> {
        self.store.check_mut(id)?.do_fail(ctx)?;
        Ok(self.next_in_batch(id))
    }

    /// Decide a measure check from its measurement
    pub fn measure(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<(QualityState, Action)> {
        let state = self.store.check_mut(id)?.do_measure(ctx)?;
        Ok((state, self.next_in_batch(id)))
    }

    /// Next undecided check of the same operation, in inspection order
    pub fn next_in_batch(&self, id: &EntityId) -> Action {
        let Some(operation) = self.store.check(id).and_then(|c| c.operation.clone()) else {
            return Action::Close;
        };
        self.store
            .batch(&operation)
            .into_iter()
            .find(|c| &c.id != id && !c.is_decided())
            .map(|c| Action::OpenCheck(c.id.clone()))
            .unwrap_or(Action::Close)
    }

    /// Raise an alert from a failed check
    pub fn do_alert(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<Action> {
        let check = self.store.check(id).ok_or_else(|| QualityError::NotFound {
            kind: "quality check",
            reference: id.to_string(),
        })?;
        if check.quality_state != QualityState::Fail {
            return Err(QualityError::AlertRequiresFailure {
                check: check.display_ref(),
                state: check.quality_state,
            });
        }

        let alert = QualityAlert::from_check(check, self.store.stages(), ctx);
        let point = alert.point.clone();
        let alert_id = self.store.insert_alert(alert)?;

        self.store.check_mut(id)?.alerts.push(alert_id.clone());
        if let Some(point) = point {
            if let Ok(point) = self.store.point_mut(&point) {
                point.links.alerts.push(alert_id.clone());
            }
        }

        tracing::info!(alert = %alert_id, check = %id, user = %ctx.user, "quality alert raised");
        Ok(Action::OpenAlert(alert_id))
    }

    /// Alerts raised from a check
    pub fn see_alerts(&self, id: &EntityId) -> QualityResult<Action> {
        let check = self.store.check(id).ok_or_else(|| QualityError::NotFound {
            kind: "quality check",
            reference: id.to_string(),
        })?;
        let alerts = check
            .alerts
            .iter()
            .filter(|a| self.store.alert(a).is_some())
            .cloned()
            .collect();
        Ok(Action::for_alerts(alerts))
    }

    /// Administrative override back to `none`
    pub fn reset_check(&mut self, id: &EntityId, ctx: &Context, reason: Option<String>) -> QualityResult<()> {
        self.store.check_mut(id)?.reset(ctx, reason)
    }

    // =====================================================================
    // Alerts
    // =====================================================================

    pub fn create_alert(&mut self, mut alert: QualityAlert, ctx: &Context) -> QualityResult<EntityId> {
        alert.created = ctx.now;
        let id = self.store.insert_alert(alert)?;
        tracing::info!(alert = %id, user = %ctx.user, "quality alert created");
        Ok(id)
    }

    pub fn move_alert(&mut self, id: &EntityId, stage: &str, ctx: &Context) -> QualityResult<()> {
        let stages = self.store.stages().clone();
        self.store.alert_mut(id)?.move_to_stage(stage, &stages, ctx)
    }

    pub fn advance_alert(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<()> {
        let stages = self.store.stages().clone();
        self.store.alert_mut(id)?.advance(&stages, ctx)
    }

    pub fn close_alert(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<()> {
        let stages = self.store.stages().clone();
        self.store.alert_mut(id)?.close(&stages, ctx)
    }

    pub fn reopen_alert(&mut self, id: &EntityId, ctx: &Context) -> QualityResult<()> {
        let stages = self.store.stages().clone();
        self.store.alert_mut(id)?.reopen(&stages, ctx)
    }

    pub fn assign_alert(&mut self, id: &EntityId, user: &str, ctx: &Context) -> QualityResult<()> {
        self.store.alert_mut(id)?.assign(user, ctx);
        tracing::info!(alert = %id, assignee = user, "quality alert assigned");
        Ok(())
    }

    pub fn set_alert_cause(&mut self, id: &EntityId, reason: &str) -> QualityResult<()> {
        let reasons = self.reasons.clone();
        self.store.alert_mut(id)?.set_root_cause(reason, &reasons)
    }

    // =====================================================================
    // Operation processing
    // =====================================================================

    /// Instantiate the checks an operation calls for
    ///
    /// Points bound to a product get one check per matching line; generic
    /// points get one check for the whole operation. Checks that already
    /// exist for the same operation, point, product and lot are not
    /// duplicated, so processing an operation twice is harmless.
    pub fn process_operation<R: Rng>(
        &mut self,
        operation: &Operation,
        ctx: &Context,
        rng: &mut R,
        dry_run: bool,
    ) -> QualityResult<Vec<PlannedCheck>> {
        if operation.reference.trim().is_empty() {
            return Err(QualityError::validation("operation reference is required"));
        }
        if operation.lines.is_empty() {
            return Err(QualityError::validation(format!(
                "operation {} has no product lines",
                operation.reference
            )));
        }

        let mut points: Vec<QualityPoint> = self
            .store
            .points()
            .filter(|p| p.active)
            .filter(|p| {
                operation
                    .lines
                    .iter()
                    .any(|l| p.applies_to(&l.product, operation.operation_type.as_deref()))
            })
            .cloned()
            .collect();
        points.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.reference.cmp(&b.reference)));

        // Checks planned during this call count as the latest for their point
        let mut planned_at: HashMap<EntityId, DateTime<Utc>> = HashMap::new();
        let mut planned = Vec::new();

        for point in &points {
            let targets: Vec<(Option<String>, Option<String>)> = match &point.product {
                Some(_) => operation
                    .lines
                    .iter()
                    .filter(|l| point.applies_to(&l.product, operation.operation_type.as_deref()))
                    .map(|l| (Some(l.product.clone()), l.lot.clone()))
                    .collect(),
                None => vec![(None, None)],
            };

            for (product, lot) in targets {
                if self.already_checked(operation, point, product.as_deref(), lot.as_deref()) {
                    tracing::debug!(point = %point.reference, "check already exists for this operation");
                    continue;
                }

                let last = planned_at
                    .get(&point.id)
                    .copied()
                    .max(self.store.last_check_created(&point.id));
                if !point.should_execute_now(last, ctx.now, rng) {
                    tracing::debug!(point = %point.reference, frequency = %point.frequency, "skipped by frequency");
                    continue;
                }
                planned_at.insert(point.id.clone(), ctx.now);

                let check_id = if dry_run {
                    None
                } else {
                    let mut check = QualityCheck::from_point(point, None, ctx);
                    check.product = product.clone();
                    check.lot = lot.clone();
                    check.operation = Some(operation.reference.clone());
                    check.operation_type = operation.operation_type.clone();
                    Some(self.store.insert_check(check)?)
                };

                planned.push(PlannedCheck {
                    point: point.id.clone(),
                    point_ref: point.reference.clone(),
                    title: point.title.clone(),
                    product,
                    lot,
                    check: check_id,
                });
            }
        }

        tracing::info!(
            operation = %operation.reference,
            checks = planned.len(),
            dry_run,
            "operation processed"
        );
        Ok(planned)
    }

    fn already_checked(
        &self,
        operation: &Operation,
        point: &QualityPoint,
        product: Option<&str>,
        lot: Option<&str>,
    ) -> bool {
        self.store.checks_for_point(&point.id).any(|c| {
            c.operation.as_deref() == Some(operation.reference.as_str())
                && c.product.as_deref() == product
                && c.lot.as_deref() == lot
        })
    }
}

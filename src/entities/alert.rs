//! Quality alert - escalation record tracked through the stage pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::context::Context;
use crate::core::entity::{Entity, Priority};
use crate::core::error::{QualityError, QualityResult};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::check::QualityCheck;
use crate::entities::stage::StagePipeline;

/// Stage change log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageChange {
    pub from: String,
    pub to: String,
    pub by: String,
    pub at: DateTime<Utc>,
}

/// A quality alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAlert {
    /// Unique identifier
    pub id: EntityId,

    /// Sequence reference (e.g. "QA00007")
    #[serde(default)]
    pub reference: String,

    /// Alert title
    pub title: String,

    /// Check the alert was raised from (lookup only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<EntityId>,

    /// Point of the originating check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot: Option<String>,

    /// Current stage key
    pub stage: String,

    #[serde(default)]
    pub priority: Priority,

    /// Root cause (one of the configured reasons)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrective_action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preventive_action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    /// Person in charge of the corrective action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_assign: Option<DateTime<Utc>>,

    /// Set when the alert first reaches a done stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_close: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<StageChange>,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Entity for QualityAlert {
    const PREFIX: EntityPrefix = EntityPrefix::Qa;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn reference(&self) -> &str {
        &self.reference
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl QualityAlert {
    /// Create a manual alert in the first open stage
    pub fn new(title: String, stages: &StagePipeline, ctx: &Context) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Qa),
            reference: String::new(),
            title,
            check: None,
            point: None,
            product: None,
            lot: None,
            stage: stages.first_open().key.clone(),
            priority: Priority::default(),
            root_cause: None,
            description: None,
            corrective_action: None,
            preventive_action: None,
            team: None,
            responsible: None,
            date_assign: None,
            date_close: None,
            company: ctx.company.clone(),
            tags: Vec::new(),
            history: Vec::new(),
            created: ctx.now,
            author: ctx.user.clone(),
        }
    }

    /// Create an alert for a failed check, copying what it inspected
    pub fn from_check(check: &QualityCheck, stages: &StagePipeline, ctx: &Context) -> Self {
        let mut alert = Self::new(check.title.clone(), stages, ctx);
        alert.check = Some(check.id.clone());
        alert.point = check.point.clone();
        alert.product = check.product.clone();
        alert.lot = check.lot.clone();
        alert.team = check.team.clone();
        alert.description = check.failure_message.clone();
        if alert.company.is_none() {
            alert.company = check.company.clone();
        }
        alert
    }

    pub fn display_ref(&self) -> String {
        if self.reference.is_empty() {
            self.id.to_string()
        } else {
            self.reference.clone()
        }
    }

    pub fn is_closed(&self, stages: &StagePipeline) -> bool {
        stages.is_done(&self.stage)
    }

    fn change_stage(&mut self, to: &str, ctx: &Context) {
        self.history.push(StageChange {
            from: self.stage.clone(),
            to: to.to_string(),
            by: ctx.user.clone(),
            at: ctx.now,
        });
        tracing::info!(alert = %self.display_ref(), from = %self.stage, to, "alert stage changed");
        self.stage = to.to_string();
    }

    /// Move the alert forward to another stage
    ///
    /// Moving to an earlier stage is refused; use [`QualityAlert::reopen`].
    /// An open alert may always move into a done stage, wherever that stage
    /// sits in the pipeline. The first arrival in a done stage stamps
    /// `date_close`; later closes keep that first date. Leaving a done stage
    /// for an open one clears it again.
    pub fn move_to_stage(
        &mut self,
        key_or_name: &str,
        stages: &StagePipeline,
        ctx: &Context,
    ) -> QualityResult<()> {
        let target = stages.resolve(key_or_name)?;
        let current = stages.get(&self.stage);

        if target.key == self.stage {
            return Ok(());
        }
        let closing = target.done && !current.is_some_and(|s| s.done);
        if !closing && current.is_some_and(|s| target.sequence < s.sequence) {
            return Err(QualityError::BackwardStage {
                alert: self.display_ref(),
                from: self.stage.clone(),
                to: target.key.clone(),
            });
        }

        self.change_stage(&target.key, ctx);
        if target.done {
            if self.date_close.is_none() {
                self.date_close = Some(ctx.now);
            }
        } else if self.date_close.take().is_some() {
            tracing::info!(alert = %self.display_ref(), "alert reopened by stage move");
        }
        Ok(())
    }

    /// Advance to the next stage in sequence
    pub fn advance(&mut self, stages: &StagePipeline, ctx: &Context) -> QualityResult<()> {
        let next = stages
            .next(&self.stage)
            .ok_or_else(|| {
                QualityError::validation(format!(
                    "alert {} is already in the last stage '{}'",
                    self.display_ref(),
                    self.stage
                ))
            })?
            .key
            .clone();
        self.move_to_stage(&next, stages, ctx)
    }

    /// Close by moving to the nearest done stage at or after the current one
    ///
    /// Falls back to the first done stage when none follows.
    pub fn close(&mut self, stages: &StagePipeline, ctx: &Context) -> QualityResult<()> {
        if self.is_closed(stages) {
            return Ok(());
        }
        let done = stages
            .get(&self.stage)
            .and_then(|current| stages.done_after(current.sequence))
            .or_else(|| stages.first_done())
            .ok_or_else(|| QualityError::validation("the alert pipeline has no done stage"))?
            .key
            .clone();
        self.move_to_stage(&done, stages, ctx)
    }

    /// Manually reopen: back to the first open stage, closure cleared
    pub fn reopen(&mut self, stages: &StagePipeline, ctx: &Context) -> QualityResult<()> {
        let first = stages.first_open().key.clone();
        if self.stage == first {
            return Err(QualityError::validation(format!(
                "alert {} is already in stage '{}'",
                self.display_ref(),
                first
            )));
        }
        self.change_stage(&first, ctx);
        self.date_close = None;
        Ok(())
    }

    /// Hand the alert to someone
    pub fn assign(&mut self, user: impl Into<String>, ctx: &Context) {
        self.responsible = Some(user.into());
        self.date_assign = Some(ctx.now);
    }

    /// Record the root cause, which must be one of the configured reasons
    pub fn set_root_cause(&mut self, reason: &str, reasons: &[String]) -> QualityResult<()> {
        let matched = reasons
            .iter()
            .find(|r| r.eq_ignore_ascii_case(reason))
            .ok_or_else(|| {
                QualityError::validation(format!(
                    "unknown root cause '{}'. Use one of: {}",
                    reason,
                    reasons.join(", ")
                ))
            })?;
        self.root_cause = Some(matched.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::point::CheckKind;
    use crate::entities::stage::AlertStage;
    use chrono::TimeZone;

    fn ctx_at(day: u32) -> Context {
        Context::new("qa").at(Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap())
    }

    fn alert() -> (QualityAlert, StagePipeline) {
        let stages = StagePipeline::default();
        (QualityAlert::new("Scratch".to_string(), &stages, &ctx_at(1)), stages)
    }

    #[test]
    fn test_new_alert_starts_in_first_open_stage() {
        let (alert, stages) = alert();
        assert!(alert.id.to_string().starts_with("QA-"));
        assert_eq!(alert.stage, "new");
        assert!(!alert.is_closed(&stages));
        assert!(alert.date_close.is_none());
    }

    #[test]
    fn test_from_check_copies_context() {
        let stages = StagePipeline::default();
        let mut check = QualityCheck::new("Visual".to_string(), CheckKind::PassFail, &ctx_at(1));
        check.product = Some("P".to_string());
        check.lot = Some("LOT-1".to_string());
        check.failure_message = Some("Reject the part".to_string());

        let alert = QualityAlert::from_check(&check, &stages, &ctx_at(2));
        assert_eq!(alert.check.as_ref(), Some(&check.id));
        assert_eq!(alert.product.as_deref(), Some("P"));
        assert_eq!(alert.lot.as_deref(), Some("LOT-1"));
        assert_eq!(alert.description.as_deref(), Some("Reject the part"));
    }

    #[test]
    fn test_forward_moves_and_close_date() {
        let (mut alert, stages) = alert();
        alert.move_to_stage("confirmed", &stages, &ctx_at(2)).unwrap();
        assert!(alert.date_close.is_none());

        alert.move_to_stage("solved", &stages, &ctx_at(3)).unwrap();
        assert_eq!(alert.date_close, Some(ctx_at(3).now));
        assert_eq!(alert.history.len(), 2);
    }

    #[test]
    fn test_backward_move_is_refused() {
        let (mut alert, stages) = alert();
        alert.move_to_stage("action_proposed", &stages, &ctx_at(2)).unwrap();

        let err = alert.move_to_stage("confirmed", &stages, &ctx_at(3)).unwrap_err();
        assert!(matches!(err, QualityError::BackwardStage { .. }));
        assert_eq!(alert.stage, "action_proposed");
    }

    #[test]
    fn test_double_close_keeps_first_date() {
        let (mut alert, mut stages) = alert();
        stages
            .stages
            .push(AlertStage::new("archived", "Archived", 9, true));

        alert.close(&stages, &ctx_at(3)).unwrap();
        alert.close(&stages, &ctx_at(5)).unwrap();
        alert.move_to_stage("archived", &stages, &ctx_at(7)).unwrap();

        assert_eq!(alert.stage, "archived");
        assert_eq!(alert.date_close, Some(ctx_at(3).now));
    }

    #[test]
    fn test_reopen_clears_close_date() {
        let (mut alert, stages) = alert();
        alert.close(&stages, &ctx_at(3)).unwrap();
        alert.reopen(&stages, &ctx_at(4)).unwrap();

        assert_eq!(alert.stage, "new");
        assert!(alert.date_close.is_none());

        alert.close(&stages, &ctx_at(8)).unwrap();
        assert_eq!(alert.date_close, Some(ctx_at(8).now));
    }

    #[test]
    fn test_reopen_open_alert_fails() {
        let (mut alert, stages) = alert();
        assert!(alert.reopen(&stages, &ctx_at(2)).is_err());
    }

    #[test]
    fn test_advance_walks_pipeline() {
        let (mut alert, stages) = alert();
        alert.advance(&stages, &ctx_at(2)).unwrap();
        assert_eq!(alert.stage, "confirmed");
        alert.advance(&stages, &ctx_at(2)).unwrap();
        alert.advance(&stages, &ctx_at(2)).unwrap();
        assert_eq!(alert.stage, "solved");
        assert!(alert.advance(&stages, &ctx_at(2)).is_err());
    }

    #[test]
    fn test_root_cause_must_be_configured() {
        let (mut alert, _) = alert();
        let reasons = vec!["Parts Quality".to_string(), "Others".to_string()];

        alert.set_root_cause("parts quality", &reasons).unwrap();
        assert_eq!(alert.root_cause.as_deref(), Some("Parts Quality"));
        assert!(alert.set_root_cause("Cosmic rays", &reasons).is_err());
    }

    #[test]
    fn test_assign_sets_date() {
        let (mut alert, _) = alert();
        alert.assign("maintenance", &ctx_at(4));
        assert_eq!(alert.responsible.as_deref(), Some("maintenance"));
        assert_eq!(alert.date_assign, Some(ctx_at(4).now));
    }

    #[test]
    fn test_close_with_leading_done_stage() {
        let stages = StagePipeline::new(vec![
            AlertStage::new("cancelled", "Cancelled", 0, true),
            AlertStage::new("todo", "To Do", 5, false),
        ])
        .unwrap();
        let mut alert = QualityAlert::new("Dent".to_string(), &stages, &ctx_at(1));
        assert_eq!(alert.stage, "todo");

        alert.close(&stages, &ctx_at(2)).unwrap();
        assert_eq!(alert.stage, "cancelled");
        assert!(alert.is_closed(&stages));
        assert_eq!(alert.date_close, Some(ctx_at(2).now));
    }

    #[test]
    fn test_close_prefers_done_stage_after_current() {
        let stages = StagePipeline::new(vec![
            AlertStage::new("rejected", "Rejected", 0, true),
            AlertStage::new("new", "New", 1, false),
            AlertStage::new("solved", "Solved", 4, true),
        ])
        .unwrap();
        let mut alert = QualityAlert::new("Dent".to_string(), &stages, &ctx_at(1));

        alert.close(&stages, &ctx_at(2)).unwrap();
        assert_eq!(alert.stage, "solved");
    }

    #[test]
    fn test_moving_out_of_done_stage_clears_close_date() {
        let stages = StagePipeline::new(vec![
            AlertStage::new("new", "New", 1, false),
            AlertStage::new("solved", "Solved", 4, true),
            AlertStage::new("followup", "Follow-up", 5, false),
        ])
        .unwrap();
        let mut alert = QualityAlert::new("Dent".to_string(), &stages, &ctx_at(1));

        alert.close(&stages, &ctx_at(2)).unwrap();
        assert_eq!(alert.date_close, Some(ctx_at(2).now));

        alert.move_to_stage("followup", &stages, &ctx_at(3)).unwrap();
        assert_eq!(alert.stage, "followup");
        assert!(!alert.is_closed(&stages));
        assert!(alert.date_close.is_none());
        assert_eq!(alert.history.last().unwrap().to, "followup");
    }
}

//! Quality check - one inspection instance and its pass/fail state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::context::Context;
use crate::core::entity::Entity;
use crate::core::error::{QualityError, QualityResult};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::point::{CheckKind, QualityPoint, TestType};

/// Decision state of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum QualityState {
    #[default]
    None,
    Pass,
    Fail,
}

impl std::fmt::Display for QualityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityState::None => write!(f, "none"),
            QualityState::Pass => write!(f, "pass"),
            QualityState::Fail => write!(f, "fail"),
        }
    }
}

impl std::str::FromStr for QualityState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "todo" => Ok(QualityState::None),
            "pass" | "passed" => Ok(QualityState::Pass),
            "fail" | "failed" => Ok(QualityState::Fail),
            _ => Err(format!("Invalid quality state: {}. Use none, pass, or fail", s)),
        }
    }
}

/// Outcome computed from a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum MeasureSuccess {
    /// Not a measure test, or nothing measured yet
    #[default]
    None,
    Pass,
    Fail,
}

impl std::fmt::Display for MeasureSuccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasureSuccess::None => write!(f, "none"),
            MeasureSuccess::Pass => write!(f, "pass"),
            MeasureSuccess::Fail => write!(f, "fail"),
        }
    }
}

/// Capabilities every kind of check provides
pub trait QualityCheckable {
    fn test_type(&self) -> TestType;

    /// Verdict derived from a measurement, for kinds that compute one
    fn measure_success(&self, measure: Option<f64>) -> MeasureSuccess;

    /// Mandatory data a check must carry before it can pass
    fn ensure_passable(&self, check: &QualityCheck) -> QualityResult<()>;
}

impl QualityCheckable for CheckKind {
    fn test_type(&self) -> TestType {
        CheckKind::test_type(self)
    }

    fn measure_success(&self, measure: Option<f64>) -> MeasureSuccess {
        match (self, measure) {
            (CheckKind::Measure(norm), Some(value)) => {
                if norm.accepts(value) {
                    MeasureSuccess::Pass
                } else {
                    MeasureSuccess::Fail
                }
            }
            _ => MeasureSuccess::None,
        }
    }

    fn ensure_passable(&self, check: &QualityCheck) -> QualityResult<()> {
        match self {
            CheckKind::Picture if check.picture.is_none() => Err(QualityError::validation(format!(
                "check {} requires a picture before it can pass",
                check.display_ref()
            ))),
            _ => Ok(()),
        }
    }
}

/// Tracking entry written each time the state changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub from: QualityState,
    pub to: QualityState,
    pub by: String,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A quality check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCheck {
    /// Unique identifier
    pub id: EntityId,

    /// Sequence reference (e.g. "QC00012")
    #[serde(default)]
    pub reference: String,

    /// Check title
    pub title: String,

    /// Point this check was instantiated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<EntityId>,

    /// Product inspected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// Lot / serial number inspected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot: Option<String>,

    /// Operation (batch) reference, e.g. "WH/IN/00042"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Operation type, e.g. "receipts"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,

    /// Test to perform (inherited from the point)
    #[serde(default)]
    pub test: CheckKind,

    /// Decision state
    #[serde(default)]
    pub quality_state: QualityState,

    /// Measured value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure: Option<f64>,

    /// Picture attached as evidence (path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Operator instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Message shown on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,

    /// Free-form note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Ordering inside an operation batch (from the point)
    #[serde(default)]
    pub sequence: u32,

    /// When the decision was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_date: Option<DateTime<Utc>>,

    /// Who took the decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,

    /// Quality team in charge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// Alerts raised from this check (lookup only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<EntityId>,

    /// State change log
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<StateChange>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author
    pub author: String,
}

impl Entity for QualityCheck {
    const PREFIX: EntityPrefix = EntityPrefix::Qc;

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

impl QualityCheck {
    /// Create a manual check, not tied to any point
    pub fn new(title: String, test: CheckKind, ctx: &Context) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Qc),
            reference: String::new(),
            title,
            point: None,
            product: None,
            lot: None,
            operation: None,
            operation_type: None,
            test,
            quality_state: QualityState::None,
            measure: None,
            picture: None,
            instructions: None,
            failure_message: None,
            note: None,
            sequence: 0,
            control_date: None,
            responsible: None,
            team: None,
            company: ctx.company.clone(),
            alerts: Vec::new(),
            history: Vec::new(),
            created: ctx.now,
            author: ctx.user.clone(),
        }
    }

    /// Instantiate a check from a point
    ///
    /// Without an explicit test the point's test (and its norm) is inherited.
    pub fn from_point(point: &QualityPoint, test: Option<CheckKind>, ctx: &Context) -> Self {
        let mut check = Self::new(point.title.clone(), test.unwrap_or_else(|| point.test.clone()), ctx);
        check.point = Some(point.id.clone());
        check.product = point.product.clone();
        check.instructions = point.instructions.clone();
        check.failure_message = point.failure_message.clone();
        check.sequence = point.sequence;
        check.team = point.team.clone();
        if check.company.is_none() {
            check.company = point.company.clone();
        }
        check
    }

    /// Reference if assigned, otherwise the full ID
    pub fn display_ref(&self) -> String {
        if self.reference.is_empty() {
            self.id.to_string()
        } else {
            self.reference.clone()
        }
    }

    pub fn test_type(&self) -> TestType {
        self.test.test_type()
    }

    /// Computed outcome of the recorded measurement
    pub fn measure_success(&self) -> MeasureSuccess {
        self.test.measure_success(self.measure)
    }

    pub fn is_decided(&self) -> bool {
        self.quality_state != QualityState::None
    }

    /// Store a measurement for a measure check
    pub fn record_measure(&mut self, value: f64) -> QualityResult<MeasureSuccess> {
        if self.test_type() != TestType::Measure {
            return Err(QualityError::validation(format!(
                "check {} is a {} check; only measure checks take a measurement",
                self.display_ref(),
                self.test_type()
            )));
        }
        if !value.is_finite() {
            return Err(QualityError::validation("measurement must be a finite number"));
        }
        self.measure = Some(value);
        Ok(self.measure_success())
    }

    pub fn attach_picture(&mut self, path: impl Into<String>) {
        self.picture = Some(path.into());
    }

    fn set_state(&mut self, to: QualityState, ctx: &Context, note: Option<String>) {
        let from = self.quality_state;
        if from != to {
            self.history.push(StateChange {
                from,
                to,
                by: ctx.user.clone(),
                at: ctx.now,
                note,
            });
            tracing::info!(check = %self.display_ref(), %from, %to, user = %ctx.user, "quality state changed");
        }
        self.quality_state = to;
    }

    /// Mark the check as passed
    ///
    /// Re-entrant: passing again overwrites the control date and responsible.
    pub fn do_pass(&mut self, ctx: &Context) -> QualityResult<()> {
        self.test.ensure_passable(self)?;
        self.set_state(QualityState::Pass, ctx, None);
        self.control_date = Some(ctx.now);
        self.responsible = Some(ctx.user.clone());
        Ok(())
    }

    /// Mark the check as failed
    pub fn do_fail(&mut self, ctx: &Context) -> QualityResult<()> {
        self.set_state(QualityState::Fail, ctx, None);
        self.control_date = Some(ctx.now);
        self.responsible = Some(ctx.user.clone());
        Ok(())
    }

    /// Decide a measure check from its recorded measurement
    pub fn do_measure(&mut self, ctx: &Context) -> QualityResult<QualityState> {
        if self.test_type() != TestType::Measure {
            return Err(QualityError::validation(format!(
                "check {} is a {} check, not a measure check",
                self.display_ref(),
                self.test_type()
            )));
        }
        match self.measure_success() {
            MeasureSuccess::Pass => {
                self.do_pass(ctx)?;
                Ok(QualityState::Pass)
            }
            MeasureSuccess::Fail => {
                self.do_fail(ctx)?;
                Ok(QualityState::Fail)
            }
            MeasureSuccess::None => Err(QualityError::validation(format!(
                "check {} has no measurement recorded",
                self.display_ref()
            ))),
        }
    }

    /// Administrative override: put a decided check back to `none`
    pub fn reset(&mut self, ctx: &Context, reason: Option<String>) -> QualityResult<()> {
        if !ctx.admin {
            return Err(QualityError::AdminRequired("resetting a decided check"));
        }
        if !self.is_decided() {
            return Err(QualityError::AlreadyInState {
                check: self.display_ref(),
                state: self.quality_state,
            });
        }
        self.set_state(QualityState::None, ctx, reason);
        self.control_date = None;
        self.responsible = None;
        Ok(())
    }
}

//! Quality point - the template describing what to inspect and how often

use chrono::{DateTime, Duration, Months, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::error::{QualityError, QualityResult};
use crate::core::identity::{EntityId, EntityPrefix};

/// Kind of test a point asks for (without its parameters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    /// Read the instructions and confirm
    Instructions,
    /// Operator decides pass or fail
    PassFail,
    /// Numeric measurement compared against tolerances
    Measure,
    /// Picture must be taken before deciding
    Picture,
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestType::Instructions => write!(f, "instructions"),
            TestType::PassFail => write!(f, "pass_fail"),
            TestType::Measure => write!(f, "measure"),
            TestType::Picture => write!(f, "picture"),
        }
    }
}

impl std::str::FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "instructions" => Ok(TestType::Instructions),
            "pass_fail" | "passfail" => Ok(TestType::PassFail),
            "measure" => Ok(TestType::Measure),
            "picture" => Ok(TestType::Picture),
            _ => Err(format!(
                "Invalid test type: {}. Use instructions, pass_fail, measure, or picture",
                s
            )),
        }
    }
}

/// Measurement norm and tolerance band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureNorm {
    /// Target value
    pub norm: f64,

    /// Lowest acceptable value
    pub tolerance_min: f64,

    /// Highest acceptable value
    pub tolerance_max: f64,

    /// Unit of measure (e.g. "mm")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl MeasureNorm {
    pub fn new(norm: f64, tolerance_min: f64, tolerance_max: f64) -> Self {
        Self {
            norm,
            tolerance_min,
            tolerance_max,
            unit: None,
        }
    }

    /// Inclusive band check
    pub fn accepts(&self, value: f64) -> bool {
        !(value < self.tolerance_min || value > self.tolerance_max)
    }

    pub fn validate(&self) -> QualityResult<()> {
        if !(self.norm.is_finite() && self.tolerance_min.is_finite() && self.tolerance_max.is_finite())
        {
            return Err(QualityError::validation("measure norm and tolerances must be finite numbers"));
        }
        if self.tolerance_min > self.tolerance_max {
            return Err(QualityError::validation(format!(
                "tolerance_min ({}) is greater than tolerance_max ({})",
                self.tolerance_min, self.tolerance_max
            )));
        }
        if self.norm < self.tolerance_min || self.norm > self.tolerance_max {
            return Err(QualityError::validation(format!(
                "norm {} lies outside the tolerance band [{}, {}]",
                self.norm, self.tolerance_min, self.tolerance_max
            )));
        }
        Ok(())
    }
}

/// The test a point performs, tagged by type
///
/// Only measure tests carry a norm, so a point can never hold two test
/// types or a measure without tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckKind {
    Instructions,
    PassFail,
    Measure(MeasureNorm),
    Picture,
}

impl Default for CheckKind {
    fn default() -> Self {
        CheckKind::PassFail
    }
}

impl CheckKind {
    pub fn test_type(&self) -> TestType {
        match self {
            CheckKind::Instructions => TestType::Instructions,
            CheckKind::PassFail => TestType::PassFail,
            CheckKind::Measure(_) => TestType::Measure,
            CheckKind::Picture => TestType::Picture,
        }
    }

    pub fn norm(&self) -> Option<&MeasureNorm> {
        match self {
            CheckKind::Measure(norm) => Some(norm),
            _ => None,
        }
    }

    /// Build a kind from a bare test type; measure needs its norm
    pub fn from_test_type(test_type: TestType, norm: Option<MeasureNorm>) -> QualityResult<Self> {
        match test_type {
            TestType::Instructions => Ok(CheckKind::Instructions),
            TestType::PassFail => Ok(CheckKind::PassFail),
            TestType::Picture => Ok(CheckKind::Picture),
            TestType::Measure => norm.map(CheckKind::Measure).ok_or_else(|| {
                QualityError::validation(
                    "measure tests require a norm and tolerances (--norm, --min, --max)",
                )
            }),
        }
    }
}

/// Unit of a periodical frequency window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
}

impl std::fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodUnit::Day => write!(f, "day"),
            PeriodUnit::Week => write!(f, "week"),
            PeriodUnit::Month => write!(f, "month"),
        }
    }
}

impl std::str::FromStr for PeriodUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_end_matches('s') {
            "day" => Ok(PeriodUnit::Day),
            "week" => Ok(PeriodUnit::Week),
            "month" => Ok(PeriodUnit::Month),
            _ => Err(format!("Invalid period unit: {}. Use day, week, or month", s)),
        }
    }
}

/// How often a point instantiates checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Frequency {
    /// Every matching operation
    All,
    /// A percentage of matching operations
    Random { percent: f64 },
    /// At most once per rolling window
    Periodical { interval: u32, unit: PeriodUnit },
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::All
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::All => write!(f, "all"),
            Frequency::Random { percent } => write!(f, "random {}%", percent),
            Frequency::Periodical { interval, unit } => {
                write!(f, "every {} {}(s)", interval, unit)
            }
        }
    }
}

impl Frequency {
    /// Build a policy from flat command line or CSV fields
    pub fn from_parts(
        policy: &str,
        percent: Option<f64>,
        interval: Option<u32>,
        unit: Option<PeriodUnit>,
    ) -> QualityResult<Self> {
        let frequency = match policy.trim().to_lowercase().as_str() {
            "" | "all" => Frequency::All,
            "random" => Frequency::Random {
                percent: percent
                    .ok_or_else(|| QualityError::validation("random frequency requires a percent"))?,
            },
            "periodical" | "periodic" => Frequency::Periodical {
                interval: interval.unwrap_or(1),
                unit: unit.ok_or_else(|| {
                    QualityError::validation("periodical frequency requires a unit (day, week, month)")
                })?,
            },
            other => {
                return Err(QualityError::validation(format!(
                    "Invalid frequency: {}. Use all, random, or periodical",
                    other
                )))
            }
        };
        frequency.validate()?;
        Ok(frequency)
    }

    pub fn validate(&self) -> QualityResult<()> {
        match self {
            Frequency::All => Ok(()),
            Frequency::Random { percent } => {
                if !(0.0..=100.0).contains(percent) {
                    return Err(QualityError::validation(format!(
                        "random frequency percent must be between 0 and 100 (got {})",
                        percent
                    )));
                }
                Ok(())
            }
            Frequency::Periodical { interval, .. } => {
                if *interval == 0 {
                    return Err(QualityError::validation(
                        "periodical frequency interval must be at least 1",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Start of the rolling window ending at `now`
    fn window_start(interval: u32, unit: PeriodUnit, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match unit {
            PeriodUnit::Day => now.checked_sub_signed(Duration::days(i64::from(interval))),
            PeriodUnit::Week => now.checked_sub_signed(Duration::weeks(i64::from(interval))),
            PeriodUnit::Month => now.checked_sub_months(Months::new(interval)),
        }
    }

    /// Decide whether a matching operation should get a check now
    ///
    /// `last_check` is the creation time of the most recent check of the
    /// point, if any.
    pub fn should_execute_now<R: Rng>(
        &self,
        last_check: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> bool {
        match self {
            Frequency::All => true,
            Frequency::Random { percent } => rng.random::<f64>() * 100.0 < *percent,
            Frequency::Periodical { interval, unit } => {
                let Some(last) = last_check else {
                    return true;
                };
                match Self::window_start(*interval, *unit, now) {
                    Some(start) => last < start,
                    None => false,
                }
            }
        }
    }
}

/// Links to other records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointLinks {
    /// Alerts raised against checks of this point
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<EntityId>,
}

/// A quality control point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityPoint {
    /// Unique identifier
    pub id: EntityId,

    /// Sequence reference (e.g. "QCP00003")
    #[serde(default)]
    pub reference: String,

    /// Point title
    pub title: String,

    /// Product the point applies to (none = every product)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// Operation types the point applies to (empty = every operation)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operation_types: Vec<String>,

    /// Test to perform
    #[serde(default)]
    pub test: CheckKind,

    /// Frequency policy
    #[serde(default)]
    pub frequency: Frequency,

    /// Instructions shown to the operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Message shown when the check fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,

    /// Quality team in charge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    /// Ordering among points of the same operation
    #[serde(default = "default_sequence")]
    pub sequence: u32,

    /// Archived points stop generating checks
    #[serde(default = "default_active")]
    pub active: bool,

    /// Company owning the point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// Tags for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub links: PointLinks,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (quality engineer)
    pub author: String,
}

fn default_sequence() -> u32 {
    10
}

fn default_active() -> bool {
    true
}

impl Entity for QualityPoint {
    const PREFIX: EntityPrefix = EntityPrefix::Qcp;

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

impl QualityPoint {
    /// Create a new point with the given test
    pub fn new(title: String, test: CheckKind, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Qcp),
            reference: String::new(),
            title,
            product: None,
            operation_types: Vec::new(),
            test,
            frequency: Frequency::default(),
            instructions: None,
            failure_message: None,
            team: None,
            sequence: default_sequence(),
            active: true,
            company: None,
            tags: Vec::new(),
            links: PointLinks::default(),
            created: Utc::now(),
            author,
        }
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

    /// Check the point's invariants
    pub fn validate(&self) -> QualityResult<()> {
        if self.title.trim().is_empty() {
            return Err(QualityError::validation("quality point title is required"));
        }
        if let CheckKind::Measure(norm) = &self.test {
            norm.validate()?;
        }
        self.frequency.validate()
    }

    /// Whether this point covers a product handled by an operation type
    pub fn applies_to(&self, product: &str, operation_type: Option<&str>) -> bool {
        let product_ok = self.product.as_deref().map_or(true, |p| p == product);
        let operation_ok = self.operation_types.is_empty()
            || operation_type.is_some_and(|op| self.operation_types.iter().any(|t| t == op));
        product_ok && operation_ok
    }

    /// Frequency decision for this point
    pub fn should_execute_now<R: Rng>(
        &self,
        last_check: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> bool {
        self.active && self.frequency.should_execute_now(last_check, now, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn periodical(interval: u32, unit: PeriodUnit) -> Frequency {
        Frequency::Periodical { interval, unit }
    }

    #[test]
    fn test_all_always_executes() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(Frequency::All.should_execute_now(Some(at(2024, 1, 1)), at(2024, 1, 1), &mut rng));
        }
    }

    #[test]
    fn test_random_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let never = Frequency::Random { percent: 0.0 };
        let always = Frequency::Random { percent: 100.0 };
        for _ in 0..200 {
            assert!(!never.should_execute_now(None, at(2024, 1, 1), &mut rng));
            assert!(always.should_execute_now(None, at(2024, 1, 1), &mut rng));
        }
    }

    #[test]
    fn test_random_rate_is_roughly_percent() {
        let mut rng = StdRng::seed_from_u64(1234);
        let freq = Frequency::Random { percent: 30.0 };
        let hits = (0..10_000)
            .filter(|_| freq.should_execute_now(None, at(2024, 1, 1), &mut rng))
            .count();
        assert!((2500..3500).contains(&hits), "got {} hits", hits);
    }

    #[test]
    fn test_periodical_bootstraps_without_prior_check() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(periodical(1, PeriodUnit::Month).should_execute_now(None, at(2024, 3, 1), &mut rng));
    }

    #[test]
    fn test_periodical_days_window() {
        let mut rng = StdRng::seed_from_u64(0);
        let freq = periodical(3, PeriodUnit::Day);
        let last = at(2024, 3, 10);

        assert!(!freq.should_execute_now(Some(last), at(2024, 3, 11), &mut rng));
        // A check exactly at the window start still counts as inside it
        assert!(!freq.should_execute_now(Some(last), at(2024, 3, 13), &mut rng));
        assert!(freq.should_execute_now(Some(last), at(2024, 3, 14), &mut rng));
    }

    #[test]
    fn test_periodical_weeks_window() {
        let mut rng = StdRng::seed_from_u64(0);
        let freq = periodical(2, PeriodUnit::Week);
        let last = at(2024, 3, 1);

        assert!(!freq.should_execute_now(Some(last), at(2024, 3, 10), &mut rng));
        assert!(freq.should_execute_now(Some(last), at(2024, 3, 16), &mut rng));
    }

    #[test]
    fn test_periodical_months_use_calendar_months() {
        let mut rng = StdRng::seed_from_u64(0);
        let freq = periodical(1, PeriodUnit::Month);
        let last = at(2024, 1, 31);

        // One calendar month before 2024-02-29 is 2024-01-29
        assert!(!freq.should_execute_now(Some(last), at(2024, 2, 29), &mut rng));
        assert!(freq.should_execute_now(Some(last), at(2024, 3, 31), &mut rng));
    }

    #[test]
    fn test_archived_point_never_executes() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut point = QualityPoint::new("Visual".to_string(), CheckKind::PassFail, "qa".to_string());
        point.active = false;
        assert!(!point.should_execute_now(None, at(2024, 1, 1), &mut rng));
    }

    #[test]
    fn test_measure_norm_validation() {
        assert!(MeasureNorm::new(10.0, 9.5, 10.5).validate().is_ok());
        assert!(MeasureNorm::new(10.0, 10.5, 9.5).validate().is_err());
        assert!(MeasureNorm::new(12.0, 9.5, 10.5).validate().is_err());
        assert!(MeasureNorm::new(f64::NAN, 9.5, 10.5).validate().is_err());
    }

    #[test]
    fn test_measure_norm_band_is_inclusive() {
        let norm = MeasureNorm::new(10.0, 9.5, 10.5);
        assert!(norm.accepts(9.5));
        assert!(norm.accepts(10.5));
        assert!(!norm.accepts(9.49));
        assert!(!norm.accepts(10.51));
    }

    #[test]
    fn test_frequency_validation() {
        assert!(Frequency::Random { percent: 101.0 }.validate().is_err());
        assert!(Frequency::Random { percent: -1.0 }.validate().is_err());
        assert!(periodical(0, PeriodUnit::Day).validate().is_err());
        assert!(periodical(2, PeriodUnit::Week).validate().is_ok());
    }

    #[test]
    fn test_applies_to() {
        let mut point = QualityPoint::new("Bore".to_string(), CheckKind::PassFail, "qa".to_string());
        assert!(point.applies_to("P1", None));

        point.product = Some("P1".to_string());
        point.operation_types = vec!["receipts".to_string()];
        assert!(point.applies_to("P1", Some("receipts")));
        assert!(!point.applies_to("P1", Some("delivery")));
        assert!(!point.applies_to("P1", None));
        assert!(!point.applies_to("P2", Some("receipts")));
    }

    #[test]
    fn test_measure_kind_requires_norm() {
        assert!(CheckKind::from_test_type(TestType::Measure, None).is_err());
        let kind =
            CheckKind::from_test_type(TestType::Measure, Some(MeasureNorm::new(1.0, 0.0, 2.0)))
                .unwrap();
        assert_eq!(kind.test_type(), TestType::Measure);
        assert_eq!(kind.norm().unwrap().norm, 1.0);
    }

    #[test]
    fn test_frequency_from_parts() {
        assert_eq!(Frequency::from_parts("", None, None, None).unwrap(), Frequency::All);
        assert_eq!(
            Frequency::from_parts("Random", Some(25.0), None, None).unwrap(),
            Frequency::Random { percent: 25.0 }
        );
        assert_eq!(
            Frequency::from_parts("periodical", None, Some(2), Some(PeriodUnit::Month)).unwrap(),
            periodical(2, PeriodUnit::Month)
        );
        assert!(Frequency::from_parts("random", None, None, None).is_err());
        assert!(Frequency::from_parts("random", Some(150.0), None, None).is_err());
        assert!(Frequency::from_parts("periodical", None, Some(0), Some(PeriodUnit::Day)).is_err());
        assert!(Frequency::from_parts("hourly", None, None, None).is_err());
    }

    #[test]
    fn test_point_yaml_shape() {
        let mut point = QualityPoint::new(
            "Shaft diameter".to_string(),
            CheckKind::Measure(MeasureNorm::new(10.0, 9.9, 10.1)),
            "qa".to_string(),
        );
        point.frequency = periodical(1, PeriodUnit::Week);

        let yaml = serde_yml::to_string(&point).unwrap();
        assert!(yaml.contains("type: measure"));
        assert!(yaml.contains("policy: periodical"));

        let parsed: QualityPoint = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.test, point.test);
        assert_eq!(parsed.frequency, point.frequency);
    }
}

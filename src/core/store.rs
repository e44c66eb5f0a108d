//! Quality record store - indexed in-memory collections backed by YAML files
//!
//! A command opens the store, mutates records through the service, then
//! commits. Only records touched since opening are written, so a failed
//! operation that returns before `commit` leaves the project untouched.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use crate::core::error::{QualityError, QualityResult};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::loader::{load_all, save_record};
use crate::core::project::Project;
use crate::core::sequence::Sequences;
use crate::entities::alert::QualityAlert;
use crate::entities::check::QualityCheck;
use crate::entities::point::QualityPoint;
use crate::entities::stage::StagePipeline;

/// All quality records of a project
#[derive(Debug, Default)]
pub struct QualityStore {
    project: Option<Project>,
    points: BTreeMap<EntityId, QualityPoint>,
    checks: BTreeMap<EntityId, QualityCheck>,
    alerts: BTreeMap<EntityId, QualityAlert>,
    stages: StagePipeline,
    sequences: Sequences,
    dirty: BTreeSet<EntityId>,
    removed: BTreeSet<EntityId>,
    sequences_dirty: bool,
}

impl QualityStore {
    /// A store with no backing project (tests, dry runs)
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load every record of a project
    pub fn open(project: &Project) -> QualityResult<Self> {
        let stages = Self::load_stages(project)?;
        let sequences = Sequences::load(project)?;

        let points = load_all::<QualityPoint>(project)?
            .into_iter()
            .map(|(_, p)| (p.id.clone(), p))
            .collect();
        let checks = load_all::<QualityCheck>(project)?
            .into_iter()
            .map(|(_, c)| (c.id.clone(), c))
            .collect();
        let alerts = load_all::<QualityAlert>(project)?
            .into_iter()
            .map(|(_, a)| (a.id.clone(), a))
            .collect();

        Ok(Self {
            project: Some(project.clone()),
            points,
            checks,
            alerts,
            stages,
            sequences,
            ..Self::default()
        })
    }

    /// Read `.qct/stages.yaml`, or the default pipeline when absent
    pub fn load_stages(project: &Project) -> QualityResult<StagePipeline> {
        let path = project.stages_path();
        if !path.exists() {
            return Ok(StagePipeline::default());
        }
        let content = fs::read_to_string(&path)?;
        let pipeline: StagePipeline =
            serde_yml::from_str(&content).map_err(|e| QualityError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        StagePipeline::new(pipeline.stages)
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn stages(&self) -> &StagePipeline {
        &self.stages
    }

    // =====================================================================
    // Lookups
    // =====================================================================

    pub fn point(&self, id: &EntityId) -> Option<&QualityPoint> {
        self.points.get(id)
    }

    pub fn check(&self, id: &EntityId) -> Option<&QualityCheck> {
        self.checks.get(id)
    }

    pub fn alert(&self, id: &EntityId) -> Option<&QualityAlert> {
        self.alerts.get(id)
    }

    pub fn points(&self) -> impl Iterator<Item = &QualityPoint> {
        self.points.values()
    }

    pub fn checks(&self) -> impl Iterator<Item = &QualityCheck> {
        self.checks.values()
    }

    pub fn alerts(&self) -> impl Iterator<Item = &QualityAlert> {
        self.alerts.values()
    }

    pub fn point_mut(&mut self, id: &EntityId) -> QualityResult<&mut QualityPoint> {
        let point = self.points.get_mut(id).ok_or_else(|| not_found(id))?;
        self.dirty.insert(id.clone());
        Ok(point)
    }

    pub fn check_mut(&mut self, id: &EntityId) -> QualityResult<&mut QualityCheck> {
        let check = self.checks.get_mut(id).ok_or_else(|| not_found(id))?;
        self.dirty.insert(id.clone());
        Ok(check)
    }

    pub fn alert_mut(&mut self, id: &EntityId) -> QualityResult<&mut QualityAlert> {
        let alert = self.alerts.get_mut(id).ok_or_else(|| not_found(id))?;
        self.dirty.insert(id.clone());
        Ok(alert)
    }

    /// Resolve a user reference to a record ID
    ///
    /// Accepts a full ID, a sequence reference (`QC00012`, case-insensitive)
    /// or a unique ID prefix.
    pub fn resolve(&self, prefix: EntityPrefix, reference: &str) -> QualityResult<EntityId> {
        let reference = reference.trim();
        let candidates: Vec<(&EntityId, &str)> = match prefix {
            EntityPrefix::Qcp => self.points.values().map(|p| (&p.id, p.reference.as_str())).collect(),
            EntityPrefix::Qc => self.checks.values().map(|c| (&c.id, c.reference.as_str())).collect(),
            EntityPrefix::Qa => self.alerts.values().map(|a| (&a.id, a.reference.as_str())).collect(),
        };

        if let Some((id, _)) = candidates.iter().find(|(id, seq_ref)| {
            id.to_string() == reference || (!seq_ref.is_empty() && seq_ref.eq_ignore_ascii_case(reference))
        }) {
            return Ok((*id).clone());
        }

        let upper = reference.to_uppercase();
        let matches: Vec<&EntityId> = candidates
            .iter()
            .filter(|(id, _)| !upper.is_empty() && id.to_string().starts_with(&upper))
            .map(|(id, _)| *id)
            .collect();

        match matches.as_slice() {
            [id] => Ok((*id).clone()),
            [] => Err(QualityError::NotFound {
                kind: prefix.label(),
                reference: reference.to_string(),
            }),
            many => Err(QualityError::validation(format!(
                "'{}' matches {} {}s; use a longer ID",
                reference,
                many.len(),
                prefix.label()
            ))),
        }
    }

    // =====================================================================
    // Inserts & removal
    // =====================================================================

    pub fn insert_point(&mut self, mut point: QualityPoint) -> QualityResult<EntityId> {
        point.validate()?;
        if point.reference.is_empty() {
            point.reference = self.next_reference(EntityPrefix::Qcp);
        }
        let id = point.id.clone();
        self.dirty.insert(id.clone());
        self.points.insert(id.clone(), point);
        Ok(id)
    }

    pub fn insert_check(&mut self, mut check: QualityCheck) -> QualityResult<EntityId> {
        if check.title.trim().is_empty() {
            return Err(QualityError::validation("quality check title is required"));
        }
        if let Some(point) = &check.point {
            if !self.points.contains_key(point) {
                return Err(not_found(point));
            }
        }
        if check.reference.is_empty() {
            check.reference = self.next_reference(EntityPrefix::Qc);
        }
        let id = check.id.clone();
        self.dirty.insert(id.clone());
        self.checks.insert(id.clone(), check);
        Ok(id)
    }

    pub fn insert_alert(&mut self, mut alert: QualityAlert) -> QualityResult<EntityId> {
        if alert.title.trim().is_empty() {
            return Err(QualityError::validation("quality alert title is required"));
        }
        if self.stages.get(&alert.stage).is_none() {
            return Err(QualityError::UnknownStage(alert.stage.clone()));
        }
        if alert.reference.is_empty() {
            alert.reference = self.next_reference(EntityPrefix::Qa);
        }
        let id = alert.id.clone();
        self.dirty.insert(id.clone());
        self.alerts.insert(id.clone(), alert);
        Ok(id)
    }

    /// Hard-delete a point that no check references
    pub fn remove_point(&mut self, id: &EntityId) -> QualityResult<QualityPoint> {
        let count = self.checks_for_point(id).count();
        if count > 0 {
            return Err(QualityError::Referenced {
                point: self
                    .points
                    .get(id)
                    .map(|p| p.reference.clone())
                    .unwrap_or_else(|| id.to_string()),
                count,
            });
        }
        let point = self.points.remove(id).ok_or_else(|| not_found(id))?;
        self.dirty.remove(id);
        self.removed.insert(id.clone());
        Ok(point)
    }

    fn next_reference(&mut self, prefix: EntityPrefix) -> String {
        self.sequences_dirty = true;
        self.sequences.next(prefix)
    }

    // =====================================================================
    // Queries
    // =====================================================================

    pub fn checks_for_point<'a>(
        &'a self,
        point: &'a EntityId,
    ) -> impl Iterator<Item = &'a QualityCheck> + 'a {
        self.checks
            .values()
            .filter(move |c| c.point.as_ref() == Some(point))
    }

    /// Creation time of the most recent check of a point
    pub fn last_check_created(&self, point: &EntityId) -> Option<DateTime<Utc>> {
        self.checks_for_point(point).map(|c| c.created).max()
    }

    /// Checks belonging to an operation batch, in inspection order
    pub fn batch(&self, operation: &str) -> Vec<&QualityCheck> {
        let mut checks: Vec<&QualityCheck> = self
            .checks
            .values()
            .filter(|c| c.operation.as_deref() == Some(operation))
            .collect();
        checks.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then(a.created.cmp(&b.created))
                .then(a.reference.cmp(&b.reference))
        });
        checks
    }

    // =====================================================================
    // Persistence
    // =====================================================================

    /// Records changed since the store was opened
    pub fn pending_changes(&self) -> usize {
        self.dirty.len() + self.removed.len()
    }

    /// Write every changed record back to the project
    pub fn commit(&mut self) -> QualityResult<()> {
        let Some(project) = self.project.clone() else {
            self.dirty.clear();
            self.removed.clear();
            return Ok(());
        };

        for id in &self.dirty {
            match id.prefix() {
                EntityPrefix::Qcp => {
                    if let Some(point) = self.points.get(id) {
                        save_record(&project, point)?;
                    }
                }
                EntityPrefix::Qc => {
                    if let Some(check) = self.checks.get(id) {
                        save_record(&project, check)?;
                    }
                }
                EntityPrefix::Qa => {
                    if let Some(alert) = self.alerts.get(id) {
                        save_record(&project, alert)?;
                    }
                }
            }
        }

        for id in &self.removed {
            let path = project.entity_path(id);
            if path.exists() {
                fs::remove_file(&path)?;
                tracing::info!(%id, "deleted record");
            }
        }

        if self.sequences_dirty {
            self.sequences.save(&project)?;
        }

        tracing::debug!(written = self.dirty.len(), removed = self.removed.len(), "store committed");
        self.dirty.clear();
        self.removed.clear();
        self.sequences_dirty = false;
        Ok(())
    }
}

fn not_found(id: &EntityId) -> QualityError {
    QualityError::NotFound {
        kind: id.prefix().label(),
        reference: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Context;
    use crate::entities::point::CheckKind;
    use tempfile::tempdir;

    fn point(title: &str) -> QualityPoint {
        QualityPoint::new(title.to_string(), CheckKind::PassFail, "qe".to_string())
    }

    #[test]
    fn test_insert_assigns_references() {
        let mut store = QualityStore::in_memory();
        let p1 = store.insert_point(point("A")).unwrap();
        let p2 = store.insert_point(point("B")).unwrap();

        assert_eq!(store.point(&p1).unwrap().reference, "QCP00001");
        assert_eq!(store.point(&p2).unwrap().reference, "QCP00002");
    }

    #[test]
    fn test_insert_rejects_invalid_point() {
        let mut store = QualityStore::in_memory();
        assert!(store.insert_point(point("  ")).is_err());
        assert_eq!(store.points().count(), 0);
    }

    #[test]
    fn test_insert_check_requires_known_point() {
        let mut store = QualityStore::in_memory();
        let orphan_point = point("Ghost");
        let check = QualityCheck::from_point(&orphan_point, None, &Context::new("op"));
        assert!(matches!(
            store.insert_check(check),
            Err(QualityError::NotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_by_reference_and_prefix() {
        let mut store = QualityStore::in_memory();
        let id = store.insert_point(point("A")).unwrap();

        assert_eq!(store.resolve(EntityPrefix::Qcp, "qcp00001").unwrap(), id);
        assert_eq!(store.resolve(EntityPrefix::Qcp, &id.to_string()).unwrap(), id);
        assert_eq!(
            store.resolve(EntityPrefix::Qcp, &id.to_string()[..12]).unwrap(),
            id
        );
        assert!(matches!(
            store.resolve(EntityPrefix::Qcp, "QCP00009"),
            Err(QualityError::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_point_refused_while_referenced() {
        let mut store = QualityStore::in_memory();
        let id = store.insert_point(point("A")).unwrap();
        let check = QualityCheck::from_point(store.point(&id).unwrap(), None, &Context::new("op"));
        store.insert_check(check).unwrap();

        assert!(matches!(
            store.remove_point(&id),
            Err(QualityError::Referenced { count: 1, .. })
        ));
        assert!(store.point(&id).is_some());
    }

    #[test]
    fn test_commit_roundtrip() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        let mut store = QualityStore::open(&project).unwrap();
        let id = store.insert_point(point("Persisted")).unwrap();
        assert_eq!(store.pending_changes(), 1);
        store.commit().unwrap();
        assert_eq!(store.pending_changes(), 0);

        let reopened = QualityStore::open(&project).unwrap();
        assert_eq!(reopened.point(&id).unwrap().title, "Persisted");
        assert_eq!(reopened.point(&id).unwrap().reference, "QCP00001");
    }

    #[test]
    fn test_uncommitted_changes_are_not_written() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        {
            let mut store = QualityStore::open(&project).unwrap();
            store.insert_point(point("Dropped")).unwrap();
        }

        let reopened = QualityStore::open(&project).unwrap();
        assert_eq!(reopened.points().count(), 0);
    }

    #[test]
    fn test_remove_point_deletes_file() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        let mut store = QualityStore::open(&project).unwrap();
        let id = store.insert_point(point("Temp")).unwrap();
        store.commit().unwrap();
        assert!(project.entity_path(&id).exists());

        store.remove_point(&id).unwrap();
        store.commit().unwrap();
        assert!(!project.entity_path(&id).exists());
    }

    #[test]
    fn test_last_check_created_picks_latest() {
        use chrono::TimeZone;

        let mut store = QualityStore::in_memory();
        let id = store.insert_point(point("A")).unwrap();
        for day in [3, 9, 5] {
            let ctx = Context::new("op").at(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap());
            let check = QualityCheck::from_point(store.point(&id).unwrap(), None, &ctx);
            store.insert_check(check).unwrap();
        }

        assert_eq!(
            store.last_check_created(&id),
            Some(Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap())
        );
    }
}

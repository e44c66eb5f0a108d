//! Navigation directives returned by check and alert operations

use crate::core::identity::EntityId;

/// What the caller should show after an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing left to do in this batch
    Close,

    /// Continue with another check
    OpenCheck(EntityId),

    /// Show a single alert
    OpenAlert(EntityId),

    /// Show a list of alerts (zero or several)
    ListAlerts(Vec<EntityId>),
}

impl Action {
    /// Directive for a set of alerts: open it directly when there is only one
    pub fn for_alerts(mut alerts: Vec<EntityId>) -> Self {
        if alerts.len() == 1 {
            Action::OpenAlert(alerts.remove(0))
        } else {
            Action::ListAlerts(alerts)
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Close => write!(f, "close"),
            Action::OpenCheck(id) => write!(f, "open check {}", id),
            Action::OpenAlert(id) => write!(f, "open alert {}", id),
            Action::ListAlerts(ids) => write!(f, "list {} alert(s)", ids.len()),
        }
    }
}

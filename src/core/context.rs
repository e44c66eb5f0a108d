//! Request-scoped context passed to every quality operation

use chrono::{DateTime, Utc};

use crate::core::config::Config;

/// Who is acting, for which company, and when
///
/// Built once per command and threaded explicitly through the service so
/// operations never reach for ambient state.
#[derive(Debug, Clone)]
pub struct Context {
    /// Acting user, stamped as `responsible` / `author`
    pub user: String,

    /// Company the action is performed for
    pub company: Option<String>,

    /// Timestamp of the action
    pub now: DateTime<Utc>,

    /// Whether the user may perform administrative overrides
    pub admin: bool,
}

impl Context {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            company: None,
            now: Utc::now(),
            admin: false,
        }
    }

    /// Build a context from the layered configuration
    pub fn from_config(config: &Config) -> Self {
        let user = config.user();
        let admin = config.admins.iter().any(|a| a == &user);
        Self {
            user,
            company: config.company.clone(),
            now: Utc::now(),
            admin,
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn as_admin(mut self) -> Self {
        self.admin = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_config_grants_admin() {
        let config = Config {
            user: Some("alice".to_string()),
            admins: vec!["alice".to_string()],
            company: Some("ACME".to_string()),
            ..Config::default()
        };

        let ctx = Context::from_config(&config);
        assert_eq!(ctx.user, "alice");
        assert_eq!(ctx.company.as_deref(), Some("ACME"));
        assert!(ctx.admin);
    }

    #[test]
    fn test_context_from_config_without_admin() {
        let config = Config {
            user: Some("bob".to_string()),
            admins: vec!["alice".to_string()],
            ..Config::default()
        };

        assert!(!Context::from_config(&config).admin);
    }
}

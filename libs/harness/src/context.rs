//! Immutable test context.
//!
//! A scenario owns one [`TestContext`] and never mutates it. Switching user
//! or target produces a new value, which is then handed to the collaborator
//! calls that need it.

use std::path::PathBuf;

use crate::config::HarnessConfig;

/// Which set of credentials a context acts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Regular,
}

/// Credentials and target of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub username: String,
    pub password: String,
    pub org: Option<String>,
    pub space: Option<String>,
    pub role: Role,
}

impl UserContext {
    /// Per-user client home directory, so concurrent users never share
    /// client-side login state.
    pub fn home_dir(&self) -> PathBuf {
        std::env::temp_dir().join(format!("pat-home-{}", self.username))
    }
}

/// Everything a collaborator call needs to know about who it acts as and
/// where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    api_url: String,
    apps_domain: String,
    skip_ssl_validation: bool,
    active: UserContext,
    other: UserContext,
}

impl TestContext {
    /// Regular-user context built from configuration.
    pub fn from_config(config: &HarnessConfig) -> Self {
        let regular = UserContext {
            username: config.user.clone(),
            password: config.password.clone(),
            org: config.org.clone(),
            space: config.space.clone(),
            role: Role::Regular,
        };
        let admin = UserContext {
            username: config.admin_user.clone(),
            password: config.admin_password.clone(),
            org: config.org.clone(),
            space: config.space.clone(),
            role: Role::Admin,
        };
        Self {
            api_url: config.api_url.clone(),
            apps_domain: config.apps_domain.clone(),
            skip_ssl_validation: config.skip_ssl_validation,
            active: regular,
            other: admin,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn apps_domain(&self) -> &str {
        &self.apps_domain
    }

    pub fn skip_ssl_validation(&self) -> bool {
        self.skip_ssl_validation
    }

    /// The user this context acts as.
    pub fn user(&self) -> &UserContext {
        &self.active
    }

    pub fn is_admin(&self) -> bool {
        self.active.role == Role::Admin
    }

    /// Same context acting as the admin user.
    pub fn as_admin(&self) -> Self {
        self.acting_as(Role::Admin)
    }

    /// Same context acting as the regular user.
    pub fn as_regular(&self) -> Self {
        self.acting_as(Role::Regular)
    }

    fn acting_as(&self, role: Role) -> Self {
        let mut next = self.clone();
        if next.active.role != role {
            std::mem::swap(&mut next.active, &mut next.other);
        }
        next
    }

    /// Same context targeting `org` for both users.
    pub fn with_org(&self, org: impl Into<String>) -> Self {
        let org = org.into();
        let mut next = self.clone();
        next.active.org = Some(org.clone());
        next.other.org = Some(org);
        next
    }

    /// Same context targeting `space` for both users.
    pub fn with_space(&self, space: impl Into<String>) -> Self {
        let space = space.into();
        let mut next = self.clone();
        next.active.space = Some(space.clone());
        next.other.space = Some(space);
        next
    }

    /// Host name of a route on the apps domain.
    pub fn route_host(&self, host: &str) -> String {
        format!("{}.{}", host, self.apps_domain)
    }

    /// Environment passed to every command invocation.
    pub fn command_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (
                "CF_HOME".to_string(),
                self.active.home_dir().display().to_string(),
            ),
            ("CF_COLOR".to_string(), "false".to_string()),
            ("PAT_API_URL".to_string(), self.api_url.clone()),
            ("PAT_USER".to_string(), self.active.username.clone()),
        ];
        if let Some(org) = &self.active.org {
            env.push(("PAT_ORG".to_string(), org.clone()));
        }
        if let Some(space) = &self.active.space {
            env.push(("PAT_SPACE".to_string(), space.clone()));
        }
        env
    }
}

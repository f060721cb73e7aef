//! Core domain and configuration types
//!
//! Configuration structs are defined here; defaults, file loading, and
//! validation live in `config.rs`.

use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Role carried by an access token and used for route authorization
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Learner taking courses and assessments
    Student,
    /// Course and assessment author
    Teacher,
    /// Institution account managing cohorts
    Institution,
    /// Signed in but onboarding not finished; no role assigned yet
    Unassigned,
}

impl Role {
    /// Roles a finished account can hold (everything but `Unassigned`)
    pub const ASSIGNABLE: [Role; 3] = [Role::Student, Role::Teacher, Role::Institution];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Teacher => write!(f, "teacher"),
            Role::Institution => write!(f, "institution"),
            Role::Unassigned => write!(f, "unassigned"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "institution" => Ok(Role::Institution),
            "unassigned" => Ok(Role::Unassigned),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Static classification of a URL pattern
///
/// Declared as configuration and matched by path prefix; never derived
/// at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Reachable by anyone
    Public,
    /// Must NOT be signed in (login and sign-up pages)
    AuthOnly,
    /// Requires a session whose role matches
    RoleRestricted(Role),
    /// Signed in but onboarding incomplete
    FirstLoginOnly,
}

/// One route classification rule: longest matching prefix wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    pub prefix: String,
    pub class: RouteClass,
}

/// Redirect targets for each assignable role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleHomes {
    pub student: String,
    pub teacher: String,
    pub institution: String,
}

impl RoleHomes {
    /// Home path for a finished account; `Unassigned` has no home
    pub fn home_for(&self, role: Role) -> Option<&str> {
        match role {
            Role::Student => Some(&self.student),
            Role::Teacher => Some(&self.teacher),
            Role::Institution => Some(&self.institution),
            Role::Unassigned => None,
        }
    }
}

/// Route authorization configuration, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Where anonymous users are sent for guarded routes
    pub login_path: String,
    /// Where first-login sessions are sent to finish onboarding
    pub first_login_path: String,
    /// Requests under this prefix get JSON errors instead of redirects
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    pub role_homes: RoleHomes,
    /// Path prefix classification rules
    pub rules: Vec<RouteRule>,
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

/// Token and refresh-endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Issuer endpoint for exchanging a refresh token for a new access token
    pub refresh_url: String,
    /// Upper bound on one refresh round-trip
    pub refresh_timeout_secs: u64,
    /// Upper bound on waiting for another caller's in-flight refresh
    pub waiter_timeout_secs: u64,
    /// Tokens are treated as expired this many seconds early so the
    /// refresh round-trip can finish before the real boundary
    pub expiry_skew_secs: i64,
    /// Wall-clock lifetime of the persisted session envelope
    pub session_ttl_days: i64,
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExaminaConfig {
    pub auth: AuthConfig,
    pub routes: RouteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_display() {
        for role in [Role::Student, Role::Teacher, Role::Institution, Role::Unassigned] {
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::from_str("principal").is_err());
    }

    #[test]
    fn unassigned_has_no_home() {
        let homes = RoleHomes {
            student: "/student/dashboard".to_string(),
            teacher: "/teacher/dashboard".to_string(),
            institution: "/institution/dashboard".to_string(),
        };

        assert_eq!(homes.home_for(Role::Teacher), Some("/teacher/dashboard"));
        assert_eq!(homes.home_for(Role::Unassigned), None);
    }

    #[test]
    fn route_class_deserializes_from_toml() {
        let rule: RouteRule = toml::from_str(
            r#"
            prefix = "/teacher"
            class = { role_restricted = "teacher" }
            "#,
        )
        .unwrap();
        assert_eq!(rule.class, RouteClass::RoleRestricted(Role::Teacher));

        let rule: RouteRule = toml::from_str(
            r#"
            prefix = "/login"
            class = "auth_only"
            "#,
        )
        .unwrap();
        assert_eq!(rule.class, RouteClass::AuthOnly);
    }
}

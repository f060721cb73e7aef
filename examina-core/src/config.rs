//! Configuration loading and validation

use crate::error::{ErrorContext, ExaminaError, ExaminaResult};
use crate::types::{
    AuthConfig, ExaminaConfig, Role, RoleHomes, RouteClass, RouteConfig, RouteRule,
};

use std::path::Path;

impl Default for ExaminaConfig {
    fn default() -> Self {
        Self {
            auth: AuthConfig {
                refresh_url: "http://127.0.0.1:8000/auth/token/refresh/".to_string(),
                refresh_timeout_secs: 10,
                waiter_timeout_secs: 15,
                expiry_skew_secs: 30,
                session_ttl_days: 7,
            },
            routes: RouteConfig {
                login_path: "/login".to_string(),
                first_login_path: "/onboarding".to_string(),
                api_prefix: "/api".to_string(),
                role_homes: RoleHomes {
                    student: "/student/dashboard".to_string(),
                    teacher: "/teacher/dashboard".to_string(),
                    institution: "/institution/dashboard".to_string(),
                },
                rules: vec![
                    RouteRule {
                        prefix: "/login".to_string(),
                        class: RouteClass::AuthOnly,
                    },
                    RouteRule {
                        prefix: "/signup".to_string(),
                        class: RouteClass::AuthOnly,
                    },
                    RouteRule {
                        prefix: "/onboarding".to_string(),
                        class: RouteClass::FirstLoginOnly,
                    },
                    RouteRule {
                        prefix: "/student".to_string(),
                        class: RouteClass::RoleRestricted(Role::Student),
                    },
                    RouteRule {
                        prefix: "/teacher".to_string(),
                        class: RouteClass::RoleRestricted(Role::Teacher),
                    },
                    RouteRule {
                        prefix: "/institution".to_string(),
                        class: RouteClass::RoleRestricted(Role::Institution),
                    },
                    RouteRule {
                        prefix: "/api/v1/student".to_string(),
                        class: RouteClass::RoleRestricted(Role::Student),
                    },
                    RouteRule {
                        prefix: "/api/v1/teacher".to_string(),
                        class: RouteClass::RoleRestricted(Role::Teacher),
                    },
                    RouteRule {
                        prefix: "/api/v1/institution".to_string(),
                        class: RouteClass::RoleRestricted(Role::Institution),
                    },
                ],
            },
            logging: crate::logging::LoggingConfig::default(),
        }
    }
}

impl ExaminaConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ExaminaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ExaminaError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_metadata("path", &path.display().to_string())
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: ExaminaConfig = toml::from_str(&content).map_err(|e| ExaminaError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants
    pub fn validate(&self) -> ExaminaResult<()> {
        if self.auth.refresh_url.is_empty() {
            return Err(config_invalid(
                "auth.refresh_url must not be empty",
                "Point refresh_url at the issuer's token refresh endpoint",
            ));
        }

        if self.auth.refresh_timeout_secs == 0 || self.auth.waiter_timeout_secs == 0 {
            return Err(config_invalid(
                "refresh and waiter timeouts must be greater than 0",
                "Use a small positive timeout so waiting requests cannot hang unbounded",
            ));
        }

        if self.auth.waiter_timeout_secs < self.auth.refresh_timeout_secs {
            return Err(config_invalid(
                "auth.waiter_timeout_secs must cover auth.refresh_timeout_secs",
                "Waiters must outlive the refresh round-trip they are queued on",
            ));
        }

        if self.auth.expiry_skew_secs < 0 {
            return Err(config_invalid(
                "auth.expiry_skew_secs must not be negative",
                "Skew widens the expiry boundary; use 0 to disable it",
            ));
        }

        if self.auth.session_ttl_days <= 0 {
            return Err(config_invalid(
                "auth.session_ttl_days must be greater than 0",
                "The persisted session envelope needs a positive lifetime",
            ));
        }

        for role in Role::ASSIGNABLE {
            if self
                .routes
                .role_homes
                .home_for(role)
                .map_or(true, |home| home.is_empty())
            {
                return Err(config_invalid(
                    &format!("routes.role_homes is missing a home path for role '{}'", role),
                    "Every assignable role needs a redirect target",
                ));
            }
        }

        for rule in &self.routes.rules {
            if !rule.prefix.starts_with('/') {
                return Err(config_invalid(
                    &format!("route prefix '{}' must start with '/'", rule.prefix),
                    "Route rules match absolute path prefixes",
                ));
            }
        }

        Ok(())
    }
}

fn config_invalid(message: &str, suggestion: &str) -> ExaminaError {
    ExaminaError::Config {
        message: message.to_string(),
        source: None,
        context: ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}

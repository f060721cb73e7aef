//! Route authorization state machine
//!
//! `decide` is a pure function of the session (or its absence), the
//! derived first-login state, and the target route's declared class.
//! It never errors: an undecodable or unrefreshable session has
//! already degraded to "no session" before it gets here.
//!
//! Decision table, with fixed precedence (first-login wins over
//! role/auth redirects; a role mismatch redirects to login, never to
//! the user's own home; a signed-in user on an auth-only page is sent
//! to their own role home):
//!
//! | class              | anonymous        | matching role      | wrong/no role     | first-login        |
//! |--------------------|------------------|--------------------|-------------------|--------------------|
//! | Public             | Allow            | Allow              | Allow             | Allow              |
//! | AuthOnly           | Allow            | Redirect(roleHome) | Redirect(roleHome)| Redirect(firstLogin)|
//! | RoleRestricted(R)  | Redirect(login)  | Allow              | Redirect(login)   | Redirect(firstLogin)|
//! | FirstLoginOnly     | Redirect(login)  | Redirect(roleHome) | Redirect(login)   | Allow              |

use examina_core::{RouteClass, RouteConfig};
use tracing::trace;

use crate::session::Session;

/// Output of the gate; produced fresh per request, never mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Redirect(String),
    /// Reserved for non-redirectable consumers (machine-to-machine
    /// calls); the HTTP middleware maps redirects to this for API paths.
    Deny,
}

/// Per-request authorization decisions over the static route table
pub struct AuthGate {
    routes: RouteConfig,
}

impl AuthGate {
    pub fn new(routes: RouteConfig) -> Self {
        Self { routes }
    }

    /// Classify a request path by longest matching prefix.
    /// Paths outside the declared table are public.
    pub fn classify(&self, path: &str) -> RouteClass {
        self.routes
            .rules
            .iter()
            .filter(|rule| path.starts_with(rule.prefix.as_str()))
            .max_by_key(|rule| rule.prefix.len())
            .map(|rule| rule.class.clone())
            .unwrap_or(RouteClass::Public)
    }

    /// Whether redirects are meaningless for this path
    pub fn is_api_path(&self, path: &str) -> bool {
        path.starts_with(self.routes.api_prefix.as_str())
    }

    /// Decide whether to allow, redirect, or deny the request
    pub fn decide(&self, session: Option<&Session>, class: &RouteClass) -> AuthDecision {
        let decision = match session {
            None => match class {
                RouteClass::Public | RouteClass::AuthOnly => AuthDecision::Allow,
                RouteClass::RoleRestricted(_) | RouteClass::FirstLoginOnly => {
                    AuthDecision::Redirect(self.routes.login_path.clone())
                }
            },
            Some(session) => {
                let first_login = session.user.is_first_login();
                match class {
                    RouteClass::Public => AuthDecision::Allow,
                    RouteClass::FirstLoginOnly => {
                        if first_login {
                            AuthDecision::Allow
                        } else {
                            AuthDecision::Redirect(self.role_home(session))
                        }
                    }
                    RouteClass::AuthOnly => {
                        if first_login {
                            AuthDecision::Redirect(self.routes.first_login_path.clone())
                        } else {
                            AuthDecision::Redirect(self.role_home(session))
                        }
                    }
                    RouteClass::RoleRestricted(required) => {
                        if first_login {
                            // First-login wins over the role redirect
                            AuthDecision::Redirect(self.routes.first_login_path.clone())
                        } else if session.user.role == *required {
                            AuthDecision::Allow
                        } else {
                            // Never redirect to the user's own home: that
                            // would leak which roles exist
                            AuthDecision::Redirect(self.routes.login_path.clone())
                        }
                    }
                }
            }
        };

        trace!(?class, ?decision, "route authorization decided");
        decision
    }

    /// Classify and decide in one step
    pub fn decide_path(&self, session: Option<&Session>, path: &str) -> AuthDecision {
        let class = self.classify(path);
        self.decide(session, &class)
    }

    fn role_home(&self, session: &Session) -> String {
        self.routes
            .role_homes
            .home_for(session.user.role)
            .map(str::to_string)
            .unwrap_or_else(|| self.routes.first_login_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::test_tokens;
    use chrono::{Duration, Utc};
    use examina_core::{ExaminaConfig, Role};

    fn gate() -> AuthGate {
        AuthGate::new(ExaminaConfig::default().routes)
    }

    fn session_with_role(role: Role) -> Session {
        let access = test_tokens::issue("user-1", role, Utc::now() + Duration::hours(1));
        Session::derive(access, "refresh-1".to_string()).unwrap()
    }

    #[test]
    fn classify_longest_prefix_wins() {
        let mut routes = ExaminaConfig::default().routes;
        routes.rules.push(examina_core::RouteRule {
            prefix: "/teacher/public-profile".to_string(),
            class: RouteClass::Public,
        });
        let gate = AuthGate::new(routes);

        assert_eq!(
            gate.classify("/teacher/assessments"),
            RouteClass::RoleRestricted(Role::Teacher)
        );
        assert_eq!(
            gate.classify("/teacher/public-profile/42"),
            RouteClass::Public
        );
    }

    #[test]
    fn undeclared_paths_are_public() {
        assert_eq!(gate().classify("/about"), RouteClass::Public);
    }

    #[test]
    fn anonymous_on_role_restricted_redirects_to_login() {
        // Scenario C
        let decision = gate().decide_path(None, "/teacher/assessments");
        assert_eq!(decision, AuthDecision::Redirect("/login".to_string()));
    }

    #[test]
    fn anonymous_on_public_and_auth_only_is_allowed() {
        let gate = gate();
        assert_eq!(gate.decide_path(None, "/about"), AuthDecision::Allow);
        assert_eq!(gate.decide_path(None, "/login"), AuthDecision::Allow);
    }

    #[test]
    fn signed_in_on_auth_only_goes_to_own_home() {
        // Scenario D
        let session = session_with_role(Role::Student);
        let decision = gate().decide_path(Some(&session), "/login");
        assert_eq!(
            decision,
            AuthDecision::Redirect("/student/dashboard".to_string())
        );
    }

    #[test]
    fn matching_role_is_allowed() {
        let session = session_with_role(Role::Teacher);
        let decision = gate().decide_path(Some(&session), "/teacher/assessments");
        assert_eq!(decision, AuthDecision::Allow);
    }

    #[test]
    fn wrong_role_redirects_to_login_not_own_home() {
        let session = session_with_role(Role::Student);
        let decision = gate().decide_path(Some(&session), "/teacher/assessments");
        assert_eq!(decision, AuthDecision::Redirect("/login".to_string()));
    }

    #[test]
    fn first_login_wins_over_role_redirect() {
        // Scenario E: role unset, RoleRestricted target
        let session = session_with_role(Role::Unassigned);
        let decision = gate().decide_path(Some(&session), "/teacher/assessments");
        assert_eq!(
            decision,
            AuthDecision::Redirect("/onboarding".to_string())
        );
    }

    #[test]
    fn first_login_on_auth_only_goes_to_onboarding() {
        let session = session_with_role(Role::Unassigned);
        let decision = gate().decide_path(Some(&session), "/login");
        assert_eq!(
            decision,
            AuthDecision::Redirect("/onboarding".to_string())
        );
    }

    #[test]
    fn first_login_only_route_allows_first_login() {
        let session = session_with_role(Role::Unassigned);
        assert_eq!(
            gate().decide_path(Some(&session), "/onboarding"),
            AuthDecision::Allow
        );
    }

    #[test]
    fn finished_account_on_first_login_route_goes_home() {
        let session = session_with_role(Role::Institution);
        assert_eq!(
            gate().decide_path(Some(&session), "/onboarding"),
            AuthDecision::Redirect("/institution/dashboard".to_string())
        );
    }

    #[test]
    fn anonymous_on_first_login_route_goes_to_login() {
        assert_eq!(
            gate().decide_path(None, "/onboarding"),
            AuthDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn decide_is_deterministic() {
        // Identical inputs always yield identical decisions
        let gate = gate();
        let session = session_with_role(Role::Teacher);
        let first = gate.decide_path(Some(&session), "/teacher/courses");
        for _ in 0..10 {
            assert_eq!(gate.decide_path(Some(&session), "/teacher/courses"), first);
        }
    }

    #[test]
    fn api_paths_are_flagged_for_deny() {
        let gate = gate();
        assert!(gate.is_api_path("/api/v1/courses"));
        assert!(!gate.is_api_path("/teacher/courses"));
    }

    #[test]
    fn full_table_is_enumerable() {
        let gate = gate();
        let anonymous: Option<Session> = None;
        let student = session_with_role(Role::Student);
        let first_login = session_with_role(Role::Unassigned);

        let cases: Vec<(Option<&Session>, RouteClass, AuthDecision)> = vec![
            (anonymous.as_ref(), RouteClass::Public, AuthDecision::Allow),
            (anonymous.as_ref(), RouteClass::AuthOnly, AuthDecision::Allow),
            (
                anonymous.as_ref(),
                RouteClass::RoleRestricted(Role::Student),
                AuthDecision::Redirect("/login".into()),
            ),
            (
                anonymous.as_ref(),
                RouteClass::FirstLoginOnly,
                AuthDecision::Redirect("/login".into()),
            ),
            (Some(&student), RouteClass::Public, AuthDecision::Allow),
            (
                Some(&student),
                RouteClass::AuthOnly,
                AuthDecision::Redirect("/student/dashboard".into()),
            ),
            (
                Some(&student),
                RouteClass::RoleRestricted(Role::Student),
                AuthDecision::Allow,
            ),
            (
                Some(&student),
                RouteClass::RoleRestricted(Role::Teacher),
                AuthDecision::Redirect("/login".into()),
            ),
            (
                Some(&student),
                RouteClass::FirstLoginOnly,
                AuthDecision::Redirect("/student/dashboard".into()),
            ),
            (Some(&first_login), RouteClass::Public, AuthDecision::Allow),
            (
                Some(&first_login),
                RouteClass::AuthOnly,
                AuthDecision::Redirect("/onboarding".into()),
            ),
            (
                Some(&first_login),
                RouteClass::RoleRestricted(Role::Teacher),
                AuthDecision::Redirect("/onboarding".into()),
            ),
            (
                Some(&first_login),
                RouteClass::FirstLoginOnly,
                AuthDecision::Allow,
            ),
        ];

        for (session, class, expected) in cases {
            assert_eq!(gate.decide(session, &class), expected, "class {:?}", class);
        }
    }
}

use crate::auth::{Identity, Role};

pub const SIGN_IN: &str = "/sign-in";
pub const SIGN_UP: &str = "/sign-up";
pub const DASHBOARD: &str = "/dashboard";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
pub const ERROR_PAGE: &str = "/error";

/// Query parameter carrying the post-login return target.
pub const RETURN_PARAM: &str = "redirect_url";

const PUBLIC_EXACT: &[&str] = &["/", "/health", ERROR_PAGE];
const PUBLIC_PREFIXES: &[&str] = &[SIGN_IN, SIGN_UP, "/api/webhooks"];
const ADMIN_PREFIXES: &[&str] = &["/admin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    AdminOnly,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Anonymous caller on an API route.
    Unauthorized,
    Redirect(String),
}

pub fn classify(path: &str) -> RouteClass {
    if PUBLIC_EXACT.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        RouteClass::Public
    } else if ADMIN_PREFIXES.iter().any(|p| path.starts_with(p)) {
        RouteClass::AdminOnly
    } else {
        RouteClass::Authenticated
    }
}

fn is_api(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn is_auth_page(path: &str) -> bool {
    path.starts_with(SIGN_IN) || path.starts_with(SIGN_UP)
}

fn landing_for(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_DASHBOARD,
        Role::Member => DASHBOARD,
    }
}

/// Sign-in location that returns the caller to `original` after login.
pub fn sign_in_redirect(original: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(original.as_bytes()).collect();
    format!("{}?{}={}", SIGN_IN, RETURN_PARAM, encoded)
}

/// Route-level authorization for one request.
///
/// `path` is the request path used for classification; `original` is the
/// path plus query string preserved for the post-login return.
pub fn evaluate(path: &str, original: &str, identity: &Identity) -> GateDecision {
    let class = classify(path);

    let principal = match identity {
        Identity::Anonymous => {
            return match class {
                RouteClass::Public => GateDecision::Allow,
                _ if is_api(path) => GateDecision::Unauthorized,
                _ => GateDecision::Redirect(sign_in_redirect(original)),
            };
        }
        Identity::Authenticated(principal) => principal,
    };

    // Public routes other than the auth pages never depend on the role,
    // which also keeps the error page reachable with broken claims.
    if class == RouteClass::Public && !is_auth_page(path) {
        return GateDecision::Allow;
    }

    let role = match principal.role() {
        Ok(role) => role,
        Err(e) => {
            tracing::error!("Role resolution failed for {}: {}", principal.user_id, e);
            return GateDecision::Redirect(ERROR_PAGE.to_string());
        }
    };

    if role == Role::Admin && path == DASHBOARD {
        return GateDecision::Redirect(ADMIN_DASHBOARD.to_string());
    }

    if class == RouteClass::AdminOnly && role != Role::Admin {
        return GateDecision::Redirect(DASHBOARD.to_string());
    }

    if class == RouteClass::Public && is_auth_page(path) {
        return GateDecision::Redirect(landing_for(role).to_string());
    }

    GateDecision::Allow
}

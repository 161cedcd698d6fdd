//! Route gating on session state.
//!
//! Guards hold no state and make no network calls: they look at a [`SessionState`] and say
//! whether the requested subtree may be shown, must wait for session restoration, or must be
//! swapped for a redirect.

use crate::session::SessionState;

pub const HOME_PATH: &str = "/";
pub const SIGN_IN_PATH: &str = "/sign-in";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Session restoration has not finished yet.
    Loading,
    Render,
    /// `from` carries the originally requested path for the post-login redirect.
    Redirect { to: String, from: Option<String> },
}

pub fn require_authenticated(
    session: &SessionState,
    requested_path: &str,
    redirect_path: &str,
) -> GuardOutcome {
    if session.loading {
        return GuardOutcome::Loading;
    }
    if session.is_authenticated() {
        return GuardOutcome::Render;
    }
    GuardOutcome::Redirect {
        to: redirect_path.to_string(),
        from: Some(requested_path.to_string()),
    }
}

pub fn require_admin(session: &SessionState) -> GuardOutcome {
    if session.loading {
        return GuardOutcome::Loading;
    }
    if session.is_admin() {
        return GuardOutcome::Render;
    }
    GuardOutcome::Redirect {
        to: UNAUTHORIZED_PATH.to_string(),
        from: None,
    }
}

/// Where sign-in sends the user: back to the guarded page, or home.
pub fn post_login_target(from: Option<&str>) -> String {
    match from {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => HOME_PATH.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Browse,
    Contact,
    AboutUs,
    SignIn,
    SignUp,
    Profile,
    CartItems,
    CheckoutResult,
    Wishlist,
    VerifyEmail { token: String },
    Dashboard,
    DashboardBooks,
    DashboardOrders,
    DashboardUsers,
    DashboardComments,
    DashboardCategories,
    DashboardContactMessages,
    Unauthorized,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated { redirect: &'static str },
    Admin,
}

impl Route {
    pub fn resolve(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Browse,
            ["contact"] => Route::Contact,
            ["about-us"] => Route::AboutUs,
            ["sign-in"] => Route::SignIn,
            ["sign-up"] => Route::SignUp,
            ["profile"] => Route::Profile,
            ["cart-items"] => Route::CartItems,
            ["checkout", "success-popup"] => Route::CheckoutResult,
            ["whishlist"] => Route::Wishlist,
            ["verify-email", token] => Route::VerifyEmail {
                token: token.to_string(),
            },
            ["dashboard"] => Route::Dashboard,
            ["dashboard", "books"] => Route::DashboardBooks,
            ["dashboard", "orders"] => Route::DashboardOrders,
            ["dashboard", "users"] => Route::DashboardUsers,
            ["dashboard", "comments"] => Route::DashboardComments,
            ["dashboard", "categories"] => Route::DashboardCategories,
            ["dashboard", "contactMessages"] => Route::DashboardContactMessages,
            ["unauthorized"] => Route::Unauthorized,
            _ => Route::NotFound,
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Contact | Route::Profile | Route::CartItems | Route::Wishlist => {
                Access::Authenticated {
                    redirect: SIGN_IN_PATH,
                }
            }
            Route::Dashboard
            | Route::DashboardBooks
            | Route::DashboardOrders
            | Route::DashboardUsers
            | Route::DashboardComments
            | Route::DashboardCategories
            | Route::DashboardContactMessages => Access::Admin,
            _ => Access::Public,
        }
    }

    pub fn is_admin_area(&self) -> bool {
        self.access() == Access::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub route: Route,
    pub outcome: GuardOutcome,
}

pub fn navigate(session: &SessionState, path: &str) -> Navigation {
    let route = Route::resolve(path);
    let outcome = match route.access() {
        Access::Public => GuardOutcome::Render,
        Access::Authenticated { redirect } => require_authenticated(session, path, redirect),
        Access::Admin => require_admin(session),
    };
    Navigation { route, outcome }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn session(role: Option<&str>) -> SessionState {
        SessionState {
            user: role.map(|r| User {
                role: Some(r.to_string()),
                ..Default::default()
            }),
            token: role.map(|_| "tok".to_string()),
            expiry: None,
            loading: false,
        }
    }

    #[test]
    fn test_loading_placeholder() {
        let loading = SessionState {
            loading: true,
            ..Default::default()
        };
        assert_eq!(require_admin(&loading), GuardOutcome::Loading);
        assert_eq!(
            require_authenticated(&loading, "/profile", SIGN_IN_PATH),
            GuardOutcome::Loading
        );
    }

    #[test]
    fn test_authenticated_guard_carries_origin() {
        assert_eq!(
            require_authenticated(&session(None), "/cart-items", SIGN_IN_PATH),
            GuardOutcome::Redirect {
                to: SIGN_IN_PATH.into(),
                from: Some("/cart-items".into())
            }
        );
        assert_eq!(
            require_authenticated(&session(Some("user")), "/cart-items", SIGN_IN_PATH),
            GuardOutcome::Render
        );
    }

    #[test]
    fn test_admin_guard() {
        let unauthorized = GuardOutcome::Redirect {
            to: UNAUTHORIZED_PATH.into(),
            from: None,
        };
        assert_eq!(navigate(&session(None), "/dashboard").outcome, unauthorized);
        assert_eq!(navigate(&session(Some("user")), "/dashboard").outcome, unauthorized);
        assert_eq!(
            navigate(&session(Some("admin")), "/dashboard"),
            Navigation {
                route: Route::Dashboard,
                outcome: GuardOutcome::Render
            }
        );
    }

    #[test]
    fn test_resolve_routes() {
        assert_eq!(Route::resolve("/"), Route::Browse);
        assert_eq!(Route::resolve("/dashboard/books/"), Route::DashboardBooks);
        assert_eq!(
            Route::resolve("/checkout/success-popup?mock=true&trx=1"),
            Route::CheckoutResult
        );
        assert_eq!(
            Route::resolve("/verify-email/abc123"),
            Route::VerifyEmail {
                token: "abc123".into()
            }
        );
        assert_eq!(Route::resolve("/dashboard/nope"), Route::NotFound);
        assert!(Route::resolve("/dashboard/users").is_admin_area());
        assert_eq!(navigate(&session(None), "/nowhere").outcome, GuardOutcome::Render);
    }

    #[test]
    fn test_post_login_target() {
        assert_eq!(post_login_target(Some("/whishlist")), "/whishlist");
        assert_eq!(post_login_target(None), "/");
        assert_eq!(post_login_target(Some("")), "/");
    }
}

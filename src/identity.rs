//! Process-wide signed-in identity.
//!
//! Views consume an already-resolved identity via [`current`] instead of
//! re-fetching the user's role on every mount. The slot is initialized on
//! login and cleared on logout.

use lazy_static::lazy_static;
use log::{info, warn};
use parking_lot::Mutex;

use crate::api::models::LoginRequest;
use crate::api::{self, ApiClient};

lazy_static! {
    static ref CURRENT_IDENTITY: Mutex<Option<Identity>> = Mutex::new(None);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn from_wire(raw: &str) -> Role {
        match raw {
            "ADMIN" => Role::Admin,
            "USER" => Role::User,
            other => {
                warn!("Unknown role '{}' from backend, treating as USER", other);
                Role::User
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    /// Opaque token issued by the backend on login. Never decoded here.
    pub token: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Log in against the backend and initialize the global identity slot.
pub async fn sign_in(api: &ApiClient, request: &LoginRequest) -> api::Result<Identity> {
    let response = api.login(request).await?;

    let identity = Identity {
        user_id: response.id,
        username: response.username,
        role: Role::from_wire(&response.role),
        token: response.message,
    };

    info!(
        "✅ Signed in as '{}' (user {}, {})",
        identity.username,
        identity.user_id,
        identity.role.as_str()
    );

    *CURRENT_IDENTITY.lock() = Some(identity.clone());
    Ok(identity)
}

/// The identity established by the last successful [`sign_in`], if any.
pub fn current() -> Option<Identity> {
    CURRENT_IDENTITY.lock().clone()
}

pub fn sign_out() {
    let previous = CURRENT_IDENTITY.lock().take();
    match previous {
        Some(identity) => info!("Signed out '{}'", identity.username),
        None => warn!("sign_out called with no active identity"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_defaults_to_user() {
        assert_eq!(Role::from_wire("ADMIN"), Role::Admin);
        assert_eq!(Role::from_wire("USER"), Role::User);
        assert_eq!(Role::from_wire("SUPERVISOR"), Role::User);
    }
}

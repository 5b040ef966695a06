use serde::{Deserialize, Serialize};

/// A signed-in user. Never mutated after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

/// Where the login flow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Idle,
    Pending,
    Authenticated,
    Failed,
}

/// Authentication state for the single login flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    pub fn phase(&self) -> AuthPhase {
        if self.loading {
            AuthPhase::Pending
        } else if self.is_authenticated {
            AuthPhase::Authenticated
        } else if self.error.is_some() {
            AuthPhase::Failed
        } else {
            AuthPhase::Idle
        }
    }

    /// Restore an authenticated state from a persisted session
    pub fn signed_in(user: User) -> Self {
        AuthState {
            user: Some(user),
            is_authenticated: true,
            loading: false,
            error: None,
        }
    }
}

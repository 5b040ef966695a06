use crate::model::auth::{AuthState, User};
use crate::model::config::AuthConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("authentication unavailable: {0}")]
    Unavailable(String),
}

/// Something that can turn an email/password pair into a user
pub trait CredentialValidator {
    fn validate(&self, email: &str, password: &str) -> Result<User, AuthError>;
}

/// Accepts exactly one configured credential pair
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    email: String,
    password: String,
    user: User,
}

impl StaticCredentials {
    pub fn new(email: String, password: String, user: User) -> Self {
        StaticCredentials {
            email,
            password,
            user,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        StaticCredentials::new(
            config.email.clone(),
            config.password.clone(),
            User {
                id: config.user_id.clone(),
                name: config.name.clone(),
                email: config.email.clone(),
                avatar: config.avatar.clone(),
            },
        )
    }
}

impl CredentialValidator for StaticCredentials {
    fn validate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email == self.email && password == self.password {
            Ok(self.user.clone())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// idle/failed → pending
pub fn login_start(auth: &mut AuthState) {
    auth.loading = true;
    auth.error = None;
}

/// pending → authenticated
pub fn login_success(auth: &mut AuthState, user: User) {
    auth.loading = false;
    auth.is_authenticated = true;
    auth.user = Some(user);
    auth.error = None;
}

/// pending → failed
pub fn login_failure(auth: &mut AuthState, message: String) {
    auth.loading = false;
    auth.error = Some(message);
}

/// any → idle
pub fn logout(auth: &mut AuthState) {
    *auth = AuthState::default();
}

/// Run the whole login flow against `validator`
pub fn login(
    auth: &mut AuthState,
    validator: &dyn CredentialValidator,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    login_start(auth);
    match validator.validate(email, password) {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "signed in");
            login_success(auth, user.clone());
            Ok(user)
        }
        Err(e) => {
            tracing::warn!(email, error = %e, "sign-in rejected");
            login_failure(auth, e.to_string());
            Err(e)
        }
    }
}

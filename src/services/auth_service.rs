use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::models::auth::{LoginRequest, Session, SessionState, SignUpRequest};
use crate::models::user::{Identity, User};
use crate::repositories::RepositoryError;
use crate::repositories::user_repository::UserRepository;

/// Shortest password the provider accepts
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    name: String,
    email: String,
    exp: i64, // expiration timestamp
}

/// Identity provider errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Password is too weak")]
    WeakPassword,

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Display name is required")]
    MissingName,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Identity provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::DuplicateEmail => "email_already_in_use",
            AuthError::WeakPassword => "weak_password",
            AuthError::InvalidEmail => "invalid_email",
            AuthError::MissingName => "missing_name",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::UserNotFound => "user_not_found",
            AuthError::Provider(_) => "provider_error",
        }
    }

    /// The text shown to the user for this error
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::DuplicateEmail => "An account with this email already exists",
            AuthError::WeakPassword => "Password should be at least 6 characters",
            AuthError::InvalidEmail => "Invalid email address",
            AuthError::MissingName => "First name is required",
            AuthError::InvalidCredentials => "Invalid email or password",
            AuthError::InvalidToken => "Invalid authentication token",
            AuthError::TokenExpired => "Authentication token has expired",
            AuthError::UserNotFound | AuthError::Provider(_) => {
                "An error occurred. Please try again"
            }
        }
    }
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ConstraintViolation(_) => AuthError::DuplicateEmail,
            other => AuthError::Provider(other.to_string()),
        }
    }
}

/// Trait defining identity provider operations
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new user and sign them in
    async fn sign_up(&self, request: SignUpRequest) -> Result<Session, AuthError>;

    /// Authenticate with email and password
    async fn sign_in(&self, request: LoginRequest) -> Result<Session, AuthError>;

    /// End a session; its watchers observe `Anonymous`
    async fn sign_out(&self, token: &str) -> Result<(), AuthError>;

    /// Change the display name of a user
    async fn update_display_name(&self, user_id: Uuid, name: &str) -> Result<User, AuthError>;

    /// Validate a bearer token and return the identity it carries
    async fn validate_token(&self, token: &str) -> Result<Identity, AuthError>;

    /// Session-change notifications for a token. The first value is the
    /// current state; later values arrive on sign-out.
    async fn watch_session(&self, token: &str) -> watch::Receiver<SessionState>;
}

struct TrackedSession {
    state: watch::Sender<SessionState>,
    expires_at: i64,
}

/// Identity provider backed by a user repository, bcrypt and HS256 tokens
pub struct LocalIdentityProvider {
    user_repository: Arc<dyn UserRepository>,
    jwt_secret: String,
    session_ttl: Duration,
    hash_cost: u32,
    sessions: Mutex<HashMap<String, TrackedSession>>,
}

impl LocalIdentityProvider {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        jwt_secret: String,
        session_ttl: Duration,
    ) -> Self {
        Self {
            user_repository,
            jwt_secret,
            session_ttl,
            hash_cost: DEFAULT_COST,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the bcrypt work factor
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, TrackedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hash a password using bcrypt
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        hash(password, self.hash_cost)
            .map_err(|e| AuthError::Provider(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a hash
    fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        verify(password, hash)
            .map_err(|e| AuthError::Provider(format!("Password verification failed: {}", e)))
    }

    /// Generate a JWT for a user and start tracking the session
    fn start_session(&self, user: &User) -> Result<Session, AuthError> {
        let expires_at: DateTime<Utc> = Utc::now() + self.session_ttl;
        let identity = Identity::from(user);

        let claims = Claims {
            sub: user.id.to_string(),
            name: identity.display_name.clone(),
            email: identity.email.clone(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Provider(format!("Token generation failed: {}", e)))?;

        let (state, _) = watch::channel(SessionState::Authenticated(identity.clone()));
        let mut sessions = self.sessions();
        prune_expired(&mut sessions);
        sessions.insert(
            token.clone(),
            TrackedSession {
                state,
                expires_at: claims.exp,
            },
        );

        Ok(Session {
            token,
            expires_at,
            identity,
        })
    }

    /// Decode and validate a JWT
    fn decode_jwt(&self, token: &str) -> Result<Identity, AuthError> {
        // No leeway, so a token stops validating once its session is pruned.
        let mut validation = Validation::default();
        validation.leeway = 0;
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        let user_id = Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Identity {
            user_id,
            display_name: token_data.claims.name,
            email: token_data.claims.email,
        })
    }

    fn is_signed_out(&self, token: &str) -> bool {
        self.sessions()
            .get(token)
            .is_some_and(|tracked| *tracked.state.borrow() == SessionState::Anonymous)
    }
}

/// Drops sessions past their expiry, signing their watchers out first.
fn prune_expired(sessions: &mut HashMap<String, TrackedSession>) {
    let now = Utc::now().timestamp();
    sessions.retain(|_, tracked| {
        let live = tracked.expires_at >= now;
        if !live {
            tracked.state.send_replace(SessionState::Anonymous);
        }
        live
    });
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(&self, request: SignUpRequest) -> Result<Session, AuthError> {
        let email = normalize_email(&request.email);
        let name = request.name.trim();
        if !email.validate_email() {
            return Err(AuthError::InvalidEmail);
        }
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            password_hash: self.hash_password(&request.password)?,
            created_at: now,
            updated_at: now,
        };

        let user = self.user_repository.create(user).await?;
        info!(user_id = %user.id, "user signed up");
        self.start_session(&user)
    }

    async fn sign_in(&self, request: LoginRequest) -> Result<Session, AuthError> {
        let email = normalize_email(&request.email);
        if !email.validate_email() {
            return Err(AuthError::InvalidEmail);
        }

        let user = self
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !Self::verify_password(&request.password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user signed in");
        self.start_session(&user)
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let identity = self.decode_jwt(token)?;
        let mut sessions = self.sessions();
        match sessions.get(token) {
            Some(tracked) => {
                tracked.state.send_replace(SessionState::Anonymous);
            }
            None => {
                // Token issued before a restart: remember it as signed out
                // until it would have expired anyway.
                let (state, _) = watch::channel(SessionState::Anonymous);
                let expires_at = Utc::now().timestamp() + self.session_ttl.num_seconds();
                sessions.insert(token.to_string(), TrackedSession { state, expires_at });
            }
        }
        info!(user_id = %identity.user_id, "user signed out");
        Ok(())
    }

    async fn update_display_name(&self, user_id: Uuid, name: &str) -> Result<User, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }

        let user = self
            .user_repository
            .update_name(user_id, name, Utc::now())
            .await?
            .ok_or(AuthError::UserNotFound)?;
        debug!(%user_id, "display name updated");
        Ok(user)
    }

    async fn validate_token(&self, token: &str) -> Result<Identity, AuthError> {
        let identity = self.decode_jwt(token)?;
        if self.is_signed_out(token) {
            return Err(AuthError::InvalidToken);
        }
        Ok(identity)
    }

    async fn watch_session(&self, token: &str) -> watch::Receiver<SessionState> {
        let identity = self.decode_jwt(token);
        let mut sessions = self.sessions();
        if let Some(tracked) = sessions.get(token) {
            return tracked.state.subscribe();
        }

        match identity {
            Ok(identity) => {
                let (state, receiver) = watch::channel(SessionState::Authenticated(identity));
                let expires_at = Utc::now().timestamp() + self.session_ttl.num_seconds();
                sessions.insert(token.to_string(), TrackedSession { state, expires_at });
                receiver
            }
            Err(err) => {
                debug!(error = %err, "session watch for unusable token");
                let (_, receiver) = watch::channel(SessionState::Anonymous);
                receiver
            }
        }
    }
}

use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    claims::{Claims, TokenKind},
    dto::{LoginRequest, RegisterRequest},
    extractors::AuthSession,
    password::check_new_password,
    repo_types::{Profile, User},
};
use crate::{
    config::JwtConfig,
    error::AppError,
    session::{Action, SessionState, SessionUser},
    state::AppState,
    store::{DuplicateEmail, NutritionStore},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::from_secs(cfg.ttl_minutes.max(1) as u64 * 60),
            refresh_ttl: Duration::from_secs(cfg.refresh_ttl_minutes.max(1) as u64 * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.jwt)
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl JwtKeys {
    fn sign_with_kind(&self, user_id: Uuid, session_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            sid: session_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_pair(&self, user_id: Uuid, session_id: Uuid) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign_with_kind(user_id, session_id, TokenKind::Access)?,
            refresh_token: self.sign_with_kind(user_id, session_id, TokenKind::Refresh)?,
        })
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Authentication("invalid or expired token".into())
        })?;
        if data.claims.kind != expected {
            return Err(AppError::Authentication(format!("{expected:?} token required").to_lowercase()));
        }
        Ok(data.claims)
    }
}

/// Creates an account. The user still has to log in afterwards.
pub async fn register_user(store: &dyn NutritionStore, req: RegisterRequest) -> Result<User, AppError> {
    let name = req.name.trim();
    let email = normalize_email(&req.email);
    if name.is_empty() {
        return Err(AppError::validation("name", "name is required"));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("email", "invalid email"));
    }
    check_new_password(&req.password, &req.confirm_password)?;

    if store.user_exists(&email).await.map_err(AppError::persistence)? {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("email already registered".into()));
    }

    let user = store
        .create_user(&email, &req.password, name)
        .await
        .map_err(|e| {
            if e.is::<DuplicateEmail>() {
                warn!(email = %email, "email registered concurrently");
                return AppError::Conflict("email already registered".into());
            }
            error!(error = %e, "create user failed");
            AppError::persistence(e)
        })?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Checks credentials and opens a session on the home page.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<(User, Uuid, SessionState, TokenPair), AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("email", "email and password are required"));
    }

    let user = state
        .store
        .authenticate_user(&email, &req.password)
        .await
        .map_err(AppError::persistence)?
        .ok_or_else(|| {
            warn!(email = %email, "login rejected");
            AppError::Authentication("wrong email or password".into())
        })?;

    let session = SessionState::new().apply(Action::LoginSucceeded(SessionUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
    }));
    let sid = state.sessions.open(session.clone()).await;
    let tokens = JwtKeys::from_ref(state).sign_pair(user.id, sid)?;

    info!(user_id = %user.id, session_id = %sid, "user logged in");
    Ok((user, sid, session, tokens))
}

/// Loads the profile behind a session; a vanished profile ends the session.
pub async fn require_profile(state: &AppState, auth: &AuthSession) -> Result<Profile, AppError> {
    match state.store.user_profile(auth.user_id).await.map_err(AppError::persistence)? {
        Some(profile) => Ok(profile),
        None => {
            warn!(user_id = %auth.user_id, "profile not found, logging out");
            state.sessions.apply(auth.session_id, Action::Logout).await;
            Err(AppError::Authentication("profile not found, please log in again".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo_types::{NewUser, ProfileUpdate},
        entries::model::{NewEntry, NutritionEntry},
        session::Page,
        store::{DatabaseStats, MemoryStore},
    };
    use time::Date;

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ana".into(),
            email: email.into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
    }

    #[test]
    fn email_check() {
        assert!(is_valid_email("demo@example.com"));
        assert!(!is_valid_email("demo@example"));
        assert!(!is_valid_email("de mo@example.com"));
    }

    #[test]
    fn sign_and_verify_pair() {
        let keys = JwtKeys::from_ref(&AppState::fake());
        let (uid, sid) = (Uuid::new_v4(), Uuid::new_v4());
        let pair = keys.sign_pair(uid, sid).unwrap();

        let claims = keys.verify(&pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, uid);
        assert_eq!(claims.sid, sid);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");

        let refresh = keys.verify(&pair.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert!(keys.verify(&pair.refresh_token, TokenKind::Access).is_err());
        assert!(keys.verify("garbage", TokenKind::Access).is_err());
    }

    #[tokio::test]
    async fn register_normalizes_and_rejects_duplicates() {
        let state = AppState::fake();
        let user = register_user(state.store.as_ref(), register_req("  Ana@Example.COM ")).await.unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_ne!(user.password_hash, "secret1");

        let err = register_user(state.store.as_ref(), register_req("ana@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    /// Reports every email as free, like a reader that lost the race
    /// against another registration.
    struct RacingStore(MemoryStore);

    #[async_trait::async_trait]
    impl NutritionStore for RacingStore {
        async fn find_user_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            self.0.find_user(id).await
        }
        async fn insert_user(&self, user: NewUser) -> anyhow::Result<User> {
            self.0.insert_user(user).await
        }
        async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> anyhow::Result<Option<User>> {
            self.0.update_profile(id, update).await
        }
        async fn daily_entries(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<NutritionEntry>> {
            self.0.daily_entries(user_id, date).await
        }
        async fn add_daily_entry(&self, user_id: Uuid, entry: NewEntry) -> anyhow::Result<NutritionEntry> {
            self.0.add_daily_entry(user_id, entry).await
        }
        async fn database_stats(&self) -> anyhow::Result<DatabaseStats> {
            self.0.database_stats().await
        }
    }

    #[tokio::test]
    async fn duplicate_insert_after_free_check_is_conflict() {
        let store = RacingStore(MemoryStore::new());
        register_user(&store, register_req("ana@example.com")).await.unwrap();

        let err = register_user(&store, register_req("ana@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.database_stats().await.unwrap().total_users, 1);
    }

    #[tokio::test]
    async fn login_opens_home_session() {
        let state = AppState::fake();
        register_user(state.store.as_ref(), register_req("ana@example.com")).await.unwrap();

        let (user, sid, session, _) = login(
            &state,
            LoginRequest {
                email: "ANA@example.com".into(),
                password: "secret1".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(session.page(), Page::Home);
        assert_eq!(state.sessions.snapshot(sid).await.user().map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn wrong_password_is_authentication_error() {
        let state = AppState::fake();
        register_user(state.store.as_ref(), register_req("ana@example.com")).await.unwrap();
        let err = login(
            &state,
            LoginRequest {
                email: "ana@example.com".into(),
                password: "nope".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn missing_profile_logs_the_session_out() {
        let state = AppState::fake();
        let sid = state
            .sessions
            .open(SessionState::new().apply(Action::LoginSucceeded(SessionUser {
                id: Uuid::new_v4(),
                email: "ghost@example.com".into(),
                name: "Ghost".into(),
            })))
            .await;
        let auth = AuthSession {
            user_id: Uuid::new_v4(),
            session_id: sid,
        };
        let err = require_profile(&state, &auth).await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
        assert!(!state.sessions.contains(sid).await);
    }
}

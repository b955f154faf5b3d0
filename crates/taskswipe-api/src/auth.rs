use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use std::sync::LazyLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use taskswipe_db::models::UserRow;
use taskswipe_db::users::{NewUser, ProfileChanges};
use taskswipe_types::api::{
    AuthResponse, Claims, LoginRequest, RefreshRequest, RegisterRequest, TokenKind, TokenPair,
    UpdateProfileRequest,
};
use taskswipe_types::models::{Role, User};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{AppState, run_db};

const MIN_PASSWORD_LEN: usize = 8;

/// Verified against when a login names an unknown email, so that failure
/// costs the same argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"no-such-account", &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| error!("Dummy password hash failed: {}", e))
        .ok()
});

/// Signing material and lifetimes for both token kinds. Access and refresh
/// tokens use different secrets.
pub struct AuthKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthKeys {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    fn encoding(&self, kind: TokenKind) -> (&EncodingKey, Duration) {
        match kind {
            TokenKind::Access => (&self.access_encoding, self.access_ttl),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_ttl),
        }
    }

    fn decoding(&self, kind: TokenKind) -> &DecodingKey {
        match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        }
    }
}

fn create_token(
    keys: &AuthKeys,
    kind: TokenKind,
    user_id: Uuid,
    email: &str,
    role: Role,
) -> anyhow::Result<String> {
    let (key, ttl) = keys.encoding(kind);
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        kind,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    let token = encode(&Header::default(), &claims, key)?;
    Ok(token)
}

pub fn issue_tokens(keys: &AuthKeys, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<TokenPair> {
    Ok(TokenPair {
        access_token: create_token(keys, TokenKind::Access, user_id, email, role)?,
        refresh_token: create_token(keys, TokenKind::Refresh, user_id, email, role)?,
    })
}

/// Checks signature, expiry and that the token is of the expected kind.
pub fn verify_token(keys: &AuthKeys, token: &str, kind: TokenKind) -> Result<Claims, ApiError> {
    let data = decode::<Claims>(token, keys.decoding(kind), &Validation::new(Algorithm::HS256))
        .map_err(|e| {
            debug!("Rejected {} token: {}", kind, e);
            ApiError::Unauthorized("Invalid token")
        })?;

    if data.claims.kind != kind {
        return Err(ApiError::Unauthorized("Invalid token"));
    }
    Ok(data.claims)
}

async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed"))
    })?
    .map_err(ApiError::from)
}

async fn verify_password(password: String, stored: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(&stored)
            .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {e}"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed"))
    })?
    .map_err(ApiError::from)
}

async fn verify_dummy_password(password: String) -> Result<(), ApiError> {
    tokio::task::spawn_blocking(move || {
        let Some(stored) = DUMMY_HASH.as_deref() else {
            return;
        };
        if let Ok(parsed) = PasswordHash::new(stored) {
            let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
        }
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed"))
    })
}

fn auth_response(keys: &AuthKeys, row: UserRow) -> Result<AuthResponse, ApiError> {
    let user = row.into_model();
    let tokens = issue_tokens(keys, user.id, &user.email, user.role)?;
    Ok(AuthResponse { user, tokens })
}

fn validate_registration(req: &RegisterRequest) -> Result<Role, ApiError> {
    if !req.email.contains('@') {
        return Err(ApiError::InvalidArgument("A valid email is required".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidArgument(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(ApiError::InvalidArgument("First and last name are required".into()));
    }
    req.role
        .parse()
        .map_err(|_| ApiError::InvalidArgument("Role must be worker or client".into()))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = validate_registration(&req)?;

    // Cheap pre-check so a taken email does not pay for a hash.
    let email = req.email.clone();
    if run_db(&state, move |db| db.get_user_by_email(&email)).await?.is_some() {
        return Err(ApiError::Conflict("User already exists"));
    }

    let password_hash = hash_password(req.password).await?;
    let user_id = Uuid::new_v4();

    let created = run_db(&state, move |db| {
        db.create_user(&NewUser {
            id: &user_id.to_string(),
            email: &req.email,
            password_hash: &password_hash,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            role,
            college: req.college.as_deref(),
        })
    })
    .await?;

    // A concurrent registration can win between the check and the insert.
    let row = created.ok_or(ApiError::Conflict("User already exists"))?;
    info!("Registered {} user {}", role, row.id);

    Ok((StatusCode::CREATED, Json(auth_response(&state.keys, row)?)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = req.email.clone();
    let Some(row) = run_db(&state, move |db| db.get_user_by_email(&email)).await? else {
        verify_dummy_password(req.password).await?;
        return Err(ApiError::Unauthorized("Invalid credentials"));
    };

    if !verify_password(req.password, row.password.clone()).await? {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    Ok(Json(auth_response(&state.keys, row)?))
}

/// Exchanges a refresh token for a new pair. Email and role are re-read, so
/// the new access token reflects the stored account.
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let claims = verify_token(&state.keys, &req.refresh_token, TokenKind::Refresh)?;

    let id = claims.sub.to_string();
    let user = run_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::Unauthorized("Invalid token"))?
        .into_model();

    Ok(Json(issue_tokens(&state.keys, user.id, &user.email, user.role)?))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    let id = claims.sub.to_string();
    let row = run_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(row.into_model()))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&req.first_name) || blank(&req.last_name) {
        return Err(ApiError::InvalidArgument("Names cannot be empty".into()));
    }
    if req.hourly_rate.is_some_and(|rate| rate < 0.0) {
        return Err(ApiError::InvalidArgument("Hourly rate cannot be negative".into()));
    }

    let changes = ProfileChanges {
        first_name: req.first_name.map(|s| s.trim().to_string()),
        last_name: req.last_name.map(|s| s.trim().to_string()),
        college: req.college,
        profile_image: req.profile_image,
        bio: req.bio,
        skills: req.skills,
        hourly_rate: req.hourly_rate,
    };

    let id = claims.sub.to_string();
    let row = run_db(&state, move |db| db.update_profile(&id, &changes))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(row.into_model()))
}

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use pocketbook_db::queries::NewUser;
use pocketbook_types::api::{AuthResponse, LoginRequest, RegisterRequest};

use crate::error::{ApiError, Payload};
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

pub const SESSION_COOKIE: &str = "session";

const TOKEN_TTL_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(req): Payload<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email)?;
    validate_username(&req.username)?;
    if req.password.chars().count() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    let password_hash = hash_password(req.password).await?;

    let user_id = Uuid::new_v4();
    let outcome = {
        let id = user_id.to_string();
        let email = email.clone();
        let username = req.username.clone();
        run_db(&state, move |db| db.create_user(&id, &email, &username, &password_hash)).await?
    };
    match outcome {
        NewUser::Created => {}
        NewUser::EmailTaken => return Err(ApiError::bad_request("email already registered")),
        NewUser::UsernameTaken => return Err(ApiError::bad_request("username already taken")),
    }
    info!("Registered user {} ({})", req.username, user_id);

    let token = create_token(&state.jwt_secret, user_id, &req.username)?;

    let mailer = state.mailer.clone();
    let username = req.username.clone();
    tokio::spawn(async move {
        let body = format!(
            "Hi {},\n\nYour Pocketbook account is ready. Start by filling in your financial dashboard.\n",
            username
        );
        if let Err(e) = mailer.send(&email, "Welcome to Pocketbook", &body).await {
            warn!("Welcome email to {} failed: {:#}", email, e);
        }
    });

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(&state, token.clone())),
        Json(AuthResponse {
            user_id,
            username: req.username,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(req): Payload<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(req.password, user.password.clone()).await? {
        return Err(ApiError::Unauthorized);
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok((
        jar.add(session_cookie(&state, token.clone())),
        Json(AuthResponse {
            user_id,
            username: user.username,
            token,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
    )
}

/// Argon2id with a random salt, off the async workers.
async fn hash_password(password: String) -> Result<String, ApiError> {
    let hashed = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))
    })
    .await
    .map_err(|e| anyhow::anyhow!("hashing task failed: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: String, stored_hash: String) -> Result<bool, ApiError> {
    let verified = tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| anyhow::anyhow!("stored password hash is invalid: {}", e))?;
        Ok::<_, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
        )
    })
    .await
    .map_err(|e| anyhow::anyhow!("verification task failed: {}", e))??;
    Ok(verified)
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(state.cookie_secure)
        .build()
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if email.contains('@') && email.len() <= 254 {
        Ok(email)
    } else {
        Err(ApiError::bad_request("invalid email address"))
    }
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let len_ok = (3..=32).contains(&username.len());
    let chars_ok = username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "username must be 3-32 characters of letters, digits or underscore",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::decode_token;

    #[test]
    fn token_roundtrip() {
        let id = Uuid::new_v4();
        let token = create_token("secret", id, "alice").unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "alice");
        assert!(decode_token("other-secret", &token).is_none());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Alice@Example.COM ").unwrap(), "alice@example.com");
        assert_eq!(normalize_email("bob@localhost").unwrap(), "bob@localhost");
        assert!(normalize_email("alice").is_err());
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(normalize_email(&too_long).is_err());
    }

    #[tokio::test]
    async fn password_hash_verifies_only_its_password() {
        let hash = hash_password("correct horse".into()).await.unwrap();
        assert!(verify_password("correct horse".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".into(), hash).await.unwrap());
    }

    #[test]
    fn usernames_are_restricted() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice smith").is_err());
    }
}

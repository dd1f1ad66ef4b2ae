use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use http::StatusCode;
use jwt::{SignWithKey, VerifyWithKey};
use serde::Deserialize;
use sha2::Sha256;

use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{
    hash_password, json_response, new_id, now_iso, parse_body, sanitize_text, verify_password,
    Request, Response,
};
use crate::core::store::Store;
use crate::models::models::{AuthResponse, Claims, User, UserRecord};

#[derive(Deserialize)]
struct RegisterBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

fn signing_key() -> anyhow::Result<Hmac<Sha256>> {
    Hmac::<Sha256>::new_from_slice(jwt_secret().as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid jwt secret: {}", e))
}

pub fn issue_token(user_id: &str) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(token_expiration_hours())).timestamp(),
    };
    claims
        .sign_with_key(&signing_key()?)
        .map_err(|e| anyhow::anyhow!("failed to sign token: {}", e))
}

/// Verifies signature and expiry.
pub fn decode_token(token: &str) -> Option<Claims> {
    let key = signing_key().ok()?;
    let claims: Claims = token.verify_with_key(&key).ok()?;
    if claims.exp <= Utc::now().timestamp() {
        return None;
    }
    Some(claims)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the caller once per request. Fails with 401 when the token is
/// missing, invalid, expired, or names a user that no longer exists.
pub fn authenticate(store: &Store, req: &Request) -> Result<User, ApiError> {
    let token = bearer_token(req).ok_or(ApiError::Unauthorized)?;
    let claims = decode_token(token).ok_or(ApiError::Unauthorized)?;
    let record = store
        .get_json::<UserRecord>(&user_key(&claims.sub))?
        .ok_or(ApiError::Unauthorized)?;
    Ok(record.profile)
}

pub fn load_users(store: &Store) -> anyhow::Result<Vec<UserRecord>> {
    let mut users = Vec::new();
    for id in store.get_list(USERS_LIST_KEY)? {
        if let Some(u) = store.get_json::<UserRecord>(&user_key(&id))? {
            users.push(u);
        }
    }
    Ok(users)
}

/// Claims the username and email, then stores the user and lists it.
/// Fails with 409 when either is already held by someone else.
pub fn insert_user(store: &Store, record: &UserRecord) -> Result<(), ApiError> {
    let user = &record.profile;
    if !store.claim(&username_key(&user.username), &user.id)? {
        return Err(ApiError::Conflict("Username exists".to_string()));
    }
    if !store.claim(&email_key(&user.email), &user.id)? {
        store.release(&username_key(&user.username), &user.id)?;
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    store.set_json(&user_key(&user.id), record)?;
    store.update_list(USERS_LIST_KEY, |ids| ids.push(user.id.clone()))?;
    Ok(())
}

pub fn register_user(store: &Store, req: &Request) -> Result<Response, ApiError> {
    let body: RegisterBody = parse_body(req)?;
    let username = sanitize_text(&body.username).trim().to_string();
    let email = body.email.trim().to_lowercase();
    let name = sanitize_text(&body.name).trim().to_string();

    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username.chars().count()) {
        return Err(ApiError::BadRequest("Username must be 3-50 characters".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if body.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }
    if body.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest("Password must be at least 3 characters".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest("Name too long".to_string()));
    }

    let id = new_id();
    let record = UserRecord {
        profile: User {
            id: id.clone(),
            name: if name.is_empty() { username.clone() } else { name },
            username,
            email,
            bio: String::new(),
            avatar_url: None,
            banner_url: None,
            following: Vec::new(),
            followers: Vec::new(),
            blocked_users: Vec::new(),
            created_at: now_iso(),
        },
        password: hash_password(&body.password)?,
    };

    insert_user(store, &record)?;

    log::info!("registered user {} ({})", record.profile.username, id);

    let resp = AuthResponse {
        token: issue_token(&id)?,
        user: record.profile,
    };
    json_response(StatusCode::CREATED, &resp)
}

pub fn login_user(store: &Store, req: &Request) -> Result<Response, ApiError> {
    let body: LoginBody = parse_body(req)?;
    let email = body.email.trim().to_lowercase();

    for u in load_users(store)? {
        if u.profile.email == email && verify_password(&body.password, &u.password) {
            let resp = AuthResponse {
                token: issue_token(&u.profile.id)?,
                user: u.profile,
            };
            return json_response(StatusCode::OK, &resp);
        }
    }

    Err(ApiError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_decode_to_their_subject() {
        let token = issue_token("user-1").unwrap();
        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let token = issue_token("user-1").unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(decode_token(&tampered).is_none());
        assert!(decode_token("not.a.jwt").is_none());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let claims = Claims {
            sub: "user-1".to_string(),
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = claims.sign_with_key(&signing_key().unwrap()).unwrap();
        assert!(decode_token(&token).is_none());
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let store = Store::memory();
        let req = http::Request::builder().uri("/posts").body(Vec::new()).unwrap();
        assert!(matches!(authenticate(&store, &req), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn token_for_deleted_user_is_unauthorized() {
        let store = Store::memory();
        let token = issue_token("ghost").unwrap();
        let req = http::Request::builder()
            .uri("/posts")
            .header("Authorization", format!("Bearer {}", token))
            .body(Vec::new())
            .unwrap();
        assert!(matches!(authenticate(&store, &req), Err(ApiError::Unauthorized)));
    }
}

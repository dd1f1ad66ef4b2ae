use http::StatusCode;
use serde::Deserialize;

use crate::auth::{authenticate, load_users};
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, parse_body, sanitize_text, Request, Response};
use crate::core::query_params::{get_string, parse_query_params};
use crate::core::store::Store;
use crate::models::models::{User, UserRecord};

#[derive(Deserialize, Default)]
struct ProfileUpdate {
    name: Option<String>,
    username: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    banner_url: Option<String>,
}

pub fn load_user(store: &Store, user_id: &str) -> Result<UserRecord, ApiError> {
    store
        .get_json::<UserRecord>(&user_key(user_id))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

fn matches_query(user: &User, query: &str) -> bool {
    user.name.to_lowercase().contains(query) || user.username.to_lowercase().contains(query)
}

/// `GET /users`, optionally narrowed with `?q=`.
pub fn list_users(store: &Store, req: &Request) -> Result<Response, ApiError> {
    authenticate(store, req)?;

    let params = parse_query_params(req.uri().query());
    let query = get_string(&params, "q").map(|q| q.trim().to_lowercase());

    let users: Vec<User> = load_users(store)?
        .into_iter()
        .map(|u| u.profile)
        .filter(|u| query.as_deref().map_or(true, |q| matches_query(u, q)))
        .collect();

    json_response(StatusCode::OK, &users)
}

pub fn get_user(store: &Store, req: &Request, user_id: &str) -> Result<Response, ApiError> {
    authenticate(store, req)?;
    let user = load_user(store, user_id)?;
    json_response(StatusCode::OK, &user.profile)
}

fn optional_reference(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn update_profile(store: &Store, req: &Request) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let update: ProfileUpdate = parse_body(req)?;
    let clean = |v: Option<String>| v.map(|v| sanitize_text(&v).trim().to_string());

    let name = clean(update.name).filter(|n| !n.is_empty());
    if name.as_ref().map_or(false, |n| n.chars().count() > MAX_NAME_LENGTH) {
        return Err(ApiError::BadRequest("Name too long".to_string()));
    }
    let bio = clean(update.bio);
    if bio.as_ref().map_or(false, |b| b.chars().count() > MAX_BIO_LENGTH) {
        return Err(ApiError::BadRequest("Bio too long (max 500 chars)".to_string()));
    }
    let username = clean(update.username).filter(|u| !u.is_empty() && *u != me.username);
    if let Some(username) = &username {
        if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username.chars().count()) {
            return Err(ApiError::BadRequest("Username must be 3-50 characters".to_string()));
        }
        if !store.claim(&username_key(username), &me.id)? {
            return Err(ApiError::Conflict("Username exists".to_string()));
        }
    }

    let profile = store.update_existing(
        &user_key(&me.id),
        || ApiError::NotFound("User not found".to_string()),
        |record: &mut UserRecord| {
            let profile = &mut record.profile;
            if let Some(name) = name {
                profile.name = name;
            }
            if let Some(username) = &username {
                profile.username = username.clone();
            }
            if let Some(bio) = bio {
                profile.bio = bio;
            }
            if let Some(avatar_url) = update.avatar_url {
                profile.avatar_url = optional_reference(avatar_url);
            }
            if let Some(banner_url) = update.banner_url {
                profile.banner_url = optional_reference(banner_url);
            }
            Ok(profile.clone())
        },
    )?;

    if username.is_some() {
        store.release(&username_key(&me.username), &me.id)?;
    }

    json_response(StatusCode::OK, &profile)
}

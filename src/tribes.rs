use http::StatusCode;
use serde::{Deserialize, Deserializer};

use crate::auth::authenticate;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{
    json_response, new_id, now_iso, parse_body, require_text, sanitize_text, toggle_membership,
    Request, Response,
};
use crate::core::store::Store;
use crate::models::models::{Tribe, TribeMessage};

#[derive(Deserialize)]
struct TribeBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    /// Absent leaves the avatar alone, `null` clears it.
    #[serde(default, deserialize_with = "present")]
    avatar_url: Option<Option<String>>,
}

#[derive(Deserialize)]
struct NewTribeMessage {
    #[serde(default)]
    text: String,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn load_tribe(store: &Store, tribe_id: &str) -> Result<Tribe, ApiError> {
    store
        .get_json::<Tribe>(&tribe_key(tribe_id))?
        .ok_or_else(|| ApiError::NotFound("Tribe not found".to_string()))
}

/// Atomically edits a stored tribe; 404 when it does not exist.
fn edit_tribe<R>(store: &Store, tribe_id: &str, f: impl FnOnce(&mut Tribe) -> Result<R, ApiError>) -> Result<R, ApiError> {
    store.update_existing(&tribe_key(tribe_id), || ApiError::NotFound("Tribe not found".to_string()), f)
}

fn clean_avatar(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

fn validated_fields(body: &TribeBody) -> Result<(String, String), ApiError> {
    let name = require_text(&body.name, "Name", MAX_TRIBE_NAME_LENGTH)?;
    let description = sanitize_text(&body.description).trim().to_string();
    if description.chars().count() > MAX_TRIBE_DESCRIPTION_LENGTH {
        return Err(ApiError::BadRequest("Description too long".to_string()));
    }
    Ok((name, description))
}

pub fn list_tribes(store: &Store, req: &Request) -> Result<Response, ApiError> {
    authenticate(store, req)?;

    let mut tribes = Vec::new();
    for id in store.get_list(TRIBES_LIST_KEY)? {
        if let Some(t) = store.get_json::<Tribe>(&tribe_key(&id))? {
            tribes.push(t);
        }
    }

    json_response(StatusCode::OK, &tribes)
}

pub fn create_tribe(store: &Store, req: &Request) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let body: TribeBody = parse_body(req)?;
    let (name, description) = validated_fields(&body)?;

    let tribe = Tribe {
        id: new_id(),
        name,
        description,
        avatar_url: clean_avatar(body.avatar_url.flatten()),
        creator_id: me.id.clone(),
        members: vec![me.id],
        messages: Vec::new(),
        created_at: now_iso(),
    };

    store.set_json(&tribe_key(&tribe.id), &tribe)?;
    store.update_list(TRIBES_LIST_KEY, |tribes| tribes.insert(0, tribe.id.clone()))?;

    json_response(StatusCode::CREATED, &tribe)
}

/// `PUT /tribes/:id`, creator only.
pub fn update_tribe(store: &Store, req: &Request, tribe_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let body: TribeBody = parse_body(req)?;

    let tribe = edit_tribe(store, tribe_id, |tribe| {
        if tribe.creator_id != me.id {
            return Err(ApiError::Forbidden);
        }
        let (name, description) = validated_fields(&body)?;
        tribe.name = name;
        tribe.description = description;
        if let Some(avatar_url) = body.avatar_url {
            tribe.avatar_url = clean_avatar(avatar_url);
        }
        Ok(tribe.clone())
    })?;

    json_response(StatusCode::OK, &tribe)
}

/// `PUT /tribes/:id/join` toggles membership.
pub fn toggle_join(store: &Store, req: &Request, tribe_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let tribe = edit_tribe(store, tribe_id, |tribe| {
        toggle_membership(&mut tribe.members, &me.id);
        Ok(tribe.clone())
    })?;

    json_response(StatusCode::OK, &tribe)
}

pub fn get_tribe_messages(store: &Store, req: &Request, tribe_id: &str) -> Result<Response, ApiError> {
    authenticate(store, req)?;
    let tribe = load_tribe(store, tribe_id)?;
    json_response(StatusCode::OK, &tribe.messages)
}

/// `POST /tribes/:id/messages`, members only.
pub fn send_tribe_message(store: &Store, req: &Request, tribe_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let body: NewTribeMessage = parse_body(req)?;
    let text = require_text(&body.text, "Message", MAX_MESSAGE_LENGTH)?;

    let message = TribeMessage {
        id: new_id(),
        sender_id: me.id.clone(),
        text,
        timestamp: now_iso(),
    };
    edit_tribe(store, tribe_id, |tribe| {
        if !tribe.members.contains(&me.id) {
            return Err(ApiError::Forbidden);
        }
        tribe.messages.push(message.clone());
        Ok(())
    })?;

    json_response(StatusCode::CREATED, &message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_field_distinguishes_absent_from_null() {
        let absent: TribeBody = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(absent.avatar_url, None);

        let null: TribeBody = serde_json::from_str(r#"{"name":"x","avatar_url":null}"#).unwrap();
        assert_eq!(null.avatar_url, Some(None));

        let set: TribeBody = serde_json::from_str(r#"{"name":"x","avatar_url":"a.png"}"#).unwrap();
        assert_eq!(set.avatar_url, Some(Some("a.png".to_string())));
    }
}

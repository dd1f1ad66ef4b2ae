use http::StatusCode;
use serde::Deserialize;

use crate::auth::authenticate;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, new_id, now_iso, parse_body, require_text, Request, Response};
use crate::core::store::Store;
use crate::models::models::{Conversation, Message};
use crate::users::load_user;

#[derive(Deserialize)]
struct NewMessage {
    #[serde(default)]
    message: String,
}

fn find_conversation(store: &Store, a: &str, b: &str) -> anyhow::Result<Option<Conversation>> {
    match store.get_json::<String>(&conversation_pair_key(a, b))? {
        Some(id) => store.get_json::<Conversation>(&conversation_key(&id)),
        None => Ok(None),
    }
}

/// Returns the id of the conversation between `a` and `b`, creating it on
/// first use.
fn open_conversation(store: &Store, a: &str, b: &str) -> anyhow::Result<String> {
    let pair_key = conversation_pair_key(a, b);
    if let Some(id) = store.get_json::<String>(&pair_key)? {
        return Ok(id);
    }

    let mut participants = vec![a.to_string(), b.to_string()];
    participants.sort();
    let conversation = Conversation {
        id: new_id(),
        participants,
        last_message: None,
        updated_at: now_iso(),
    };

    // The document exists before the pair key points at it.
    store.set_json(&conversation_key(&conversation.id), &conversation)?;
    if !store.claim(&pair_key, &conversation.id)? {
        store.delete(&conversation_key(&conversation.id))?;
        return store
            .get_json::<String>(&pair_key)?
            .ok_or_else(|| anyhow::anyhow!("conversation pair {} vanished", pair_key));
    }

    for user_id in [a, b] {
        store.update_list(&user_conversations_key(user_id), |ids| ids.push(conversation.id.clone()))?;
    }

    Ok(conversation.id)
}

/// `GET /messages/conversations`, most recently active first.
pub fn list_conversations(store: &Store, req: &Request) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;

    let mut conversations = Vec::new();
    for id in store.get_list(&user_conversations_key(&me.id))? {
        if let Some(c) = store.get_json::<Conversation>(&conversation_key(&id))? {
            conversations.push(c);
        }
    }
    conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    json_response(StatusCode::OK, &conversations)
}

/// `GET /messages/:userId`, oldest first.
pub fn get_messages(store: &Store, req: &Request, other_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    load_user(store, other_id)?;

    let messages: Vec<Message> = match find_conversation(store, &me.id, other_id)? {
        Some(c) => store.get_list_of(&conversation_messages_key(&c.id))?,
        None => Vec::new(),
    };

    json_response(StatusCode::OK, &messages)
}

/// `POST /messages/send/:userId`
pub fn send_message(store: &Store, req: &Request, recipient_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    if recipient_id == me.id {
        return Err(ApiError::BadRequest("You cannot message yourself".to_string()));
    }
    let body: NewMessage = parse_body(req)?;
    let text = require_text(&body.message, "Message", MAX_MESSAGE_LENGTH)?;
    load_user(store, recipient_id)?;

    let conversation_id = open_conversation(store, &me.id, recipient_id)?;
    let message = Message {
        id: new_id(),
        conversation_id: conversation_id.clone(),
        sender_id: me.id,
        text,
        timestamp: now_iso(),
    };

    store.update_list_of(&conversation_messages_key(&conversation_id), |messages: &mut Vec<Message>| {
        messages.push(message.clone())
    })?;

    store.update_existing(
        &conversation_key(&conversation_id),
        || ApiError::NotFound("Conversation not found".to_string()),
        |conversation: &mut Conversation| {
            if message.timestamp >= conversation.updated_at {
                conversation.updated_at = message.timestamp.clone();
                conversation.last_message = Some(message.clone());
            }
            Ok(())
        },
    )?;

    json_response(StatusCode::CREATED, &message)
}

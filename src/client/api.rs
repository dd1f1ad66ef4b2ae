use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::error::ClientError;
use crate::client::transport::Transport;
use crate::core::helpers::{Request, Response};
use crate::models::models::{
    AuthResponse, Conversation, FollowResponse, Message, Post, Tribe, TribeMessage, User,
};

/// Partial profile update; unset fields are left untouched by the server.
#[derive(Serialize, Default, Clone, Debug)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_url: Option<String>,
}

/// Tribe fields for create and edit.
///
/// `avatar_url` is tri-state on edit: `None` keeps the current avatar,
/// `Some(None)` clears it and `Some(Some(url))` replaces it.
#[derive(Serialize, Default, Clone, Debug)]
pub struct TribeDraft {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

/// Typed wrapper over the REST surface. The bearer token is attached to
/// every request once set by [`ApiClient::login`] or [`ApiClient::register`].
pub struct ApiClient<T> {
    transport: T,
    token: Option<String>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        ApiClient { transport, token: None }
    }

    pub fn with_token(transport: T, token: impl Into<String>) -> Self {
        ApiClient { transport, token: Some(token.into()) }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn build(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Request, ClientError> {
        let mut builder = http::Request::builder().method(method).uri(path);
        if let Some(token) = &self.token {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let bytes = match body {
            Some(value) => {
                builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                serde_json::to_vec(value)?
            }
            None => Vec::new(),
        };
        Ok(builder.body(bytes)?)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response, ClientError> {
        let req = self.build(method, path, body)?;
        let resp = self.transport.send(req).await?;
        if resp.status().is_success() {
            return Ok(resp);
        }

        let message = serde_json::from_slice::<Value>(resp.body())
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or_else(|| resp.status().to_string());
        Err(ClientError::Api {
            status: resp.status().as_u16(),
            message,
        })
    }

    async fn call<R: DeserializeOwned>(&self, method: Method, path: &str, body: Option<&Value>) -> Result<R, ClientError> {
        let resp = self.send(method, path, body).await?;
        Ok(serde_json::from_slice(resp.body())?)
    }

    // Auth

    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = json!({ "email": email, "password": password });
        let auth: AuthResponse = self.call(Method::POST, "/auth/login", Some(&body)).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn register(&mut self, name: &str, username: &str, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = json!({ "name": name, "username": username, "email": email, "password": password });
        let auth: AuthResponse = self.call(Method::POST, "/auth/register", Some(&body)).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    // Users

    pub async fn fetch_users(&self) -> Result<Vec<User>, ClientError> {
        self.call(Method::GET, "/users", None).await
    }

    pub async fn fetch_user(&self, id: &str) -> Result<User, ClientError> {
        self.call(Method::GET, &format!("/users/{}", id), None).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let body = serde_json::to_value(update)?;
        self.call(Method::PUT, "/users/profile", Some(&body)).await
    }

    pub async fn toggle_follow(&self, id: &str) -> Result<FollowResponse, ClientError> {
        self.call(Method::PUT, &format!("/users/{}/follow", id), None).await
    }

    // Posts

    pub async fn fetch_posts(&self) -> Result<Vec<Post>, ClientError> {
        self.call(Method::GET, "/posts", None).await
    }

    pub async fn fetch_post(&self, id: &str) -> Result<Post, ClientError> {
        self.call(Method::GET, &format!("/posts/{}", id), None).await
    }

    pub async fn create_post(&self, content: &str, image_url: Option<&str>) -> Result<Post, ClientError> {
        let body = json!({ "content": content, "image_url": image_url });
        self.call(Method::POST, "/posts", Some(&body)).await
    }

    pub async fn delete_post(&self, id: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, &format!("/posts/{}", id), None).await?;
        Ok(())
    }

    pub async fn like_post(&self, id: &str) -> Result<Post, ClientError> {
        self.call(Method::PUT, &format!("/posts/{}/like", id), None).await
    }

    pub async fn comment_on_post(&self, id: &str, text: &str) -> Result<Post, ClientError> {
        let body = json!({ "text": text });
        self.call(Method::POST, &format!("/posts/{}/comments", id), Some(&body)).await
    }

    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<Post, ClientError> {
        self.call(Method::DELETE, &format!("/posts/{}/comments/{}", post_id, comment_id), None)
            .await
    }

    // Messages

    pub async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ClientError> {
        self.call(Method::GET, "/messages/conversations", None).await
    }

    pub async fn fetch_messages(&self, user_id: &str) -> Result<Vec<Message>, ClientError> {
        self.call(Method::GET, &format!("/messages/{}", user_id), None).await
    }

    pub async fn send_message(&self, user_id: &str, message: &str) -> Result<Message, ClientError> {
        let body = json!({ "message": message });
        self.call(Method::POST, &format!("/messages/send/{}", user_id), Some(&body)).await
    }

    // Tribes

    pub async fn fetch_tribes(&self) -> Result<Vec<Tribe>, ClientError> {
        self.call(Method::GET, "/tribes", None).await
    }

    pub async fn create_tribe(&self, draft: &TribeDraft) -> Result<Tribe, ClientError> {
        let body = serde_json::to_value(draft)?;
        self.call(Method::POST, "/tribes", Some(&body)).await
    }

    pub async fn update_tribe(&self, id: &str, draft: &TribeDraft) -> Result<Tribe, ClientError> {
        let body = serde_json::to_value(draft)?;
        self.call(Method::PUT, &format!("/tribes/{}", id), Some(&body)).await
    }

    pub async fn join_tribe(&self, id: &str) -> Result<Tribe, ClientError> {
        self.call(Method::PUT, &format!("/tribes/{}/join", id), None).await
    }

    pub async fn fetch_tribe_messages(&self, id: &str) -> Result<Vec<TribeMessage>, ClientError> {
        self.call(Method::GET, &format!("/tribes/{}/messages", id), None).await
    }

    pub async fn send_tribe_message(&self, id: &str, text: &str) -> Result<TribeMessage, ClientError> {
        let body = json!({ "text": text });
        self.call(Method::POST, &format!("/tribes/{}/messages", id), Some(&body)).await
    }
}

use crate::client::api::{ApiClient, ProfileUpdate, TribeDraft};
use crate::client::error::ClientError;
use crate::client::state::AppState;
use crate::client::transport::Transport;
use crate::core::helpers::{now_iso, toggle_membership};
use crate::models::models::{Conversation, FollowResponse, Message, Post, Tribe, TribeMessage, User};

/// One user-initiated mutation, run by [`crate::client::AppStore::dispatch`].
///
/// `apply` predicts the result locally and may reject the command up front.
/// `commit` folds the server's answer back in. Neither runs when `send`
/// fails; the store restores its snapshot instead.
#[allow(async_fn_in_trait)]
pub trait Command {
    type Output;

    fn label(&self) -> &'static str;

    fn apply(&self, _state: &mut AppState) -> Result<(), ClientError> {
        Ok(())
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<Self::Output, ClientError>;

    fn commit(&self, state: &mut AppState, output: &Self::Output);
}

fn require_text(text: &str, what: &str) -> Result<(), ClientError> {
    if text.trim().is_empty() {
        Err(ClientError::Invalid(format!("{} cannot be empty", what)))
    } else {
        Ok(())
    }
}

pub struct ToggleLike {
    pub post_id: String,
}

impl Command for ToggleLike {
    type Output = Post;

    fn label(&self) -> &'static str {
        "like"
    }

    fn apply(&self, state: &mut AppState) -> Result<(), ClientError> {
        let me = state.require_user()?.id.clone();
        let post = state
            .post_mut(&self.post_id)
            .ok_or_else(|| ClientError::Invalid("Post not loaded".to_string()))?;
        toggle_membership(&mut post.likes, &me);
        Ok(())
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<Post, ClientError> {
        api.like_post(&self.post_id).await
    }

    fn commit(&self, state: &mut AppState, post: &Post) {
        state.replace_post(post.clone());
    }
}

pub struct ToggleFollow {
    pub user_id: String,
}

impl Command for ToggleFollow {
    type Output = FollowResponse;

    fn label(&self) -> &'static str {
        "follow"
    }

    fn apply(&self, state: &mut AppState) -> Result<(), ClientError> {
        let me = state.require_user()?.id.clone();
        if me == self.user_id {
            return Err(ClientError::Invalid("You cannot follow yourself".to_string()));
        }

        let now_following = match state.current_user_mut() {
            Some(user) => toggle_membership(&mut user.following, &self.user_id),
            None => return Err(ClientError::Invalid("Not signed in".to_string())),
        };
        if let Some(target) = state.directory.get_mut(&self.user_id) {
            target.followers.retain(|id| *id != me);
            if now_following {
                target.followers.push(me);
            }
        }
        Ok(())
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<FollowResponse, ClientError> {
        api.toggle_follow(&self.user_id).await
    }

    fn commit(&self, state: &mut AppState, output: &FollowResponse) {
        let blocked = state
            .current_user()
            .map(|me| me.blocked_users.clone())
            .unwrap_or_default();
        let mut me = output.user.clone();
        me.blocked_users = blocked;
        state.directory.upsert(me);
        state.directory.upsert(output.target.clone());
    }
}

pub struct CreatePost {
    pub content: String,
    pub image_url: Option<String>,
}

impl Command for CreatePost {
    type Output = Post;

    fn label(&self) -> &'static str {
        "create post"
    }

    fn apply(&self, _state: &mut AppState) -> Result<(), ClientError> {
        require_text(&self.content, "Post")
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<Post, ClientError> {
        api.create_post(&self.content, self.image_url.as_deref()).await
    }

    fn commit(&self, state: &mut AppState, post: &Post) {
        state.posts.insert(0, post.clone());
    }
}

pub struct DeletePost {
    pub post_id: String,
}

impl Command for DeletePost {
    type Output = ();

    fn label(&self) -> &'static str {
        "delete post"
    }

    fn apply(&self, state: &mut AppState) -> Result<(), ClientError> {
        state.posts.retain(|p| p.id != self.post_id);
        Ok(())
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<(), ClientError> {
        api.delete_post(&self.post_id).await
    }

    fn commit(&self, _state: &mut AppState, _output: &()) {}
}

pub struct AddComment {
    pub post_id: String,
    pub text: String,
}

impl Command for AddComment {
    type Output = Post;

    fn label(&self) -> &'static str {
        "comment"
    }

    fn apply(&self, _state: &mut AppState) -> Result<(), ClientError> {
        require_text(&self.text, "Comment")
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<Post, ClientError> {
        api.comment_on_post(&self.post_id, &self.text).await
    }

    fn commit(&self, state: &mut AppState, post: &Post) {
        state.replace_post(post.clone());
    }
}

pub struct DeleteComment {
    pub post_id: String,
    pub comment_id: String,
}

impl Command for DeleteComment {
    type Output = Post;

    fn label(&self) -> &'static str {
        "delete comment"
    }

    fn apply(&self, state: &mut AppState) -> Result<(), ClientError> {
        if let Some(post) = state.post_mut(&self.post_id) {
            post.comments.retain(|c| c.id != self.comment_id);
        }
        Ok(())
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<Post, ClientError> {
        api.delete_comment(&self.post_id, &self.comment_id).await
    }

    fn commit(&self, state: &mut AppState, post: &Post) {
        state.replace_post(post.clone());
    }
}

pub struct UpdateProfile {
    pub changes: ProfileUpdate,
}

impl Command for UpdateProfile {
    type Output = User;

    fn label(&self) -> &'static str {
        "update profile"
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<User, ClientError> {
        api.update_profile(&self.changes).await
    }

    fn commit(&self, state: &mut AppState, user: &User) {
        let mut user = user.clone();
        if let Some(me) = state.current_user() {
            user.blocked_users = me.blocked_users.clone();
        }
        state.directory.upsert(user);
    }
}

/// Sends a direct message. A temporary message is shown in the open thread
/// until the server's copy replaces it.
pub struct SendMessage {
    pub to: String,
    pub text: String,
    temp_id: String,
}

impl SendMessage {
    pub fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        SendMessage {
            to: to.into(),
            text: text.into(),
            temp_id: format!("temp-{}", uuid::Uuid::new_v4()),
        }
    }
}

impl Command for SendMessage {
    type Output = Message;

    fn label(&self) -> &'static str {
        "send message"
    }

    fn apply(&self, state: &mut AppState) -> Result<(), ClientError> {
        require_text(&self.text, "Message")?;
        let me = state.require_user()?.id.clone();
        if me == self.to {
            return Err(ClientError::Invalid("You cannot message yourself".to_string()));
        }
        if let Some(thread) = state.thread.as_mut().filter(|t| t.with_user == self.to) {
            thread.messages.push(Message {
                id: self.temp_id.clone(),
                conversation_id: String::new(),
                sender_id: me,
                text: self.text.clone(),
                timestamp: now_iso(),
            });
        }
        Ok(())
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<Message, ClientError> {
        api.send_message(&self.to, &self.text).await
    }

    fn commit(&self, state: &mut AppState, message: &Message) {
        if let Some(thread) = state.thread.as_mut().filter(|t| t.with_user == self.to) {
            match thread.messages.iter_mut().find(|m| m.id == self.temp_id) {
                Some(temp) => *temp = message.clone(),
                None => thread.messages.push(message.clone()),
            }
        }
        let mut conversation = match state
            .conversations
            .iter()
            .position(|c| c.id == message.conversation_id)
        {
            Some(index) => state.conversations.remove(index),
            None => {
                // First message to this user opens the conversation.
                let mut participants = vec![state.me.clone(), self.to.clone()];
                participants.sort();
                Conversation {
                    id: message.conversation_id.clone(),
                    participants,
                    last_message: None,
                    updated_at: message.timestamp.clone(),
                }
            }
        };
        conversation.last_message = Some(message.clone());
        conversation.updated_at = message.timestamp.clone();
        state.conversations.insert(0, conversation);
    }
}

pub struct CreateTribe {
    pub draft: TribeDraft,
}

impl Command for CreateTribe {
    type Output = Tribe;

    fn label(&self) -> &'static str {
        "create tribe"
    }

    fn apply(&self, _state: &mut AppState) -> Result<(), ClientError> {
        require_text(&self.draft.name, "Tribe name")
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<Tribe, ClientError> {
        api.create_tribe(&self.draft).await
    }

    fn commit(&self, state: &mut AppState, tribe: &Tribe) {
        state.tribes.insert(0, tribe.clone());
    }
}

pub struct EditTribe {
    pub tribe_id: String,
    pub draft: TribeDraft,
}

impl Command for EditTribe {
    type Output = Tribe;

    fn label(&self) -> &'static str {
        "edit tribe"
    }

    fn apply(&self, _state: &mut AppState) -> Result<(), ClientError> {
        require_text(&self.draft.name, "Tribe name")
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<Tribe, ClientError> {
        api.update_tribe(&self.tribe_id, &self.draft).await
    }

    fn commit(&self, state: &mut AppState, tribe: &Tribe) {
        if let Some(existing) = state.tribe_mut(&self.tribe_id) {
            *existing = tribe.clone();
        }
    }
}

pub struct ToggleTribeMembership {
    pub tribe_id: String,
}

impl Command for ToggleTribeMembership {
    type Output = Tribe;

    fn label(&self) -> &'static str {
        "join tribe"
    }

    fn apply(&self, state: &mut AppState) -> Result<(), ClientError> {
        let me = state.require_user()?.id.clone();
        if let Some(tribe) = state.tribe_mut(&self.tribe_id) {
            toggle_membership(&mut tribe.members, &me);
        }
        Ok(())
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<Tribe, ClientError> {
        api.join_tribe(&self.tribe_id).await
    }

    fn commit(&self, state: &mut AppState, tribe: &Tribe) {
        if let Some(existing) = state.tribe_mut(&self.tribe_id) {
            existing.members = tribe.members.clone();
        }
    }
}

pub struct SendTribeMessage {
    pub tribe_id: String,
    pub text: String,
}

impl Command for SendTribeMessage {
    type Output = TribeMessage;

    fn label(&self) -> &'static str {
        "send tribe message"
    }

    fn apply(&self, _state: &mut AppState) -> Result<(), ClientError> {
        require_text(&self.text, "Message")
    }

    async fn send<T: Transport>(&self, api: &ApiClient<T>) -> Result<TribeMessage, ClientError> {
        api.send_tribe_message(&self.tribe_id, &self.text).await
    }

    fn commit(&self, state: &mut AppState, message: &TribeMessage) {
        if let Some(tribe) = state.tribe_mut(&self.tribe_id) {
            tribe.messages.push(message.clone());
        }
    }
}

//! Read-only selectors over [`AppState`]. Every foreign key is resolved
//! through the user directory here; records whose author or sender cannot be
//! resolved are left out, and blocked users never show up.

use crate::client::directory::UserDirectory;
use crate::client::state::AppState;
use crate::models::models::{Comment, Conversation, Message, Post, Tribe, TribeMessage, User};

const SUGGESTION_COUNT: usize = 6;

#[derive(Debug)]
pub struct CommentView<'a> {
    pub comment: &'a Comment,
    pub author: &'a User,
}

#[derive(Debug)]
pub struct PostView<'a> {
    pub post: &'a Post,
    pub author: &'a User,
    pub comments: Vec<CommentView<'a>>,
    pub liked_by_me: bool,
}

#[derive(Debug)]
pub struct MessageView<'a> {
    pub message: &'a Message,
    pub sender: &'a User,
}

#[derive(Debug)]
pub struct TribeMessageView<'a> {
    pub message: &'a TribeMessage,
    pub sender: &'a User,
}

#[derive(Debug)]
pub struct ConversationView<'a> {
    pub conversation: &'a Conversation,
    pub other: &'a User,
}

#[derive(Debug)]
pub struct TribeSummary<'a> {
    pub tribe: &'a Tribe,
    pub member_count: usize,
    pub joined: bool,
    pub is_creator: bool,
}

#[derive(Debug)]
pub struct TribeDetail<'a> {
    pub tribe: &'a Tribe,
    pub messages: Vec<TribeMessageView<'a>>,
    pub joined: bool,
}

#[derive(Debug)]
pub struct ProfileView<'a> {
    pub user: &'a User,
    pub posts: Vec<PostView<'a>>,
    pub is_me: bool,
    pub is_following: bool,
}

#[derive(Debug)]
pub enum DiscoverResult<'a> {
    /// No search term: a handful of other users to follow.
    Suggestions(Vec<&'a User>),
    Users(Vec<&'a User>),
    Posts(Vec<PostView<'a>>),
}

impl DiscoverResult<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            DiscoverResult::Suggestions(users) | DiscoverResult::Users(users) => users.is_empty(),
            DiscoverResult::Posts(posts) => posts.is_empty(),
        }
    }
}

/// Resolves a post's author and comment authors. `None` when the author is
/// unknown; comments with unknown authors are dropped.
pub fn populate_post<'a>(directory: &'a UserDirectory, post: &'a Post, me: &str) -> Option<PostView<'a>> {
    let author = directory.get(&post.user_id)?;
    let comments = post
        .comments
        .iter()
        .filter_map(|comment| {
            directory
                .get(&comment.user_id)
                .map(|author| CommentView { comment, author })
        })
        .collect();

    Some(PostView {
        post,
        author,
        comments,
        liked_by_me: post.likes.iter().any(|id| id == me),
    })
}

/// All resolvable posts not written by a blocked user, newest first.
pub fn visible_posts(state: &AppState) -> Vec<PostView<'_>> {
    let mut posts: Vec<PostView<'_>> = state
        .posts
        .iter()
        .filter(|p| !state.is_blocked(&p.user_id))
        .filter_map(|p| populate_post(&state.directory, p, &state.me))
        .collect();
    posts.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
    posts
}

pub fn visible_users(state: &AppState) -> Vec<&User> {
    state
        .directory
        .iter()
        .filter(|u| !state.is_blocked(&u.id))
        .collect()
}

/// Home feed: posts by followed users and by the current user.
pub fn feed(state: &AppState) -> Vec<PostView<'_>> {
    let Some(me) = state.current_user() else {
        return Vec::new();
    };
    visible_posts(state)
        .into_iter()
        .filter(|p| p.author.id == me.id || me.following.contains(&p.author.id))
        .collect()
}

/// Discover search. `#tag` searches post content, `@name` or plain text
/// searches other users by name and username.
pub fn discover<'a>(state: &'a AppState, term: &str) -> DiscoverResult<'a> {
    let term = term.trim().to_lowercase();
    let others: Vec<&User> = visible_users(state)
        .into_iter()
        .filter(|u| u.id != state.me)
        .collect();

    if term.is_empty() {
        return DiscoverResult::Suggestions(others.into_iter().take(SUGGESTION_COUNT).collect());
    }

    if let Some(tag) = term.strip_prefix('#') {
        if tag.is_empty() {
            return DiscoverResult::Posts(Vec::new());
        }
        let needle = format!("#{}", tag);
        return DiscoverResult::Posts(
            visible_posts(state)
                .into_iter()
                .filter(|p| p.post.content.to_lowercase().contains(&needle))
                .collect(),
        );
    }

    let query = term.strip_prefix('@').unwrap_or(&term);
    if query.is_empty() {
        return DiscoverResult::Users(Vec::new());
    }
    DiscoverResult::Users(
        others
            .into_iter()
            .filter(|u| u.name.to_lowercase().contains(query) || u.username.to_lowercase().contains(query))
            .collect(),
    )
}

/// `None` when the user is unknown or blocked.
pub fn profile<'a>(state: &'a AppState, user_id: &str) -> Option<ProfileView<'a>> {
    if state.is_blocked(user_id) {
        return None;
    }
    let user = state.directory.get(user_id)?;
    let is_following = state
        .current_user()
        .map_or(false, |me| me.following.iter().any(|id| id == user_id));

    Some(ProfileView {
        user,
        posts: visible_posts(state)
            .into_iter()
            .filter(|p| p.author.id == user_id)
            .collect(),
        is_me: user_id == state.me,
        is_following,
    })
}

/// Conversations with the other participant resolved, blocked users hidden.
pub fn conversations(state: &AppState) -> Vec<ConversationView<'_>> {
    state
        .conversations
        .iter()
        .filter_map(|conversation| {
            let other_id = conversation.other_participant(&state.me)?;
            if state.is_blocked(other_id) {
                return None;
            }
            let other = state.directory.get(other_id)?;
            Some(ConversationView { conversation, other })
        })
        .collect()
}

/// Messages of the open thread, oldest first.
pub fn thread(state: &AppState) -> Vec<MessageView<'_>> {
    state
        .thread
        .iter()
        .flat_map(|t| t.messages.iter())
        .filter_map(|message| {
            state
                .directory
                .get(&message.sender_id)
                .map(|sender| MessageView { message, sender })
        })
        .collect()
}

pub fn tribes(state: &AppState) -> Vec<TribeSummary<'_>> {
    state
        .tribes
        .iter()
        .map(|tribe| TribeSummary {
            tribe,
            member_count: tribe.members.len(),
            joined: tribe.members.iter().any(|id| *id == state.me),
            is_creator: tribe.creator_id == state.me,
        })
        .collect()
}

pub fn tribe_detail<'a>(state: &'a AppState, tribe_id: &str) -> Option<TribeDetail<'a>> {
    let tribe = state.tribes.iter().find(|t| t.id == tribe_id)?;
    let messages = tribe
        .messages
        .iter()
        .filter_map(|message| {
            state
                .directory
                .get(&message.sender_id)
                .map(|sender| TribeMessageView { message, sender })
        })
        .collect();

    Some(TribeDetail {
        tribe,
        messages,
        joined: tribe.members.iter().any(|id| *id == state.me),
    })
}

use http::StatusCode;
use serde::Deserialize;

use crate::auth::authenticate;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{
    hashtags, json_response, new_id, no_content, now_iso, parse_body, require_text,
    toggle_membership, Request, Response,
};
use crate::core::query_params::{get_page, get_string, parse_query_params};
use crate::core::store::Store;
use crate::models::models::{Comment, Post, User};

#[derive(Deserialize)]
struct NewPost {
    #[serde(default)]
    content: String,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Deserialize)]
struct NewComment {
    #[serde(default)]
    text: String,
}

fn load_post(store: &Store, post_id: &str) -> Result<Post, ApiError> {
    store
        .get_json::<Post>(&post_key(post_id))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// Atomically edits a stored post; 404 when it does not exist.
fn edit_post<R>(store: &Store, post_id: &str, f: impl FnOnce(&mut Post) -> Result<R, ApiError>) -> Result<R, ApiError> {
    store.update_existing(&post_key(post_id), || ApiError::NotFound("Post not found".to_string()), f)
}

fn is_moderator(user: &User, moderators: &[String]) -> bool {
    moderators.iter().any(|m| *m == user.username)
}

pub fn can_delete_post(user: &User, post: &Post, moderators: &[String]) -> bool {
    post.user_id == user.id || is_moderator(user, moderators)
}

pub fn can_delete_comment(user: &User, post: &Post, comment: &Comment, moderators: &[String]) -> bool {
    comment.user_id == user.id || can_delete_post(user, post, moderators)
}

pub fn create_post(store: &Store, req: &Request) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let body: NewPost = parse_body(req)?;

    let content = require_text(&body.content, "Content", MAX_POST_LENGTH)?;
    let id = new_id();

    let post = Post {
        id: id.clone(),
        user_id: me.id,
        content,
        image_url: body
            .image_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty()),
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&post_key(&id), &post)?;
    store.update_list(FEED_KEY, |feed| feed.insert(0, id))?; // prepend newest

    json_response(StatusCode::CREATED, &post)
}

/// `GET /posts` with optional `author`, `tag` and `page` filters.
pub fn list_posts(store: &Store, req: &Request) -> Result<Response, ApiError> {
    authenticate(store, req)?;

    let params = parse_query_params(req.uri().query());
    let author = get_string(&params, "author");
    let tag = get_string(&params, "tag").map(|t| t.trim_start_matches('#').to_lowercase());
    let page = get_page(&params, "page");

    let mut posts = Vec::new();
    for id in store.get_list(FEED_KEY)? {
        if let Some(p) = store.get_json::<Post>(&post_key(&id))? {
            if author.as_ref().map_or(false, |a| *a != p.user_id) {
                continue;
            }
            if tag.as_ref().map_or(false, |t| !hashtags(&p.content).contains(t)) {
                continue;
            }
            posts.push(p);
        }
    }

    let posts: Vec<Post> = match page {
        Some(page) => posts
            .into_iter()
            .skip((page - 1).saturating_mul(POSTS_PER_PAGE))
            .take(POSTS_PER_PAGE)
            .collect(),
        None => posts,
    };

    json_response(StatusCode::OK, &posts)
}

pub fn get_post(store: &Store, req: &Request, post_id: &str) -> Result<Response, ApiError> {
    authenticate(store, req)?;
    json_response(StatusCode::OK, &load_post(store, post_id)?)
}

pub fn delete_post(store: &Store, req: &Request, post_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let post = load_post(store, post_id)?;

    if !can_delete_post(&me, &post, &moderators()) {
        return Err(ApiError::Forbidden);
    }

    store.delete(&post_key(post_id))?;

    store.update_list(FEED_KEY, |feed| feed.retain(|id| id != post_id))?;

    Ok(no_content())
}

/// `PUT /posts/:id/like` toggles the caller's like.
pub fn like_post(store: &Store, req: &Request, post_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let post = edit_post(store, post_id, |post| {
        toggle_membership(&mut post.likes, &me.id);
        Ok(post.clone())
    })?;

    json_response(StatusCode::OK, &post)
}

pub fn add_comment(store: &Store, req: &Request, post_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let body: NewComment = parse_body(req)?;
    let text = require_text(&body.text, "Comment", MAX_COMMENT_LENGTH)?;

    let comment = Comment {
        id: new_id(),
        user_id: me.id,
        text,
        created_at: now_iso(),
    };
    let post = edit_post(store, post_id, |post| {
        post.comments.push(comment);
        Ok(post.clone())
    })?;

    json_response(StatusCode::CREATED, &post)
}

/// Removes exactly the matching comment; siblings keep their order.
pub fn delete_comment(store: &Store, req: &Request, post_id: &str, comment_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let moderators = moderators();

    let post = edit_post(store, post_id, |post| {
        let index = post
            .comments
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

        if !can_delete_comment(&me, post, &post.comments[index], &moderators) {
            return Err(ApiError::Forbidden);
        }

        post.comments.remove(index);
        Ok(post.clone())
    })?;

    json_response(StatusCode::OK, &post)
}

use http::StatusCode;

use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, validate_uuid, Request, Response};
use crate::core::store::Store;
use crate::{auth, follow, messages, posts, tribes, users};

/// Single entry point shared by the native server and the Spin component.
pub fn handle(store: &Store, req: &Request) -> Response {
    match route(store, req) {
        Ok(response) => response,
        Err(err) => {
            log::debug!("{} {} -> {}", req.method(), req.uri().path(), err);
            err.into()
        }
    }
}

fn id(raw: &str) -> Result<&str, ApiError> {
    if validate_uuid(raw) {
        Ok(raw)
    } else {
        Err(ApiError::BadRequest("Invalid id".to_string()))
    }
}

/// Path segments with an optional `/api` prefix removed.
fn segments(path: &str) -> Vec<&str> {
    let path = match path.strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn route(store: &Store, req: &Request) -> Result<Response, ApiError> {
    let segments = segments(req.uri().path());

    match (req.method().as_str(), segments.as_slice()) {
        ("GET", ["health"]) => json_response(StatusCode::OK, &serde_json::json!({"status": "ok"})),

        ("POST", ["auth", "register"]) => auth::register_user(store, req),
        ("POST", ["auth", "login"]) => auth::login_user(store, req),

        ("GET", ["users"]) => users::list_users(store, req),
        ("PUT", ["users", "profile"]) => users::update_profile(store, req),
        ("GET", ["users", user_id]) => users::get_user(store, req, id(user_id)?),
        ("PUT", ["users", user_id, "follow"]) => follow::handle_toggle_follow(store, req, id(user_id)?),

        ("GET", ["posts"]) => posts::list_posts(store, req),
        ("POST", ["posts"]) => posts::create_post(store, req),
        ("GET", ["posts", post_id]) => posts::get_post(store, req, id(post_id)?),
        ("DELETE", ["posts", post_id]) => posts::delete_post(store, req, id(post_id)?),
        ("PUT", ["posts", post_id, "like"]) => posts::like_post(store, req, id(post_id)?),
        ("POST", ["posts", post_id, "comments"]) => posts::add_comment(store, req, id(post_id)?),
        ("DELETE", ["posts", post_id, "comments", comment_id]) => {
            posts::delete_comment(store, req, id(post_id)?, id(comment_id)?)
        }

        ("GET", ["messages", "conversations"]) => messages::list_conversations(store, req),
        ("GET", ["messages", user_id]) => messages::get_messages(store, req, id(user_id)?),
        ("POST", ["messages", "send", user_id]) => messages::send_message(store, req, id(user_id)?),

        ("GET", ["tribes"]) => tribes::list_tribes(store, req),
        ("POST", ["tribes"]) => tribes::create_tribe(store, req),
        ("PUT", ["tribes", tribe_id]) => tribes::update_tribe(store, req, id(tribe_id)?),
        ("PUT", ["tribes", tribe_id, "join"]) => tribes::toggle_join(store, req, id(tribe_id)?),
        ("GET", ["tribes", tribe_id, "messages"]) => tribes::get_tribe_messages(store, req, id(tribe_id)?),
        ("POST", ["tribes", tribe_id, "messages"]) => tribes::send_tribe_message(store, req, id(tribe_id)?),

        _ => Err(ApiError::NotFound("No route found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_prefix_is_optional() {
        assert_eq!(segments("/api/posts/1/like"), vec!["posts", "1", "like"]);
        assert_eq!(segments("/posts/1/like/"), vec!["posts", "1", "like"]);
        assert_eq!(segments("/apiary"), vec!["apiary"]);
    }

    #[test]
    fn unknown_routes_are_404() {
        let store = Store::memory();
        let req = http::Request::builder().uri("/nope").body(Vec::new()).unwrap();
        assert_eq!(handle(&store, &req).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn health_needs_no_token() {
        let store = Store::memory();
        let req = http::Request::builder().uri("/health").body(Vec::new()).unwrap();
        assert_eq!(handle(&store, &req).status(), StatusCode::OK);
    }
}

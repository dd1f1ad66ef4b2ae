pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MAX_NAME_LENGTH: usize = 80;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_MESSAGE_LENGTH: usize = 2000;
pub const MAX_TRIBE_NAME_LENGTH: usize = 80;
pub const MAX_TRIBE_DESCRIPTION_LENGTH: usize = 1000;
pub const POSTS_PER_PAGE: usize = 20;

pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";
pub const TRIBES_LIST_KEY: &str = "tribes_list";

const DEFAULT_JWT_SECRET: &str = "star-development-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

pub fn token_expiration_hours() -> i64 {
    std::env::var("STAR_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn jwt_secret() -> String {
    std::env::var("STAR_JWT_SECRET")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string())
}

pub fn bind_addr() -> String {
    std::env::var("STAR_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}

pub fn seed_demo_data() -> bool {
    std::env::var("STAR_SEED_DEMO")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true)
}

/// Usernames allowed to delete any post or comment.
pub fn moderators() -> Vec<String> {
    std::env::var("STAR_MODERATORS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

/// Owner record for a username; holds the user id.
pub fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

pub fn email_key(email: &str) -> String {
    format!("email:{}", email)
}

pub fn tribe_key(id: &str) -> String {
    format!("tribe:{}", id)
}

pub fn conversation_key(id: &str) -> String {
    format!("conversation:{}", id)
}

pub fn conversation_messages_key(id: &str) -> String {
    format!("conversation_messages:{}", id)
}

pub fn user_conversations_key(user_id: &str) -> String {
    format!("conversations:{}", user_id)
}

/// Key is independent of argument order.
pub fn conversation_pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("conversation_pair:{}:{}", a, b)
    } else {
        format!("conversation_pair:{}:{}", b, a)
    }
}

use std::collections::HashSet;
use std::sync::OnceLock;

use ammonia::Builder;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use argon2::password_hash::SaltString;
use http::StatusCode;
use rand::rngs::OsRng;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::core::errors::ApiError;

pub type Request = http::Request<Vec<u8>>;
pub type Response = http::Response<Vec<u8>>;

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Strips all markup, leaving plain text. Entities produced by the cleaner
/// are decoded again, so `Tom & Jerry` is stored as typed.
pub fn sanitize_text(text: &str) -> String {
    let cleaned = Builder::default().tags(HashSet::new()).clean(text).to_string();
    html_escape::decode_html_entities(&cleaned).into_owned()
}

fn hashtag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"#(\w+)").expect("Regex should compile"))
}

/// Lower-cased hashtags in order of appearance, without the leading `#`.
pub fn hashtags(content: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for caps in hashtag_regex().captures_iter(content) {
        let tag = caps[1].to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Parses a JSON request body into `T`, mapping failures to 400.
pub fn parse_body<T: DeserializeOwned>(req: &Request) -> Result<T, ApiError> {
    let body: &[u8] = if req.body().is_empty() { b"{}" } else { req.body() };
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response, ApiError> {
    let mut response = Response::new(serde_json::to_vec(value)?);
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

pub fn no_content() -> Response {
    let mut response = Response::new(Vec::new());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// Sanitizes a text field, then checks the trimmed result against
/// `1..=max` characters.
pub fn require_text(value: &str, field: &str, max: usize) -> Result<String, ApiError> {
    let text = sanitize_text(value);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::BadRequest(format!("{} too long (max {} chars)", field, max)));
    }
    Ok(trimmed.to_string())
}

/// Inserts `id` if absent, removes it otherwise. Returns whether it is now present.
pub fn toggle_membership(ids: &mut Vec<String>, id: &str) -> bool {
    if ids.iter().any(|existing| existing == id) {
        ids.retain(|existing| existing != id);
        false
    } else {
        ids.push(id.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("secret").unwrap();
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("secret", "not-a-hash"));
    }

    #[test]
    fn sanitize_strips_markup() {
        assert_eq!(sanitize_text("<b>hi</b> there"), "hi there");
        assert_eq!(sanitize_text("<script>alert(1)</script>ok"), "ok");
    }

    #[test]
    fn sanitize_keeps_plain_text_as_typed() {
        assert_eq!(sanitize_text("Tom & Jerry: 1 < 2 #fun"), "Tom & Jerry: 1 < 2 #fun");
        assert_eq!(sanitize_text("\"quoted\" it's"), "\"quoted\" it's");
    }

    #[test]
    fn hashtags_are_deduplicated_and_lowercased() {
        assert_eq!(hashtags("hello #React and #rust #react"), vec!["react", "rust"]);
        assert!(hashtags("no tags # here").is_empty());
    }

    #[test]
    fn require_text_trims_and_bounds() {
        assert_eq!(require_text("  hi ", "Text", 5).unwrap(), "hi");
        assert!(matches!(require_text("   ", "Text", 5), Err(ApiError::BadRequest(_))));
        assert!(matches!(require_text("toolong", "Text", 5), Err(ApiError::BadRequest(_))));
        assert!(matches!(require_text("<script>x</script>", "Text", 5), Err(ApiError::BadRequest(_))));
        // Limits apply to the stored text, not the markup.
        assert_eq!(require_text("<b>hello</b>", "Text", 5).unwrap(), "hello");
    }

    #[test]
    fn toggle_membership_is_its_own_inverse() {
        let mut ids = vec!["a".to_string()];
        assert!(toggle_membership(&mut ids, "b"));
        assert_eq!(ids, vec!["a", "b"]);
        assert!(!toggle_membership(&mut ids, "b"));
        assert_eq!(ids, vec!["a"]);
    }
}

use http::StatusCode;

use crate::auth::authenticate;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, toggle_membership, Request, Response};
use crate::core::store::Store;
use crate::models::models::{FollowResponse, UserRecord};
use crate::users::load_user;

/// Toggles the (actor, target) edge on both user documents. Returns whether
/// the actor follows the target afterwards.
///
/// The two writes are not transactional: a failure between them leaves the
/// sides out of step until the next toggle.
pub fn toggle_follow(store: &Store, actor_id: &str, target_id: &str) -> Result<FollowResponse, ApiError> {
    if actor_id == target_id {
        return Err(ApiError::BadRequest("You cannot follow yourself".to_string()));
    }

    // 404 for an unknown target before anything is written.
    load_user(store, target_id)?;

    let missing = || ApiError::NotFound("User not found".to_string());
    let (following, actor) = store.update_existing(&user_key(actor_id), missing, |record: &mut UserRecord| {
        let following = toggle_membership(&mut record.profile.following, target_id);
        Ok((following, record.profile.clone()))
    })?;
    // Written as a set so a half-written edge from an earlier failure is repaired.
    let target = store.update_existing(&user_key(target_id), missing, |record: &mut UserRecord| {
        record.profile.followers.retain(|id| id != actor_id);
        if following {
            record.profile.followers.push(actor_id.to_string());
        }
        Ok(record.profile.clone())
    })?;

    log::debug!(
        "{} {} {}",
        actor_id,
        if following { "followed" } else { "unfollowed" },
        target_id
    );

    Ok(FollowResponse {
        message: "Follow status updated".to_string(),
        following,
        user: actor,
        target,
    })
}

/// `PUT /users/:id/follow`
pub fn handle_toggle_follow(store: &Store, req: &Request, target_id: &str) -> Result<Response, ApiError> {
    let me = authenticate(store, req)?;
    let result = toggle_follow(store, &me.id, target_id)?;
    json_response(StatusCode::OK, &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::helpers::now_iso;
    use crate::models::models::{User, UserRecord};

    fn seed_user(store: &Store, id: &str) {
        let record = UserRecord {
            profile: User {
                id: id.to_string(),
                name: id.to_string(),
                username: id.to_string(),
                email: format!("{}@example.com", id),
                bio: String::new(),
                avatar_url: None,
                banner_url: None,
                following: Vec::new(),
                followers: Vec::new(),
                blocked_users: Vec::new(),
                created_at: now_iso(),
            },
            password: String::new(),
        };
        store.set_json(&user_key(id), &record).unwrap();
    }

    #[test]
    fn toggle_is_its_own_inverse() {
        let store = Store::memory();
        seed_user(&store, "a");
        seed_user(&store, "b");

        let first = toggle_follow(&store, "a", "b").unwrap();
        assert!(first.following);
        assert_eq!(first.user.following, vec!["b"]);
        assert_eq!(first.target.followers, vec!["a"]);

        let second = toggle_follow(&store, "a", "b").unwrap();
        assert!(!second.following);
        assert!(load_user(&store, "a").unwrap().profile.following.is_empty());
        assert!(load_user(&store, "b").unwrap().profile.followers.is_empty());
    }

    #[test]
    fn self_follow_is_rejected() {
        let store = Store::memory();
        seed_user(&store, "a");
        assert!(matches!(toggle_follow(&store, "a", "a"), Err(ApiError::BadRequest(_))));
        assert!(load_user(&store, "a").unwrap().profile.following.is_empty());
    }

    #[test]
    fn unknown_target_is_not_found() {
        let store = Store::memory();
        seed_user(&store, "a");
        assert!(matches!(toggle_follow(&store, "a", "zzz"), Err(ApiError::NotFound(_))));
    }
}

use crate::config::*;
use crate::core::helpers::{hash_password, new_id, now_iso};
use crate::core::store::Store;
use crate::models::models::{Conversation, Post, Tribe, TribeMessage, User, UserRecord};

const DEMO_USERS: [(&str, &str, &str); 3] = [
    ("test", "Test User", "Test user bio"),
    ("alice", "Alice", "Hello, I'm Alice!"),
    ("bob", "Bob", "Bob's corner of the internet"),
];

fn find_username(store: &Store, username: &str) -> anyhow::Result<Option<UserRecord>> {
    for id in store.get_list(USERS_LIST_KEY)? {
        if let Some(u) = store.get_json::<UserRecord>(&user_key(&id))? {
            if u.profile.username == username {
                return Ok(Some(u));
            }
        }
    }
    Ok(None)
}

fn create_demo_user(store: &Store, username: &str, name: &str, bio: &str) -> anyhow::Result<String> {
    let id = new_id();
    let record = UserRecord {
        profile: User {
            id: id.clone(),
            name: name.to_string(),
            username: username.to_string(),
            email: format!("{}@star.local", username),
            bio: bio.to_string(),
            avatar_url: None,
            banner_url: None,
            following: Vec::new(),
            followers: Vec::new(),
            blocked_users: Vec::new(),
            created_at: now_iso(),
        },
        // Demo passwords equal the username.
        password: hash_password(username)?,
    };
    crate::auth::insert_user(store, &record)?;
    Ok(id)
}

fn create_demo_post(store: &Store, user_id: &str, content: &str) -> anyhow::Result<()> {
    let post = Post {
        id: new_id(),
        user_id: user_id.to_string(),
        content: content.to_string(),
        image_url: None,
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: now_iso(),
        updated_at: None,
    };
    store.set_json(&post_key(&post.id), &post)?;
    store.update_list(FEED_KEY, |feed| feed.insert(0, post.id.clone()))?;
    Ok(())
}

/// Seeds demo users, posts, a follow edge and a tribe. Does nothing when the
/// demo users already exist.
pub fn init_test_data(store: &Store) -> anyhow::Result<()> {
    let mut ids = Vec::new();
    let mut created_any = false;
    for (username, name, bio) in DEMO_USERS {
        match find_username(store, username)? {
            Some(existing) => ids.push(existing.profile.id),
            None => {
                ids.push(create_demo_user(store, username, name, bio)?);
                created_any = true;
            }
        }
    }

    if !created_any {
        return Ok(()); // Already initialized
    }

    let (test_id, alice_id, bob_id) = (&ids[0], &ids[1], &ids[2]);

    create_demo_post(store, test_id, "This is my first post on Star!")?;
    create_demo_post(store, alice_id, "Welcome to my corner! Excited to share thoughts here. #hello")?;
    create_demo_post(store, alice_id, "Just finished an amazing project. #rust #productive")?;
    create_demo_post(store, bob_id, "Hey everyone! Just joined, looking forward to connecting with you all.")?;

    // "test" follows "bob"
    if let (Some(mut test), Some(mut bob)) = (
        store.get_json::<UserRecord>(&user_key(test_id))?,
        store.get_json::<UserRecord>(&user_key(bob_id))?,
    ) {
        if !test.profile.following.contains(bob_id) {
            test.profile.following.push(bob_id.clone());
            bob.profile.followers.push(test_id.clone());
            store.set_json(&user_key(test_id), &test)?;
            store.set_json(&user_key(bob_id), &bob)?;
        }
    }

    let tribe = Tribe {
        id: new_id(),
        name: "Rustaceans".to_string(),
        description: "Talk about crabs, borrow checkers and everything in between".to_string(),
        avatar_url: None,
        creator_id: alice_id.clone(),
        members: vec![alice_id.clone(), bob_id.clone()],
        messages: vec![TribeMessage {
            id: new_id(),
            sender_id: alice_id.clone(),
            text: "Welcome to the tribe!".to_string(),
            timestamp: now_iso(),
        }],
        created_at: now_iso(),
    };
    store.set_json(&tribe_key(&tribe.id), &tribe)?;
    store.update_list(TRIBES_LIST_KEY, |tribes| tribes.insert(0, tribe.id.clone()))?;

    log::info!("seeded demo data (users: test, alice, bob)");
    Ok(())
}

pub fn reset_db_data(store: &Store) -> anyhow::Result<()> {
    let users = store.get_list(USERS_LIST_KEY)?;

    for user_id in &users {
        for conversation_id in store.get_list(&user_conversations_key(user_id))? {
            if let Some(c) = store.get_json::<Conversation>(&conversation_key(&conversation_id))? {
                store.delete(&conversation_pair_key(&c.participants[0], &c.participants[1]))?;
            }
            store.delete(&conversation_key(&conversation_id))?;
            store.delete(&conversation_messages_key(&conversation_id))?;
        }
        store.delete(&user_conversations_key(user_id))?;
        if let Some(record) = store.get_json::<UserRecord>(&user_key(user_id))? {
            store.delete(&username_key(&record.profile.username))?;
            store.delete(&email_key(&record.profile.email))?;
        }
        store.delete(&user_key(user_id))?;
    }

    for id in store.get_list(FEED_KEY)? {
        store.delete(&post_key(&id))?;
    }

    for id in store.get_list(TRIBES_LIST_KEY)? {
        store.delete(&tribe_key(&id))?;
    }

    // Delete metadata
    store.delete(USERS_LIST_KEY)?;
    store.delete(FEED_KEY)?;
    store.delete(TRIBES_LIST_KEY)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_is_idempotent() {
        let store = Store::memory();
        init_test_data(&store).unwrap();
        init_test_data(&store).unwrap();

        assert_eq!(store.get_list(USERS_LIST_KEY).unwrap().len(), 3);
        assert_eq!(store.get_list(FEED_KEY).unwrap().len(), 4);
        assert_eq!(store.get_list(TRIBES_LIST_KEY).unwrap().len(), 1);

        let test = find_username(&store, "test").unwrap().unwrap();
        let bob = find_username(&store, "bob").unwrap().unwrap();
        assert_eq!(test.profile.following, vec![bob.profile.id.clone()]);
        assert_eq!(bob.profile.followers, vec![test.profile.id]);
    }

    #[test]
    fn reset_clears_everything() {
        let store = Store::memory();
        init_test_data(&store).unwrap();
        reset_db_data(&store).unwrap();

        assert!(store.get_list(USERS_LIST_KEY).unwrap().is_empty());
        assert!(store.get_list(FEED_KEY).unwrap().is_empty());
        assert!(find_username(&store, "alice").unwrap().is_none());

        // Demo usernames can be seeded again after a reset.
        init_test_data(&store).unwrap();
        assert_eq!(store.get_list(USERS_LIST_KEY).unwrap().len(), 3);
        assert!(store.get_json::<String>(&username_key("alice")).unwrap().is_some());
    }
}

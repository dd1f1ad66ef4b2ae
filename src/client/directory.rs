use std::collections::HashMap;

use crate::models::models::User;

/// Cached users keyed by id, in the order the server listed them.
///
/// Invalidation: a full sync replaces the whole directory; any response that
/// carries a user (profile update, follow toggle, login) upserts that single
/// entry. Nothing else writes to it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserDirectory {
    order: Vec<String>,
    users: HashMap<String, User>,
}

impl UserDirectory {
    pub fn replace_all(&mut self, users: Vec<User>) {
        self.order.clear();
        self.users.clear();
        for user in users {
            self.upsert(user);
        }
    }

    pub fn upsert(&mut self, user: User) {
        if !self.users.contains_key(&user.id) {
            self.order.push(user.id.clone());
        }
        self.users.insert(user.id.clone(), user);
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut User> {
        self.users.get_mut(id)
    }

    /// Every cached user in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.order.iter().filter_map(|id| self.users.get(id))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            username: name.to_lowercase(),
            email: format!("{}@example.com", id),
            bio: String::new(),
            avatar_url: None,
            banner_url: None,
            following: Vec::new(),
            followers: Vec::new(),
            blocked_users: Vec::new(),
            created_at: String::new(),
        }
    }

    #[test]
    fn upsert_keeps_listing_order() {
        let mut dir = UserDirectory::default();
        dir.replace_all(vec![user("1", "Ann"), user("2", "Ben")]);
        dir.upsert(user("1", "Annie"));
        dir.upsert(user("3", "Cy"));

        let names: Vec<&str> = dir.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Annie", "Ben", "Cy"]);
        assert_eq!(dir.len(), 3);
    }

    #[test]
    fn replace_all_drops_stale_entries() {
        let mut dir = UserDirectory::default();
        dir.replace_all(vec![user("1", "Ann")]);
        dir.replace_all(vec![user("2", "Ben")]);
        assert!(dir.get("1").is_none());
        assert_eq!(dir.get("2").map(|u| u.name.as_str()), Some("Ben"));
    }
}

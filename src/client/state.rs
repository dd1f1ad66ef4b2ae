use crate::client::api::ApiClient;
use crate::client::commands::Command;
use crate::client::directory::UserDirectory;
use crate::client::error::ClientError;
use crate::client::transport::Transport;
use crate::models::models::{Conversation, Message, Post, Tribe, User};

/// The open direct-message thread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Thread {
    pub with_user: String,
    pub messages: Vec<Message>,
}

/// Everything the screens render from. Foreign keys stay raw; see
/// [`crate::client::views`] for the populated forms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    /// Id of the signed-in user, empty when signed out.
    pub me: String,
    pub directory: UserDirectory,
    pub posts: Vec<Post>,
    pub tribes: Vec<Tribe>,
    pub conversations: Vec<Conversation>,
    pub thread: Option<Thread>,
}

impl AppState {
    pub fn current_user(&self) -> Option<&User> {
        self.directory.get(&self.me)
    }

    pub fn current_user_mut(&mut self) -> Option<&mut User> {
        let me = self.me.clone();
        self.directory.get_mut(&me)
    }

    pub fn require_user(&self) -> Result<&User, ClientError> {
        self.current_user()
            .ok_or_else(|| ClientError::Invalid("Not signed in".to_string()))
    }

    pub fn post_mut(&mut self, post_id: &str) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == post_id)
    }

    pub fn tribe_mut(&mut self, tribe_id: &str) -> Option<&mut Tribe> {
        self.tribes.iter_mut().find(|t| t.id == tribe_id)
    }

    /// Replaces the stored post with the server's copy.
    pub fn replace_post(&mut self, post: Post) {
        if let Some(existing) = self.post_mut(&post.id) {
            *existing = post;
        }
    }

    pub fn is_blocked(&self, user_id: &str) -> bool {
        self.current_user()
            .map_or(false, |me| me.blocked_users.iter().any(|id| id == user_id))
    }
}

/// User-facing failure record, the equivalent of a toast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub action: &'static str,
    pub message: String,
}

/// Session state plus the client that keeps it in step with the server.
pub struct AppStore<T> {
    api: ApiClient<T>,
    state: AppState,
    notices: Vec<Notice>,
}

impl<T: Transport> AppStore<T> {
    pub fn new(api: ApiClient<T>) -> Self {
        AppStore {
            api,
            state: AppState::default(),
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, action: &'static str, err: &ClientError) {
        log::warn!("{} failed: {}", action, err);
        self.notices.push(Notice {
            action,
            message: err.to_string(),
        });
    }

    fn fail(&mut self, action: &'static str, err: ClientError) -> ClientError {
        self.notify(action, &err);
        err
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        match self.api.login(email, password).await {
            Ok(auth) => self.start_session(auth.user).await,
            Err(e) => Err(self.fail("login", e)),
        }
    }

    pub async fn register(&mut self, name: &str, username: &str, email: &str, password: &str) -> Result<(), ClientError> {
        match self.api.register(name, username, email, password).await {
            Ok(auth) => self.start_session(auth.user).await,
            Err(e) => Err(self.fail("register", e)),
        }
    }

    async fn start_session(&mut self, user: User) -> Result<(), ClientError> {
        self.state = AppState {
            me: user.id.clone(),
            ..AppState::default()
        };
        self.state.directory.upsert(user);
        self.sync().await
    }

    pub fn logout(&mut self) {
        self.api.set_token(None);
        self.state = AppState::default();
        self.notices.clear();
    }

    /// Fetches users, posts and tribes concurrently and replaces the cached
    /// copies. On failure the previous state is kept.
    pub async fn sync(&mut self) -> Result<(), ClientError> {
        let fetched = tokio::try_join!(
            self.api.fetch_users(),
            self.api.fetch_posts(),
            self.api.fetch_tribes(),
        );

        match fetched {
            Ok((users, posts, tribes)) => {
                let me = self.state.current_user().cloned();
                self.state.directory.replace_all(users);
                // Blocks are never sent to the server; carry them over.
                if let (Some(me), Some(fresh)) = (me, self.state.current_user_mut()) {
                    fresh.blocked_users = me.blocked_users;
                }
                self.state.posts = posts;
                self.state.tribes = tribes;
                Ok(())
            }
            Err(e) => Err(self.fail("sync", e)),
        }
    }

    /// Runs one mutation: snapshot, apply locally, send, then commit the
    /// server's answer or restore the snapshot and record a notice.
    pub async fn dispatch<C: Command>(&mut self, command: C) -> Result<C::Output, ClientError> {
        let snapshot = self.state.clone();

        if let Err(e) = command.apply(&mut self.state) {
            self.state = snapshot;
            self.notify(command.label(), &e);
            return Err(e);
        }

        match command.send(&self.api).await {
            Ok(output) => {
                command.commit(&mut self.state, &output);
                Ok(output)
            }
            Err(e) => {
                self.state = snapshot;
                self.notify(command.label(), &e);
                Err(e)
            }
        }
    }

    pub async fn load_conversations(&mut self) -> Result<(), ClientError> {
        match self.api.fetch_conversations().await {
            Ok(conversations) => {
                self.state.conversations = conversations;
                Ok(())
            }
            Err(e) => Err(self.fail("load conversations", e)),
        }
    }

    pub async fn open_thread(&mut self, user_id: &str) -> Result<(), ClientError> {
        match self.api.fetch_messages(user_id).await {
            Ok(messages) => {
                self.state.thread = Some(Thread {
                    with_user: user_id.to_string(),
                    messages,
                });
                Ok(())
            }
            Err(e) => Err(self.fail("open conversation", e)),
        }
    }

    pub fn close_thread(&mut self) {
        self.state.thread = None;
    }

    /// Refreshes one tribe's message history.
    pub async fn open_tribe(&mut self, tribe_id: &str) -> Result<(), ClientError> {
        match self.api.fetch_tribe_messages(tribe_id).await {
            Ok(messages) => {
                if let Some(tribe) = self.state.tribe_mut(tribe_id) {
                    tribe.messages = messages;
                }
                Ok(())
            }
            Err(e) => Err(self.fail("open tribe", e)),
        }
    }

    /// Blocks or unblocks locally. Blocking also drops the user from
    /// `following`. Nothing is sent to the server.
    pub fn toggle_block(&mut self, user_id: &str) -> Result<bool, ClientError> {
        if user_id == self.state.me {
            return Err(self.fail("block", ClientError::Invalid("You cannot block yourself".to_string())));
        }
        let Some(me) = self.state.current_user_mut() else {
            return Err(self.fail("block", ClientError::Invalid("Not signed in".to_string())));
        };

        let blocked = if me.blocked_users.iter().any(|id| id == user_id) {
            me.blocked_users.retain(|id| id != user_id);
            false
        } else {
            me.blocked_users.push(user_id.to_string());
            me.following.retain(|id| id != user_id);
            true
        };
        Ok(blocked)
    }
}

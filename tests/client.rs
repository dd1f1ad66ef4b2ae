use std::sync::atomic::{AtomicBool, Ordering};

use star::client::commands::{
    AddComment, CreatePost, CreateTribe, DeleteComment, EditTribe, SendMessage, ToggleFollow, ToggleLike,
    ToggleTribeMembership,
};
use star::client::api::TribeDraft;
use star::client::views::{self, DiscoverResult};
use star::client::{ApiClient, AppStore, ClientError, LocalTransport, Transport};
use star::core::helpers::{Request, Response};
use star::core::store::Store;

/// Local transport that can be told to drop every request.
struct Flaky {
    inner: LocalTransport,
    down: AtomicBool,
}

impl Flaky {
    fn new(store: Store) -> Self {
        Flaky {
            inner: LocalTransport::new(store),
            down: AtomicBool::new(false),
        }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

impl Transport for Flaky {
    async fn send(&self, req: Request) -> Result<Response, ClientError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection refused".to_string()));
        }
        self.inner.send(req).await
    }
}

async fn session(store: &Store, username: &str) -> AppStore<Flaky> {
    let mut app = AppStore::new(ApiClient::new(Flaky::new(store.clone())));
    app.register(username, username, &format!("{}@example.com", username), "secret")
        .await
        .unwrap();
    app
}

#[tokio::test]
async fn test_follow_brings_posts_into_feed() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let mut bob = session(&store, "bob").await;

    let post = alice
        .dispatch(CreatePost {
            content: "first post #hello".to_string(),
            image_url: None,
        })
        .await
        .unwrap();
    assert_eq!(views::feed(alice.state()).len(), 1);

    bob.sync().await.unwrap();
    assert!(views::feed(bob.state()).is_empty());

    let alice_id = alice.state().me.clone();
    let result = bob.dispatch(ToggleFollow { user_id: alice_id.clone() }).await.unwrap();
    assert!(result.following);

    let feed = views::feed(bob.state());
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].post.id, post.id);
    assert_eq!(feed[0].author.username, "alice");

    let me = bob.state().current_user().unwrap();
    assert_eq!(me.following, vec![alice_id.clone()]);
    let target = bob.state().directory.get(&alice_id).unwrap();
    assert_eq!(target.followers, vec![me.id.clone()]);
}

#[tokio::test]
async fn test_like_and_comment_commit_server_copy() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;

    let post = alice
        .dispatch(CreatePost {
            content: "like me".to_string(),
            image_url: None,
        })
        .await
        .unwrap();

    alice.dispatch(ToggleLike { post_id: post.id.clone() }).await.unwrap();
    let visible = views::visible_posts(alice.state());
    assert!(visible[0].liked_by_me);

    alice
        .dispatch(AddComment {
            post_id: post.id.clone(),
            text: "self reply".to_string(),
        })
        .await
        .unwrap();
    let visible = views::visible_posts(alice.state());
    assert_eq!(visible[0].comments.len(), 1);
    assert_eq!(visible[0].comments[0].author.username, "alice");
}

#[tokio::test]
async fn test_failed_request_reverts_and_records_one_notice() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let post = alice
        .dispatch(CreatePost {
            content: "fragile".to_string(),
            image_url: None,
        })
        .await
        .unwrap();
    let before = alice.state().clone();
    assert!(alice.notices().is_empty());

    alice.api().transport().set_down(true);
    let err = alice.dispatch(ToggleLike { post_id: post.id.clone() }).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));

    assert_eq!(alice.state(), &before);
    let notices = alice.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].action, "like");

    // The server never saw the like.
    alice.api().transport().set_down(false);
    alice.sync().await.unwrap();
    assert!(alice.state().posts[0].likes.is_empty());
}

#[tokio::test]
async fn test_rejected_command_sends_nothing() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let me = alice.state().me.clone();

    let err = alice.dispatch(ToggleFollow { user_id: me }).await.unwrap_err();
    assert!(matches!(err, ClientError::Invalid(_)));
    assert_eq!(alice.notices().len(), 1);

    let err = alice
        .dispatch(CreatePost {
            content: "   ".to_string(),
            image_url: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Invalid(_)));
    assert!(alice.state().posts.is_empty());
}

#[tokio::test]
async fn test_server_errors_surface_status() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let mut bob = session(&store, "bob").await;

    let tribe = alice
        .dispatch(CreateTribe {
            draft: TribeDraft {
                name: "Crabs".to_string(),
                description: String::new(),
                avatar_url: None,
            },
        })
        .await
        .unwrap();

    bob.sync().await.unwrap();
    let err = bob
        .dispatch(EditTribe {
            tribe_id: tribe.id.clone(),
            draft: TribeDraft {
                name: "Mine now".to_string(),
                ..TribeDraft::default()
            },
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(bob.state().tribes[0].name, "Crabs");
}

#[tokio::test]
async fn test_blocking_is_local_and_survives_sync() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let mut bob = session(&store, "bob").await;
    let bob_id = bob.state().me.clone();

    bob.dispatch(CreatePost {
        content: "hello from bob #react".to_string(),
        image_url: None,
    })
    .await
    .unwrap();

    alice.sync().await.unwrap();
    alice.dispatch(ToggleFollow { user_id: bob_id.clone() }).await.unwrap();
    assert_eq!(views::feed(alice.state()).len(), 1);

    assert!(alice.toggle_block(&bob_id).unwrap());
    assert!(views::feed(alice.state()).is_empty());
    assert!(views::discover(alice.state(), "#react").is_empty());

    alice.sync().await.unwrap();
    assert!(alice.state().is_blocked(&bob_id));
    assert!(matches!(
        views::discover(alice.state(), "bob"),
        DiscoverResult::Users(users) if users.is_empty()
    ));

    assert!(!alice.toggle_block(&bob_id).unwrap());
    assert_eq!(views::visible_posts(alice.state()).len(), 1);
}

#[tokio::test]
async fn test_message_thread_replaces_temporary_message() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let bob = session(&store, "bob").await;
    let bob_id = bob.state().me.clone();
    alice.sync().await.unwrap();

    alice.open_thread(&bob_id).await.unwrap();
    assert!(views::thread(alice.state()).is_empty());

    let sent = alice.dispatch(SendMessage::new(bob_id.clone(), "hi bob")).await.unwrap();

    let thread = views::thread(alice.state());
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].message.id, sent.id);
    assert_eq!(thread[0].sender.username, "alice");

    alice.load_conversations().await.unwrap();
    let conversations = views::conversations(alice.state());
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].other.id, bob_id);
}

#[tokio::test]
async fn test_first_message_lists_conversation_without_reload() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let bob = session(&store, "bob").await;
    let bob_id = bob.state().me.clone();
    alice.sync().await.unwrap();

    assert!(views::conversations(alice.state()).is_empty());
    let sent = alice.dispatch(SendMessage::new(bob_id.clone(), "hello?")).await.unwrap();

    let conversations = views::conversations(alice.state());
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].other.id, bob_id);
    assert_eq!(conversations[0].conversation.id, sent.conversation_id);
    assert_eq!(
        conversations[0].conversation.last_message.as_ref().map(|m| m.id.as_str()),
        Some(sent.id.as_str())
    );

    // The local entry matches what the server reports.
    let local = alice.state().conversations.clone();
    alice.load_conversations().await.unwrap();
    assert_eq!(alice.state().conversations[0].id, local[0].id);
    assert_eq!(alice.state().conversations[0].participants, local[0].participants);
}

#[tokio::test]
async fn test_failed_follow_reverts_both_sides() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let bob = session(&store, "bob").await;
    let bob_id = bob.state().me.clone();
    alice.sync().await.unwrap();
    let before = alice.state().clone();

    alice.api().transport().set_down(true);
    let err = alice.dispatch(ToggleFollow { user_id: bob_id.clone() }).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));

    assert_eq!(alice.state(), &before);
    assert!(alice.state().current_user().unwrap().following.is_empty());
    assert!(alice.state().directory.get(&bob_id).unwrap().followers.is_empty());
    let notices = alice.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].action, "follow");
}

#[tokio::test]
async fn test_failed_comment_delete_restores_comment() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let post = alice
        .dispatch(CreatePost {
            content: "talk to me".to_string(),
            image_url: None,
        })
        .await
        .unwrap();
    let commented = alice
        .dispatch(AddComment {
            post_id: post.id.clone(),
            text: "keep me".to_string(),
        })
        .await
        .unwrap();
    let comment_id = commented.comments[0].id.clone();
    let before = alice.state().clone();

    alice.api().transport().set_down(true);
    alice
        .dispatch(DeleteComment {
            post_id: post.id.clone(),
            comment_id,
        })
        .await
        .unwrap_err();

    assert_eq!(alice.state(), &before);
    assert_eq!(views::visible_posts(alice.state())[0].comments.len(), 1);
    let notices = alice.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].action, "delete comment");
}

#[tokio::test]
async fn test_forbidden_comment_delete_reverts() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let mut bob = session(&store, "bob").await;
    let post = alice
        .dispatch(CreatePost {
            content: "mine".to_string(),
            image_url: None,
        })
        .await
        .unwrap();
    let commented = alice
        .dispatch(AddComment {
            post_id: post.id.clone(),
            text: "also mine".to_string(),
        })
        .await
        .unwrap();

    bob.sync().await.unwrap();
    let before = bob.state().clone();

    let err = bob
        .dispatch(DeleteComment {
            post_id: post.id.clone(),
            comment_id: commented.comments[0].id.clone(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(bob.state(), &before);
    assert_eq!(bob.state().posts[0].comments.len(), 1);
    assert_eq!(bob.take_notices().len(), 1);

    let err = bob
        .dispatch(DeleteComment {
            post_id: post.id.clone(),
            comment_id: "missing".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(bob.state(), &before);
}

#[tokio::test]
async fn test_failed_tribe_join_reverts() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let mut bob = session(&store, "bob").await;
    let tribe = alice
        .dispatch(CreateTribe {
            draft: TribeDraft {
                name: "Crabs".to_string(),
                ..TribeDraft::default()
            },
        })
        .await
        .unwrap();

    bob.sync().await.unwrap();
    let before = bob.state().clone();

    bob.api().transport().set_down(true);
    bob.dispatch(ToggleTribeMembership { tribe_id: tribe.id.clone() })
        .await
        .unwrap_err();

    assert_eq!(bob.state(), &before);
    assert_eq!(bob.state().tribes[0].members, vec![alice.state().me.clone()]);
    let notices = bob.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].action, "join tribe");
}

#[tokio::test]
async fn test_tribe_edit_keeps_avatar_unless_cleared() {
    let store = Store::memory();
    let mut alice = session(&store, "alice").await;
    let tribe = alice
        .dispatch(CreateTribe {
            draft: TribeDraft {
                name: "Crabs".to_string(),
                description: "shells".to_string(),
                avatar_url: Some(Some("crab.png".to_string())),
            },
        })
        .await
        .unwrap();
    assert_eq!(tribe.avatar_url.as_deref(), Some("crab.png"));

    let renamed = alice
        .dispatch(EditTribe {
            tribe_id: tribe.id.clone(),
            draft: TribeDraft {
                name: "Big Crabs".to_string(),
                description: "shells".to_string(),
                avatar_url: None,
            },
        })
        .await
        .unwrap();
    assert_eq!(renamed.name, "Big Crabs");
    assert_eq!(renamed.avatar_url.as_deref(), Some("crab.png"));

    let cleared = alice
        .dispatch(EditTribe {
            tribe_id: tribe.id.clone(),
            draft: TribeDraft {
                name: "Big Crabs".to_string(),
                description: "shells".to_string(),
                avatar_url: Some(None),
            },
        })
        .await
        .unwrap();
    assert_eq!(cleared.avatar_url, None);
}

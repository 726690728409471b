// Integration tests for the session registry
//
// These tests verify session identity, idempotent removal and
// disconnect handling under concurrent access.

use anyhow::Result;
use loqa_voice::{Segmenter, SegmenterConfig, SessionConfig, SessionRegistry, SessionState, Transport};
use std::sync::Arc;
use uuid::Uuid;

fn registry() -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::new(
        SessionConfig::default(),
        Arc::new(Segmenter::new(SegmenterConfig::default())),
    ))
}

#[tokio::test]
async fn test_get_or_create_reuses_open_session() -> Result<()> {
    let registry = registry();

    let (first, created) = registry.get_or_create("call-1", Some(16000));
    assert!(created);
    assert_eq!(first.sample_rate(), 16000);

    // Verify: same instance, creation-time sample rate kept
    let (second, created) = registry.get_or_create("call-1", Some(8000));
    assert!(!created);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.sample_rate(), 16000);
    assert_eq!(registry.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_default_sample_rate_applies_when_absent() -> Result<()> {
    let registry = registry();
    let (session, _) = registry.get_or_create("call-2", None);
    assert_eq!(session.sample_rate(), SessionConfig::default().sample_rate);
    Ok(())
}

#[tokio::test]
async fn test_remove_is_idempotent() -> Result<()> {
    let registry = registry();
    let (session, _) = registry.get_or_create("call-3", None);

    let removed = registry.remove("call-3").await;
    assert!(removed.is_some());
    assert_eq!(session.state().await, SessionState::Closed);
    assert!(session.cancellation().is_cancelled());
    assert!(registry.get("call-3").is_none());

    // Second removal and removal of an unknown id are no-ops
    assert!(registry.remove("call-3").await.is_none());
    assert!(registry.remove("never-existed").await.is_none());
    assert!(registry.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_removed_id_starts_a_fresh_session() -> Result<()> {
    let registry = registry();
    let (old, _) = registry.get_or_create("call-4", None);
    registry.remove("call-4").await;

    let (fresh, created) = registry.get_or_create("call-4", None);
    assert!(created);
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert!(fresh.is_open().await);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_get_or_create_yields_one_session() -> Result<()> {
    let registry = registry();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.get_or_create("shared", None)
        }));
    }

    let mut sessions = Vec::new();
    let mut created_count = 0;
    for handle in handles {
        let (session, created) = handle.await?;
        if created {
            created_count += 1;
        }
        sessions.push(session);
    }

    // Verify: exactly one creation, every caller got the same instance
    assert_eq!(created_count, 1);
    assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
    assert_eq!(registry.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_distinct_ids_are_independent() -> Result<()> {
    let registry = registry();
    for id in ["a", "b", "c"] {
        registry.get_or_create(id, None);
    }

    registry.remove("b").await;

    let mut ids = registry.ids();
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);

    let mut visited = 0;
    registry.for_each(|_| visited += 1);
    assert_eq!(visited, 2);

    Ok(())
}

#[tokio::test]
async fn test_release_only_for_bound_connection() -> Result<()> {
    let registry = registry();
    let (session, _) = registry.get_or_create("call-5", None);

    let old_conn = Uuid::new_v4();
    let new_conn = Uuid::new_v4();
    let (old_transport, _old_rx) = Transport::channel(old_conn);
    let (new_transport, _new_rx) = Transport::channel(new_conn);

    session.attach_transport(old_transport).await;
    session.attach_transport(new_transport).await;
    assert_eq!(session.connection_id().await, Some(new_conn));

    // The old connection lost the session to the newer start
    assert!(registry.release("call-5", old_conn).await.is_none());
    assert!(session.is_open().await);

    assert!(registry.release("call-5", new_conn).await.is_some());
    assert_eq!(session.state().await, SessionState::Closed);
    assert!(registry.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_clear_closes_everything() -> Result<()> {
    let registry = registry();
    let (a, _) = registry.get_or_create("a", None);
    let (b, _) = registry.get_or_create("b", None);

    registry.clear().await;

    assert!(registry.is_empty());
    assert_eq!(a.state().await, SessionState::Closed);
    assert_eq!(b.state().await, SessionState::Closed);

    Ok(())
}

#[tokio::test]
async fn test_zero_sample_rate_falls_back_to_default() -> Result<()> {
    let registry = registry();
    let (session, _) = registry.get_or_create("call-6", Some(0));
    assert_eq!(session.sample_rate(), SessionConfig::default().sample_rate);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_release_never_tears_down_a_rebound_session() -> Result<()> {
    for _ in 0..200 {
        let registry = registry();
        let (session, _) = registry.get_or_create("race", None);

        let old_conn = Uuid::new_v4();
        let new_conn = Uuid::new_v4();
        let (old_transport, _old_rx) = Transport::channel(old_conn);
        let (new_transport, _new_rx) = Transport::channel(new_conn);
        session.attach_transport(old_transport).await;

        // Old connection's disconnect races a newer connection's rebind
        let release = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.release("race", old_conn).await.is_some() })
        };
        let attach = {
            let session = session.clone();
            tokio::spawn(async move { session.attach_transport(new_transport).await })
        };
        let (released, attached) = (release.await?, attach.await?);

        // Verify: exactly one side wins and the outcome is consistent
        assert!(released != attached, "released={} attached={}", released, attached);
        if attached {
            assert!(session.is_open().await);
            assert_eq!(session.connection_id().await, Some(new_conn));
            assert!(registry.get("race").is_some());
        } else {
            assert_eq!(session.state().await, SessionState::Closed);
            assert!(registry.get("race").is_none());
        }
    }

    Ok(())
}

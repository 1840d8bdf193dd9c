//! Integration tests for the editing session

use invitation_editor::{
    ConflictResolution, EditorConfig, EditorSession, MemoryStore, SaveStatus,
};
use invitation_model::{BlockPatch, Mode};
use invitation_registry::TypeRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn open(store: &MemoryStore) -> anyhow::Result<EditorSession> {
    let session = EditorSession::open(
        "doc-1",
        "event-1",
        Arc::new(TypeRegistry::builtin()),
        Arc::new(store.clone()),
        EditorConfig::default(),
    )
    .await?;
    Ok(session)
}

async fn wait_until_saved(session: &EditorSession) {
    let mut status = session.watch_status();
    status
        .wait_for(|state| state.status == SaveStatus::Saved)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_two_quick_patches_make_one_save() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut session = open(&store).await?;

    let hero = session.add_block("hero")?;
    session.patch_block(&hero, BlockPatch::content("title", "Save the date"))?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    session.patch_block(&hero, BlockPatch::content("title", "Ana & Luis"))?;

    wait_until_saved(&session).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].payload[0]["content"]["title"], "Ana & Luis");
    assert_eq!(calls[0].mode, Mode::Linear);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_noop_patch_does_not_save() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut session = open(&store).await?;

    let hero = session.add_block("hero")?;
    session.flush().await?;
    let hash = session.document().content_hash();

    let outcome = session.patch_block(&hero, BlockPatch::content("title", "You're invited"))?;
    assert!(!outcome.changed);
    assert_eq!(session.document().content_hash(), hash);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.call_count(), 1);
    assert_eq!(session.save_status().status, SaveStatus::Saved);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_undo_redo_round_trip() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut session = open(&store).await?;

    session.add_block("hero")?;
    let after_hero = session.document().blocks().unwrap().to_vec();
    session.add_block("rsvp")?;
    let after_rsvp = session.document().blocks().unwrap().to_vec();

    assert!(session.undo()?);
    assert_eq!(session.document().blocks().unwrap(), after_hero.as_slice());

    assert!(session.redo()?);
    assert_eq!(session.document().blocks().unwrap(), after_rsvp.as_slice());
    assert!(!session.redo()?);

    assert!(session.undo()?);
    assert!(session.undo()?);
    assert!(session.document().blocks().unwrap().is_empty());
    assert!(!session.undo()?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_removed_ids_are_not_reused() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut session = open(&store).await?;

    let first = session.add_block("text")?;
    session.remove_block(&first)?;
    let second = session.add_block("text")?;
    assert_ne!(first, second);

    session.undo()?;
    session.undo()?;
    let third = session.add_block("text")?;
    assert_ne!(third, first);
    assert_ne!(third, second);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reopen_restores_saved_document() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut session = open(&store).await?;
    let hero = session.add_block("hero")?;
    let rsvp = session.add_block("rsvp")?;
    session.reorder_blocks(&[rsvp.clone(), hero.clone()])?;

    let closed = session.close().await?;
    assert_eq!(closed.status, SaveStatus::Saved);
    assert_eq!(closed.version, 1);

    let mut reopened = open(&store).await?;
    let ids: Vec<_> = reopened
        .document()
        .blocks()
        .unwrap()
        .iter()
        .map(|b| b.id.clone())
        .collect();
    assert_eq!(ids, vec![rsvp.clone(), hero.clone()]);
    assert_eq!(reopened.document().version, 1);
    assert_eq!(reopened.save_status().status, SaveStatus::Idle);

    let fresh = reopened.add_block("text")?;
    assert!(fresh != hero && fresh != rsvp);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_conflict_keeps_local_state_until_reload() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut session = open(&store).await?;
    let hero = session.add_block("hero")?;
    session.flush().await?;

    store.write_remote(json!([
        {"id": "remote-1", "type": "text", "order": 0, "content": {"body": "from elsewhere"}}
    ]));

    session.patch_block(&hero, BlockPatch::content("title", "Local title"))?;
    let state = session.flush().await?;
    assert_eq!(state.status, SaveStatus::Conflict { known_version: 2 });

    // Local document untouched and nothing written over the remote
    let block = session.document().find_block(&hero).unwrap();
    assert_eq!(block.content["title"], "Local title");
    assert_eq!(store.stored().unwrap().version, 2);

    session.patch_block(&hero, BlockPatch::content("title", "Still local"))?;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.call_count(), 2);

    session.resolve_conflict(ConflictResolution::ReloadRemote).await?;
    let blocks = session.document().blocks().unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].id, "remote-1");
    assert!(!session.can_undo());
    assert_eq!(session.document().version, 2);

    let settled = session.flush().await?;
    assert_eq!(settled.status, SaveStatus::Idle);
    assert_eq!(settled.version, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_conflict_keep_local_overwrites() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut session = open(&store).await?;
    let hero = session.add_block("hero")?;
    session.flush().await?;
    store.write_remote(json!([]));

    session.patch_block(&hero, BlockPatch::content("title", "Mine"))?;
    session.flush().await?;

    session.resolve_conflict(ConflictResolution::KeepLocal).await?;
    let state = session.flush().await?;

    assert_eq!(state.status, SaveStatus::Saved);
    assert_eq!(state.version, 3);
    assert_eq!(store.stored().unwrap().payload[0]["content"]["title"], "Mine");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_surfaces_error() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.fail_next(1);
    let mut session = open(&store).await?;
    let mut events = session.subscribe();

    session.add_block("hero")?;
    let state = session.flush().await?;
    assert!(matches!(state.status, SaveStatus::Error { .. }));
    assert!(matches!(
        events.recv().await?,
        invitation_editor::AutosaveEvent::Failed { .. }
    ));

    session.save_now()?;
    let state = session.flush().await?;
    assert_eq!(state.status, SaveStatus::Saved);
    assert_eq!(store.call_count(), 2);
    Ok(())
}

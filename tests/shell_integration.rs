mod common;

use std::sync::Arc;

use common::{StoreCall, mounted_view, record, wait_until};
use taskdeck::backend::Filter;
use taskdeck::shell::run_shell_with;
use taskdeck::task::Status;

#[tokio::test]
async fn shell_keeps_reading_while_writes_are_in_flight() {
    let (view, store, _auth) = mounted_view(vec![
        record("1", Status::Todo),
        record("2", Status::Todo),
        record("3", Status::Todo),
    ])
    .await;
    let view = Arc::new(view);
    let gate = store.hold_writes();

    // Both writes are held open together; a shell that awaited each command
    // before reading the next line would never issue the second one.
    let input: &[u8] = b"rm 1\nset 2 done\n";

    let (result, ()) = tokio::join!(run_shell_with(&view, input), async {
        wait_until(|| store.tracker.lock().unwrap().writes().len() == 2).await;
        assert!(view.flags().is_deleting("1"));
        assert!(view.flags().is_updating("2"));
        gate.add_permits(2);
    });

    result.unwrap();
    assert_eq!(
        store.tracker.lock().unwrap().writes(),
        vec![
            StoreCall::Delete("tasks".to_string(), vec![Filter::eq("id", "1")]),
            StoreCall::Update(
                "tasks".to_string(),
                serde_json::json!({ "status": "done" }),
                vec![Filter::eq("id", "2")]
            ),
        ]
    );
    let ids: Vec<String> = view.tasks().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["2", "3"]);
    assert_eq!(view.task("2").unwrap().status, Status::Done);
    assert!(view.flags().is_idle());
}

#[tokio::test]
async fn shell_waits_for_pending_writes_before_returning() {
    let (view, store, _auth) = mounted_view(vec![record("1", Status::Todo)]).await;
    let view = Arc::new(view);

    let input: &[u8] = b"done-all\nquit\n";
    run_shell_with(&view, input).await.unwrap();

    assert_eq!(store.tracker.lock().unwrap().writes().len(), 1);
    assert_eq!(view.task("1").unwrap().status, Status::Done);
    assert!(view.flags().is_idle());
}

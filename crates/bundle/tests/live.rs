use futures::StreamExt;
use livepkg_bundle::{Broadcaster, Bundle, Frame, Live, Loader};
use livepkg_extract::Extractor;
use livepkg_storage::backend::MockBackend;
use std::sync::Arc;

fn live(backend: &Arc<MockBackend>, queue: usize) -> Arc<Live> {
    let bundle = Bundle::new(Loader::new(backend.clone(), Extractor::default()), ["/main.js"]);
    Arc::new(Live::new(bundle, Broadcaster::new(queue)))
}

fn change_path(frame: Option<Frame>) -> String {
    match frame {
        Some(Frame::Change(change)) => change.path().to_string(),
        other => panic!("expected a change, got {other:?}"),
    }
}

#[tokio::test]
async fn subscribers_receive_handshake_then_changes() {
    let backend = Arc::new(MockBackend::with_files([("/main.js", r#"depends("a.js");"#), ("/a.js", "")]));
    let live = live(&backend, 16);
    let mut first = live.subscribe();
    let mut second = live.subscribe();

    live.reload().await;
    for subscription in [&mut first, &mut second] {
        assert_eq!(subscription.recv().await, Some(Frame::Handshake));
        assert_eq!(change_path(subscription.recv().await), "/main.js");
        assert_eq!(change_path(subscription.recv().await), "/a.js");
    }

    backend.write("/a.js", "changed").await;
    live.reload().await;
    assert_eq!(change_path(first.recv().await), "/a.js");
    assert_eq!(change_path(second.recv().await), "/a.js");
}

#[tokio::test]
async fn no_op_reload_broadcasts_nothing() {
    let backend = Arc::new(MockBackend::with_files([("/main.js", "")]));
    let live = live(&backend, 16);
    live.reload().await;
    let mut subscription = live.subscribe();
    let (reloaded, delivery) = live.reload().await;
    assert!(reloaded.is_unchanged());
    assert_eq!(delivery.delivered, 0);
    assert_eq!(subscription.try_recv(), Some(Frame::Handshake));
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
async fn dropped_subscriber_does_not_affect_others() {
    let backend = Arc::new(MockBackend::with_files([("/main.js", "")]));
    let live = live(&backend, 16);
    let gone = live.subscribe();
    let mut kept = live.subscribe();
    drop(gone);

    let (_, delivery) = live.reload().await;
    assert_eq!(delivery.delivered, 1);
    assert_eq!(delivery.closed, 1);
    assert_eq!(live.broadcaster().len(), 1);
    assert_eq!(kept.recv().await, Some(Frame::Handshake));
    assert_eq!(change_path(kept.recv().await), "/main.js");
}

#[tokio::test]
async fn slow_subscriber_is_disconnected() {
    let backend = Arc::new(MockBackend::with_files([("/main.js", r#"depends("a.js");"#), ("/a.js", "")]));
    let live = live(&backend, 3);
    let slow = live.subscribe();
    let mut fast = live.subscribe();

    // Handshake plus two additions fill the queue exactly.
    live.reload().await;
    while fast.try_recv().is_some() {}

    backend.write("/a.js", "changed").await;
    let (_, delivery) = live.reload().await;
    assert_eq!(delivery.delivered, 1);
    assert_eq!(delivery.overflowed, 1);
    assert_eq!(change_path(fast.recv().await), "/a.js");

    // Everything queued before the overflow is still delivered, then the
    // stream ends.
    let frames: Vec<Frame> = slow.into_stream().collect().await;
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], Frame::Handshake);
}

#[tokio::test]
async fn snapshot_is_published_before_changes_arrive() {
    let backend = Arc::new(MockBackend::with_files([("/main.js", "")]));
    let live = live(&backend, 16);
    let subscription = live.subscribe();
    let reader = {
        let live = Arc::clone(&live);
        tokio::spawn(async move {
            let mut frames = std::pin::pin!(subscription.into_stream());
            while let Some(frame) = frames.next().await {
                if let Frame::Change(change) = frame {
                    let next = change.next.clone().unwrap();
                    return Arc::ptr_eq(&next, live.snapshot().by_path(&next.path).unwrap());
                }
            }
            false
        })
    };
    live.reload().await;
    assert!(reader.await.unwrap());
}

#[tokio::test]
async fn info_lists_files_in_order() {
    let backend = Arc::new(MockBackend::with_files([("/main.js", r#"depends("a.js");"#), ("/a.js", "")]));
    let live = live(&backend, 16);
    live.initialize().await;
    let info = serde_json::to_value(live.info(Some("/~live"))).unwrap();
    assert_eq!(info["files"][0]["path"], "/a.js");
    assert_eq!(info["files"][1]["path"], "/main.js");
    assert_eq!(info["files"][1]["deps"], serde_json::json!(["/a.js"]));
    assert_eq!(info["live"], "/~live");
}

#[tokio::test]
async fn cycle_larger_than_queue_resyncs_instead_of_disconnecting() {
    let mut files: Vec<(String, String)> = (0..69).map(|i| (format!("/lib/{i}.js"), String::new())).collect();
    let main: String = (0..69).map(|i| format!(r#"depends("lib/{i}.js");"#)).collect();
    files.push(("/main.js".to_string(), main));
    let backend = Arc::new(MockBackend::with_files(files));
    let live = live(&backend, 64);
    let mut subscription = live.subscribe();
    assert_eq!(subscription.try_recv(), Some(Frame::Handshake));

    let (reloaded, delivery) = live.reload().await;
    assert_eq!(reloaded.changes.len(), 70);
    assert_eq!(delivery.resynced, 1);
    assert_eq!(delivery.overflowed, 0);
    assert_eq!(subscription.recv().await, Some(Frame::Resync));
    assert_eq!(live.snapshot().len(), 70);

    // Later cycles are incremental again.
    backend.write("/lib/7.js", "changed").await;
    live.reload().await;
    assert_eq!(change_path(subscription.recv().await), "/lib/7.js");
    assert_eq!(live.broadcaster().len(), 1);
}

use anyhow::Context;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vigil_index::IndexOptions;
use vigil_memory::{Engine, WatchEvent};

/// Events arriving this close together are applied as one batch
const DEBOUNCE: Duration = Duration::from_millis(200);

pub fn run(root: &Path) -> anyhow::Result<()> {
    let engine = super::open_engine(root)?;
    let report = engine.index_all(&IndexOptions::default())?;
    let resolved = engine.resolve_dependencies()?;
    info!(
        "initial pass: {} indexed, {} updated, {} edges",
        report.indexed, report.updated, resolved.edges
    );

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(move |res| {
        if tx.send(res).is_err() {
            debug!("watch channel closed");
        }
    })?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;
    println!("Watching {} (Ctrl-C to stop)", root.display());

    while let Ok(first) = rx.recv() {
        let mut batch = Vec::new();
        collect(first, &mut batch);
        while let Ok(next) = rx.recv_timeout(DEBOUNCE) {
            collect(next, &mut batch);
        }
        apply(&engine, &batch)?;
    }
    Ok(())
}

fn collect(result: notify::Result<Event>, batch: &mut Vec<WatchEvent>) {
    match result {
        Ok(event) => {
            for translated in translate(&event) {
                push_latest(batch, translated);
            }
        }
        Err(e) => warn!("watcher error: {}", e),
    }
}

/// Map a notify event onto engine events. A rename is reported per path, so each
/// side is classified by whether it still exists.
pub fn translate(event: &Event) -> Vec<WatchEvent> {
    event
        .paths
        .iter()
        .filter_map(|path| classify(&event.kind, path))
        .collect()
}

fn classify(kind: &EventKind, path: &Path) -> Option<WatchEvent> {
    let path = path.to_path_buf();
    match kind {
        EventKind::Create(_) => Some(WatchEvent::Added(path)),
        EventKind::Remove(_) => Some(WatchEvent::Removed(path)),
        EventKind::Modify(ModifyKind::Name(_)) if path.exists() => Some(WatchEvent::Added(path)),
        EventKind::Modify(ModifyKind::Name(_)) => Some(WatchEvent::Removed(path)),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(WatchEvent::Changed(path)),
        _ => None,
    }
}

/// Keep one pending event per path; the newest wins
fn push_latest(batch: &mut Vec<WatchEvent>, event: WatchEvent) {
    let path = event_path(&event).to_path_buf();
    batch.retain(|pending| event_path(pending) != path.as_path());
    batch.push(event);
}

fn event_path(event: &WatchEvent) -> &Path {
    match event {
        WatchEvent::Added(p) | WatchEvent::Changed(p) | WatchEvent::Removed(p) => p,
    }
}

fn apply(engine: &Engine, batch: &[WatchEvent]) -> anyhow::Result<()> {
    for event in batch {
        engine.on_watch_event(event)?;
    }
    Ok(())
}

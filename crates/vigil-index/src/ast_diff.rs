//! Symbol-level diff of a file against its last snapshot

use crate::store::{SnapshotEntry, Store};
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::debug;
use vigil_core::{ChangeKind, FileDiff, Symbol, SymbolChange};
use vigil_repo::signature_hash;

/// Diff `symbols` against the stored snapshot of `file_path`, then replace the snapshot.
///
/// A file without a snapshot is a first observation: the baseline is stored and no
/// changes are reported. Removals and signature changes come first in name order,
/// then additions in name order. When a name repeats, its first declaration counts.
pub fn compute_diff(store: &Store, file_path: &str, symbols: &[Symbol]) -> Result<FileDiff> {
    let mut current: BTreeMap<&str, &Symbol> = BTreeMap::new();
    for symbol in symbols {
        current.entry(symbol.name.as_str()).or_insert(symbol);
    }
    let entries: Vec<SnapshotEntry> = current
        .values()
        .map(|symbol| SnapshotEntry {
            name: symbol.name.clone(),
            kind: symbol.kind,
            signature: symbol.signature.clone(),
            sig_hash: signature_hash(&symbol.signature),
        })
        .collect();

    let Some(previous) = store.load_snapshot(file_path)? else {
        store.replace_snapshot(file_path, &entries)?;
        debug!("seeded snapshot for {} ({} symbols)", file_path, entries.len());
        return Ok(FileDiff {
            file_path: file_path.to_string(),
            first_observation: true,
            changes: Vec::new(),
        });
    };

    let previous: BTreeMap<&str, &SnapshotEntry> =
        previous.iter().map(|entry| (entry.name.as_str(), entry)).collect();
    let mut changes = Vec::new();

    for (name, old) in &previous {
        match current.get(name) {
            None => changes.push(SymbolChange::new(
                ChangeKind::Removed,
                name,
                old.kind,
                Some(old.signature.clone()),
                None,
            )),
            Some(new) if signature_hash(&new.signature) != old.sig_hash => {
                changes.push(SymbolChange::new(
                    ChangeKind::SigChanged,
                    name,
                    new.kind,
                    Some(old.signature.clone()),
                    Some(new.signature.clone()),
                ))
            }
            Some(_) => {}
        }
    }
    for (name, new) in &current {
        if !previous.contains_key(name) {
            changes.push(SymbolChange::new(
                ChangeKind::Added,
                name,
                new.kind,
                None,
                Some(new.signature.clone()),
            ));
        }
    }

    store.replace_snapshot(file_path, &entries)?;
    Ok(FileDiff {
        file_path: file_path.to_string(),
        first_observation: false,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::SymbolKind;

    fn func(name: &str, signature: &str) -> Symbol {
        Symbol::new(name, SymbolKind::Function, signature)
    }

    #[test]
    fn test_first_observation_seeds() {
        let store = Store::open_in_memory().unwrap();
        let diff = compute_diff(&store, "a.ts", &[func("foo", "function foo()")]).unwrap();
        assert!(diff.first_observation);
        assert!(!diff.has_changes());
        assert_eq!(store.load_snapshot("a.ts").unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_classification_and_order() {
        let store = Store::open_in_memory().unwrap();
        compute_diff(
            &store,
            "a.ts",
            &[
                func("zeta", "function zeta()"),
                func("alpha", "function alpha(a)"),
                func("mid", "function mid()"),
            ],
        )
        .unwrap();

        let diff = compute_diff(
            &store,
            "a.ts",
            &[
                func("alpha", "function alpha(a, b)"),
                func("mid", "function mid()"),
                func("beta", "function beta()"),
                func("able", "function able()"),
            ],
        )
        .unwrap();

        let got: Vec<_> = diff.changes.iter().map(|c| (c.kind, c.symbol.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (ChangeKind::SigChanged, "alpha"),
                (ChangeKind::Removed, "zeta"),
                (ChangeKind::Added, "able"),
                (ChangeKind::Added, "beta"),
            ]
        );
        assert_eq!(diff.changes[0].description, "function `alpha` signature changed");
        assert_eq!(diff.changes[0].old_signature.as_deref(), Some("function alpha(a)"));
    }

    #[test]
    fn test_whitespace_only_signature_change_is_not_a_change() {
        let store = Store::open_in_memory().unwrap();
        compute_diff(&store, "a.ts", &[func("foo", "function foo(a, b)")]).unwrap();
        let diff = compute_diff(&store, "a.ts", &[func("foo", "function  foo(a,   b)")]).unwrap();
        assert!(!diff.has_changes());
    }

    #[test]
    fn test_snapshot_replaced_each_time() {
        let store = Store::open_in_memory().unwrap();
        compute_diff(&store, "a.ts", &[func("foo", "function foo()")]).unwrap();
        compute_diff(&store, "a.ts", &[func("bar", "function bar()")]).unwrap();
        let diff = compute_diff(&store, "a.ts", &[func("bar", "function bar()")]).unwrap();
        assert!(!diff.has_changes());
    }

    #[test]
    fn test_empty_file_then_symbols_reports_additions() {
        let store = Store::open_in_memory().unwrap();
        assert!(compute_diff(&store, "a.ts", &[]).unwrap().first_observation);
        let diff = compute_diff(&store, "a.ts", &[func("foo", "function foo()")]).unwrap();
        assert!(!diff.first_observation);
        assert_eq!(diff.changes[0].kind, ChangeKind::Added);
    }
}

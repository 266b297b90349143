// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use super::thread_source::ThreadSource;
use crate::anr_info::ThreadData;
use crate::shared::configuration::ThreadSelection;
use std::collections::HashSet;
use tracing::warn;

/// Assembles the thread entries of an ANR report.
///
/// The main thread is always first and always present: identified by id, it
/// bypasses the selection policy and the name dedup entirely, and is
/// synthesized from a targeted capture (or a minimal placeholder) when the
/// enumeration misses it. Other threads pass the selection policy, must carry
/// a stack unless `include_without_stack` is set, and are deduplicated by
/// name, first occurrence wins. Order is the enumeration order.
pub fn capture_threads(
    source: &dyn ThreadSource,
    selection: &ThreadSelection,
    include_without_stack: bool,
) -> Vec<ThreadData> {
    let main_id = source.main_thread_id();
    let enumerated = source.enumerate().unwrap_or_else(|e| {
        warn!("live thread enumeration failed, reporting the main thread only: {e:#}");
        vec![]
    });

    let mut main_entry: Option<ThreadData> = None;
    let mut rest: Vec<ThreadData> = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    for thread in enumerated {
        if thread.id == main_id {
            // Identity takes precedence over name: the main entry is fixed
            // here and never compared against other threads' names.
            if main_entry.is_none() {
                main_entry = Some(thread);
            }
            continue;
        }
        if !selection.selects(&thread.name) {
            continue;
        }
        if thread.stack.frames.is_empty() && !include_without_stack {
            continue;
        }
        if !seen_names.insert(thread.name.clone()) {
            continue;
        }
        rest.push(thread);
    }

    // Sometimes enumeration does not surface the main thread - ensure that
    // we still list it.
    let main_entry = main_entry
        .or_else(|| source.capture_thread(main_id))
        .unwrap_or_else(|| ThreadData::synthesized_main(main_id));

    let mut entries = Vec::with_capacity(rest.len() + 1);
    entries.push(main_entry);
    entries.append(&mut rest);
    entries
}

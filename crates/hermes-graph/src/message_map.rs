//! Buckets matched pairs into the per-scope maps the emitter and walker
//! consume.

use hermes_types::{ir::ModuleSet, MessageMap, NodeMap, SitePair};

/// Buckets pairs by the sending scope. A scope that never sends but shows up
/// as a receive endpoint gets an empty bucket so the graph still renders it.
pub fn build_message_map<'a>(pairs: &[SitePair<'a>]) -> MessageMap<'a> {
    let mut mmap = MessageMap::default();
    for &(send, recv) in pairs {
        mmap.entry(send.scope.clone()).or_default().push((send, recv));
        mmap.entry(recv.scope.clone()).or_default();
    }
    mmap
}

/// Buckets every site of every pair by scope and source line, deduplicated
/// by site. Lines are ordered so emitted node ports are stable.
pub fn build_node_map<'a>(set: &ModuleSet, pairs: &[SitePair<'a>]) -> NodeMap<'a> {
    let mut nmap = NodeMap::default();
    for &(send, recv) in pairs {
        for node in [send, recv] {
            let line = node.line(set).unwrap_or(0);
            let bucket = nmap.entry(node.scope.clone()).or_default().entry(line).or_default();
            if !bucket.iter().any(|known| known.site == node.site) {
                bucket.push(node);
            }
        }
    }
    nmap
}

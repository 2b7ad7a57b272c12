//! Pairs annotated sends with receives by carried type.

use hermes_types::{MessagingNode, SitePair};
use itertools::Itertools;
use tracing::debug;

/// Carried-type equality modulo namespace qualification: equal-length names
/// must match exactly, otherwise the shorter must be a suffix of the longer.
/// `weatherstation::Weather` and `Weather` name the same payload when one
/// side sees the type through its own crate.
fn types_match(send: &str, recv: &str) -> bool {
    if send.len() == recv.len() {
        send == recv
    } else if send.len() < recv.len() {
        recv.ends_with(send)
    } else {
        send.ends_with(recv)
    }
}

/// Unit payloads and result/option wrappers around unit carry no payload
/// worth drawing.
fn is_unit_like(carried: &str) -> bool {
    carried == "()" ||
        carried.starts_with("core::result::Result<()") ||
        carried.starts_with("core::option::Option<()")
}

/// All-pairs matching. Duplicate pairings are intentional where genuine type
/// aliasing exists; downstream consumers keep every edge.
pub fn match_sites<'a>(
    sends: &'a [MessagingNode],
    receives: &'a [MessagingNode],
    suppress_unit: bool,
) -> Vec<SitePair<'a>> {
    let mut matched = Vec::new();
    for send in sends {
        if suppress_unit && is_unit_like(&send.carried_type) {
            continue
        }
        for recv in receives {
            if suppress_unit && is_unit_like(&recv.carried_type) {
                continue
            }
            if types_match(&send.carried_type, &recv.carried_type) {
                matched.push((send, recv));
            }
        }
    }
    debug!(
        pairs = matched.len(),
        types = matched.iter().map(|(s, _)| &s.carried_type).unique().count(),
        "matching finished"
    );
    matched
}

#[cfg(test)]
mod test {
    use hermes_types::ir::{FunctionId, InstrId, InstrRef, ModuleId};

    use super::*;

    fn send(ty: &str) -> MessagingNode {
        let site = InstrRef { module: ModuleId(0), function: FunctionId(0), instr: InstrId(0) };
        MessagingNode::send(site, ty.into(), "a.rs".into())
    }

    fn recv(ty: &str) -> MessagingNode {
        let site = InstrRef { module: ModuleId(1), function: FunctionId(0), instr: InstrId(0) };
        MessagingNode::receive(site, ty.into(), "b.rs".into())
    }

    #[test]
    fn equal_types_pair() {
        let sends = [send("u32")];
        let recvs = [recv("u32")];
        assert_eq!(match_sites(&sends, &recvs, false).len(), 1);
    }

    #[test]
    fn suffix_law_holds_both_ways() {
        // the qualified side can sit on either end of the channel
        let sends = [send("foo::bar::Msg")];
        let recvs = [recv("Msg")];
        assert_eq!(match_sites(&sends, &recvs, false).len(), 1);

        let sends = [send("Msg")];
        let recvs = [recv("foo::bar::Msg")];
        assert_eq!(match_sites(&sends, &recvs, false).len(), 1);

        // same length but different content never pairs
        let sends = [send("abc::Msg")];
        let recvs = [recv("xyz::Msg")];
        assert!(match_sites(&sends, &recvs, false).is_empty());

        // suffix must match exactly
        let sends = [send("Message")];
        let recvs = [recv("Msg")];
        assert!(match_sites(&sends, &recvs, false).is_empty());
    }

    #[test]
    fn all_pairs_including_duplicates() {
        let sends = [send("Msg"), send("evt::Msg")];
        let recvs = [recv("Msg"), recv("other::Msg")];
        // every send matches every receive under the suffix rule
        assert_eq!(match_sites(&sends, &recvs, false).len(), 4);
    }

    #[test]
    fn unit_payloads_are_suppressed_on_request() {
        let sends = [send("()"), send("core::result::Result<(), Error>"), send("u32")];
        let recvs = [recv("()"), recv("core::option::Option<()>"), recv("u32")];

        let kept = match_sites(&sends, &recvs, true);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].0.carried_type, "u32");

        // without suppression the unit channels pair like any other
        assert!(match_sites(&sends, &recvs, false).len() > 1);
    }

    #[test]
    fn matching_is_stable() {
        let sends = [send("u32"), send("Msg")];
        let recvs = [recv("u32"), recv("Msg")];
        let first: Vec<_> = match_sites(&sends, &recvs, false);
        let second: Vec<_> = match_sites(&sends, &recvs, false);
        let as_types =
            |pairs: &[SitePair<'_>]| -> Vec<(String, String)> {
                pairs
                    .iter()
                    .map(|(s, r)| (s.carried_type.clone(), r.carried_type.clone()))
                    .collect()
            };
        assert_eq!(as_types(&first), as_types(&second));
    }
}

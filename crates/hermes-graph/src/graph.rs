//! The assembled message graph.
//!
//! Scopes become nodes, matched pairs become directed edges annotated with
//! everything the analyses learned. This is the programmatic shape; the DOT
//! rendering in [`crate::dot`] is one consumer of it.

use hermes_types::{
    ir::{InstrRef, ModuleSet},
    FastHashMap, SitePair, UsageType,
};
use petgraph::graph::{DiGraph, NodeIndex};

/// Everything known about one message edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeInfo {
    pub carried_type: String,
    /// constant propagated out of the sender, when one was found
    pub assignment:   Option<i64>,
    pub send_site:    InstrRef,
    pub recv_site:    InstrRef,
    pub send_line:    Option<u32>,
    pub recv_line:    Option<u32>,
    /// where the receiver pinned the handling branch, for classifications
    /// that name one
    pub handler_line: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageGraph {
    graph:  DiGraph<String, EdgeInfo>,
    scopes: FastHashMap<String, NodeIndex>,
}

impl MessageGraph {
    pub fn from_pairs(set: &ModuleSet, pairs: &[SitePair<'_>]) -> Self {
        let mut out = Self::default();
        for &(send, recv) in pairs {
            let from = out.ensure_scope(&send.scope);
            let to = out.ensure_scope(&recv.scope);

            let usage = recv.usage();
            let handler_line = match usage.class {
                UsageType::Unchecked | UsageType::DirectUse => None,
                _ => usage.at.and_then(|at| set.instr(at).line()),
            };
            out.graph.add_edge(
                from,
                to,
                EdgeInfo {
                    carried_type: send.carried_type.clone(),
                    assignment: send.assignment(),
                    send_site: send.site,
                    recv_site: recv.site,
                    send_line: send.line(set),
                    recv_line: recv.line(set),
                    handler_line,
                },
            );
        }
        out
    }

    fn ensure_scope(&mut self, scope: &str) -> NodeIndex {
        match self.scopes.get(scope) {
            Some(index) => *index,
            None => {
                let index = self.graph.add_node(scope.to_string());
                self.scopes.insert(scope.to_string(), index);
                index
            }
        }
    }

    pub fn graph(&self) -> &DiGraph<String, EdgeInfo> {
        &self.graph
    }

    pub fn scope_index(&self, scope: &str) -> Option<NodeIndex> {
        self.scopes.get(scope).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod test {
    use hermes_core::test_utils::weather_fixture;
    use hermes_types::MessagingNode;
    use petgraph::visit::EdgeRef;

    use super::*;

    #[test]
    fn scopes_dedup_into_nodes() {
        let fixture = weather_fixture();
        let mut send = MessagingNode::send(
            fixture.send_site,
            "weatherstation::Weather".into(),
            "src/weatherstation.rs".into(),
        );
        send.set_assignment(Some(3));
        let recv =
            MessagingNode::receive(fixture.recv_site, "Weather".into(), "src/dispatch.rs".into());
        let pairs = vec![(&send, &recv), (&send, &recv)];

        let graph = MessageGraph::from_pairs(&fixture.set, &pairs);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);

        let from = graph.scope_index("src/weatherstation.rs").unwrap();
        let edge = graph.graph().edges(from).next().unwrap();
        assert_eq!(edge.weight().assignment, Some(3));
        assert_eq!(edge.weight().recv_line, Some(10));
    }
}

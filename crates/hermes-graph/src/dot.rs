//! Graph emission through a sink, with a DOT writer as the stock emitter.
//!
//! Nodes are record-shaped: the scope name followed by one port per
//! messaging site, labeled by source line. Edges run port to port and carry
//! the transmitted type, the propagated constant when one exists and the
//! handling line when the receiver classification pinned one.

use std::{
    hash::{Hash, Hasher},
    io,
};

use hermes_types::{ir::{InstrRef, ModuleSet}, SitePair, UsageType};
use rustc_hash::FxHasher;

use crate::message_map::{build_message_map, build_node_map};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub id:   String,
    pub line: u32,
}

/// One edge as handed to an emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEdge<'a> {
    pub from_scope: &'a str,
    pub from_port:  String,
    pub to_scope:   &'a str,
    pub to_port:    String,
    pub label:      String,
}

/// Boundary the concrete emitter sits behind. The driver owns the writer;
/// the analyzer side only ever sees this trait.
pub trait GraphSink {
    fn begin(&mut self) -> io::Result<()>;
    fn node(&mut self, scope: &str, ports: &[Port]) -> io::Result<()>;
    fn edge(&mut self, edge: &SinkEdge<'_>) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()>;
}

/// Stable port identity for a site.
pub fn port_id(site: InstrRef) -> String {
    format!("s{}_{}_{}", site.module.0, site.function.0, site.instr.0)
}

/// Feeds every node and edge of the matched pair set into the sink, nodes
/// first. Scopes appearing only as receivers are still emitted.
pub fn emit_message_graph(
    set: &ModuleSet,
    pairs: &[SitePair<'_>],
    sink: &mut dyn GraphSink,
) -> io::Result<()> {
    let mmap = build_message_map(pairs);
    let nmap = build_node_map(set, pairs);

    sink.begin()?;
    for (scope, lines) in &nmap {
        let ports: Vec<Port> = lines
            .iter()
            .flat_map(|(line, nodes)| {
                nodes.iter().map(|node| Port { id: port_id(node.site), line: *line })
            })
            .collect();
        sink.node(scope, &ports)?;
    }

    for bucket in mmap.values() {
        for &(send, recv) in bucket {
            let mut label = send.carried_type.clone();
            if let Some(value) = send.assignment() {
                label.push_str(&format!(": {value}"));
            }
            let usage = recv.usage();
            if !matches!(usage.class, UsageType::Unchecked | UsageType::DirectUse) {
                if let Some(line) = usage.at.and_then(|at| set.instr(at).line()) {
                    label.push_str(&format!("\\nhandled at line {line}"));
                }
            }
            sink.edge(&SinkEdge {
                from_scope: &send.scope,
                from_port:  port_id(send.site),
                to_scope:   &recv.scope,
                to_port:    port_id(recv.site),
                label,
            })?;
        }
    }
    sink.finish()
}

/// Renders the message graph as a GraphViz digraph with record-shaped nodes.
#[derive(Debug)]
pub struct DotWriter<W: io::Write> {
    out: W,
}

impl<W: io::Write> DotWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn node_name(scope: &str) -> String {
        let mut hasher = FxHasher::default();
        scope.hash(&mut hasher);
        format!("Node{}", hasher.finish())
    }

    /// Escapes the characters that carry meaning inside record labels.
    fn escape(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for ch in text.chars() {
            if matches!(ch, '"' | '\\' | '{' | '}' | '|' | '<' | '>') {
                escaped.push('\\');
            }
            escaped.push(ch);
        }
        escaped
    }
}

impl<W: io::Write> GraphSink for DotWriter<W> {
    fn begin(&mut self) -> io::Result<()> {
        writeln!(self.out, "digraph structs {{")?;
        writeln!(self.out, "\tlabel=\"Generated Message Graph\";")?;
        writeln!(self.out, "\trankdir=LR;")?;
        writeln!(self.out, "\tnode [shape=record];")?;
        writeln!(self.out)
    }

    fn node(&mut self, scope: &str, ports: &[Port]) -> io::Result<()> {
        write!(self.out, "\t{} [label=\"{}", Self::node_name(scope), Self::escape(scope))?;
        for port in ports {
            write!(self.out, "|<{}> Line: {}", port.id, port.line)?;
        }
        writeln!(self.out, "\"]")
    }

    fn edge(&mut self, edge: &SinkEdge<'_>) -> io::Result<()> {
        writeln!(
            self.out,
            "\t{}:{} -> {}:{} [label = \"{}\"];",
            Self::node_name(edge.from_scope),
            edge.from_port,
            Self::node_name(edge.to_scope),
            edge.to_port,
            edge.label,
        )
    }

    fn finish(&mut self) -> io::Result<()> {
        writeln!(self.out, "}}")
    }
}

#[cfg(test)]
mod test {
    use hermes_types::{MessagingNode, Usage};

    use super::*;

    #[test]
    fn dot_output_has_nodes_ports_and_labels() {
        let fixture = hermes_core::test_utils::weather_fixture();
        let (send, recv) = {
            let mut send = MessagingNode::send(
                fixture.send_site,
                "weatherstation::Weather".into(),
                "src/weatherstation.rs".into(),
            );
            send.set_assignment(Some(3));
            let mut recv = MessagingNode::receive(
                fixture.recv_site,
                "Weather".into(),
                "src/dispatch.rs".into(),
            );
            recv.set_usage(Usage::new(UsageType::UnwrappedToSwitch, Some(fixture.switch_site)));
            (send, recv)
        };
        let pairs = vec![(&send, &recv)];

        let mut writer = DotWriter::new(Vec::new());
        emit_message_graph(&fixture.set, &pairs, &mut writer).unwrap();
        let rendered = String::from_utf8(writer.into_inner()).unwrap();

        assert!(rendered.starts_with("digraph structs {"));
        assert!(rendered.contains("rankdir=LR"));
        assert!(rendered.contains("src/weatherstation.rs"));
        assert!(rendered.contains("Line: 42"));
        assert!(rendered.contains("Line: 10"));
        assert!(rendered.contains("weatherstation::Weather: 3"));
        assert!(rendered.contains("handled at line 12"));
        assert!(rendered.trim_end().ends_with('}'));
    }

    #[test]
    fn record_labels_are_escaped() {
        assert_eq!(
            DotWriter::<Vec<u8>>::escape("Vec<u8> | {x}"),
            "Vec\\<u8\\> \\| \\{x\\}"
        );
    }

    #[test]
    fn node_names_are_stable_hashes() {
        assert_eq!(
            DotWriter::<Vec<u8>>::node_name("a.rs"),
            DotWriter::<Vec<u8>>::node_name("a.rs")
        );
        assert_ne!(
            DotWriter::<Vec<u8>>::node_name("a.rs"),
            DotWriter::<Vec<u8>>::node_name("b.rs")
        );
    }
}

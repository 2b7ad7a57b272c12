//! Message-graph assembly and the guided cross-component walk.
//!
//! [`message_map`] buckets matched pairs by sending scope, [`walker`] walks
//! the CFG across components using the per-site annotations to prune
//! constant-selected switches, [`graph`] folds pairs into a petgraph
//! structure and [`dot`] renders everything through a [`dot::GraphSink`] so
//! concrete emitters stay replaceable. Interactive choices go through the
//! [`guided::Prompter`] capability; the core stays headless.

pub mod dot;
pub use dot::{emit_message_graph, DotWriter, GraphSink};
pub mod graph;
pub use graph::{EdgeInfo, MessageGraph};
pub mod guided;
pub use guided::{run_guided, GuidedConfig, Prompter, SendChoice};
pub mod message_map;
pub use message_map::{build_message_map, build_node_map};
pub mod walker;
pub use walker::{walk_from_function, walk_message_path};

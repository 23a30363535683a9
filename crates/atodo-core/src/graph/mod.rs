//! The memory-routing graph.
//!
//! ```text
//! start -> controller -?-> update_user_profile  -> controller
//!                     -?-> update_todos         -> controller
//!                     -?-> update_instructions  -> controller
//!                     -?-> end
//! ```
//!
//! The controller runs after every user message and after every update node.
//! The router turns its tool call (if any) into the next node.

mod executor;
pub mod nodes;
mod observer;
mod router;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::MemoryType;

pub use executor::{GraphExecutor, TurnOutcome};
pub use observer::{RouteObserver, RouteRecorder};
pub use router::{Router, decide, route_message};

/// Closed set of graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    Start,
    Controller,
    UpdateProfile,
    UpdateTodos,
    UpdateInstructions,
    End,
}

impl NodeId {
    pub const ALL: [NodeId; 6] = [
        NodeId::Start,
        NodeId::Controller,
        NodeId::UpdateProfile,
        NodeId::UpdateTodos,
        NodeId::UpdateInstructions,
        NodeId::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::Start => "start",
            NodeId::Controller => "controller",
            NodeId::UpdateProfile => "update_user_profile",
            NodeId::UpdateTodos => "update_todos",
            NodeId::UpdateInstructions => "update_instructions",
            NodeId::End => "end",
        }
    }

    /// Update node responsible for `partition`.
    pub fn for_update(partition: MemoryType) -> Self {
        match partition {
            MemoryType::UserProfile => NodeId::UpdateProfile,
            MemoryType::Todo => NodeId::UpdateTodos,
            MemoryType::Instructions => NodeId::UpdateInstructions,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    /// Chosen by the router rather than always taken.
    pub conditional: bool,
}

const fn edge(from: NodeId, to: NodeId, conditional: bool) -> GraphEdge {
    GraphEdge {
        from,
        to,
        conditional,
    }
}

const EDGES: [GraphEdge; 8] = [
    edge(NodeId::Start, NodeId::Controller, false),
    edge(NodeId::Controller, NodeId::UpdateProfile, true),
    edge(NodeId::Controller, NodeId::UpdateTodos, true),
    edge(NodeId::Controller, NodeId::UpdateInstructions, true),
    edge(NodeId::Controller, NodeId::End, true),
    edge(NodeId::UpdateProfile, NodeId::Controller, false),
    edge(NodeId::UpdateTodos, NodeId::Controller, false),
    edge(NodeId::UpdateInstructions, NodeId::Controller, false),
];

/// Static description of the graph for visualizers.
pub fn graph_edges() -> &'static [GraphEdge] {
    &EDGES
}

/// Graphviz rendering; `active` highlights the most recent hop.
pub fn graph_dot(active: Option<(NodeId, NodeId)>) -> String {
    let mut dot = String::from("digraph atodo {\n    rankdir=TB;\n");
    for node in NodeId::ALL {
        let color = match active {
            Some((from, _)) if from == node => "green",
            Some((_, to)) if to == node => "red",
            _ => "lightblue",
        };
        dot.push_str(&format!(
            "    {node} [style=filled, fillcolor={color}];\n"
        ));
    }
    for GraphEdge {
        from,
        to,
        conditional,
    } in graph_edges()
    {
        let mut attrs = Vec::new();
        if *conditional {
            attrs.push("style=dashed");
        }
        if active == Some((*from, *to)) {
            attrs.push("color=green");
        }
        if attrs.is_empty() {
            dot.push_str(&format!("    {from} -> {to};\n"));
        } else {
            dot.push_str(&format!("    {from} -> {to} [{}];\n", attrs.join(", ")));
        }
    }
    dot.push_str("}\n");
    dot
}

//! ATodo Core - a personal assistant with long-term memory
//!
//! After every user message a controller decides whether the user's profile,
//! ToDo list or standing instructions need updating. A router sends the turn
//! to the matching update node, which reconciles the conversation into
//! structured records and reports back, until the controller answers without
//! asking for another update.
//!
//! - [`models`]: record schemas (`UserProfile`, `ToDo`) and the routing decision
//! - [`store`]: namespaced long-term memory, in memory or on redb
//! - [`conversation`]: short-term message history per conversation
//! - [`reconcile`]: validation and change summaries around the extractor
//! - [`graph`]: nodes, router, and executor
//! - [`assistant`]: the service facade

pub mod assistant;
pub mod config;
pub mod conversation;
pub mod error;
pub mod graph;
pub mod models;
pub mod prompts;
pub mod reconcile;
pub mod store;
pub mod template;

pub use assistant::{Assistant, AssistantBuilder};
pub use config::{AssistantConfig, GraphConfig};
pub use conversation::ConversationStore;
pub use error::{GraphError, Result};
pub use graph::{
    GraphEdge, GraphExecutor, NodeId, RouteObserver, RouteRecorder, TurnOutcome, graph_dot,
    graph_edges,
};
pub use models::{MemoryType, TaskStatus, ToDo, UpdateMemory, UserProfile};
pub use reconcile::{RecordChange, Reconciler};
pub use store::{InMemoryStore, MemoryStore, Namespace, RedbMemoryStore, StoredRecord};

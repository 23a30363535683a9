pub mod chat;
pub mod graph;
pub mod memory;
pub mod simulate;

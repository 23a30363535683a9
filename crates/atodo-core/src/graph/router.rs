use std::sync::Arc;

use atodo_ai::Message;

use super::observer::notify;
use super::{NodeId, RouteObserver};
use crate::error::{GraphError, Result};
use crate::models::{MemoryType, UpdateMemory};

/// Parse the memory update requested by `message`, if any.
///
/// Only the first tool call counts. Anything other than an `UpdateMemory`
/// call naming a known partition is an error.
pub fn decide(message: &Message) -> Result<Option<MemoryType>> {
    let Some(call) = message.tool_calls().first() else {
        return Ok(None);
    };

    if call.name != UpdateMemory::TOOL_NAME {
        return Err(GraphError::UnrecognizedDecision(format!(
            "unexpected tool '{}'",
            call.name
        )));
    }

    let decision: UpdateMemory = serde_json::from_value(call.arguments.clone())
        .map_err(|e| GraphError::UnrecognizedDecision(format!("{}: {e}", call.arguments)))?;
    Ok(Some(decision.update_type))
}

/// Next node after the controller produced `message`.
pub fn route_message(message: &Message) -> Result<NodeId> {
    Ok(match decide(message)? {
        Some(partition) => NodeId::for_update(partition),
        None => NodeId::End,
    })
}

/// Routes controller output and tells observers about each decision.
#[derive(Clone, Default)]
pub struct Router {
    observers: Vec<Arc<dyn RouteObserver>>,
}

impl Router {
    pub fn new(observers: Vec<Arc<dyn RouteObserver>>) -> Self {
        Self { observers }
    }

    pub fn route(&self, current: NodeId, message: &Message) -> Result<NodeId> {
        let next = route_message(message)?;
        tracing::debug!(from = %current, to = %next, "Routing");
        notify(&self.observers, current, next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RouteRecorder;
    use atodo_ai::ToolCall;
    use serde_json::{Value, json};

    fn with_call(name: &str, arguments: Value) -> Message {
        Message::assistant_with_tool_calls(
            None,
            vec![ToolCall {
                id: "call-1".to_string(),
                name: name.to_string(),
                arguments,
            }],
        )
    }

    #[test]
    fn test_router_is_total_over_known_decisions() {
        let cases = [
            ("user_profile", NodeId::UpdateProfile),
            ("todo", NodeId::UpdateTodos),
            ("instructions", NodeId::UpdateInstructions),
        ];
        for (update_type, expected) in cases {
            let message = with_call("UpdateMemory", json!({"update_type": update_type}));
            assert_eq!(route_message(&message).unwrap(), expected);
        }
        assert_eq!(route_message(&Message::assistant("hi")).unwrap(), NodeId::End);
    }

    #[test]
    fn test_unknown_decisions_are_fatal() {
        let bad = [
            with_call("UpdateMemory", json!({"update_type": "calendar"})),
            with_call("UpdateMemory", json!({})),
            with_call("UpdateMemory", json!("todo")),
            with_call("Search", json!({"update_type": "todo"})),
        ];
        for message in bad {
            assert!(matches!(
                route_message(&message),
                Err(GraphError::UnrecognizedDecision(_))
            ));
        }
    }

    #[test]
    fn test_observers_see_decision_but_not_failures() {
        let recorder = RouteRecorder::new();
        let router = Router::new(vec![Arc::new(recorder.clone())]);

        let next = router
            .route(
                NodeId::Controller,
                &with_call("UpdateMemory", json!({"update_type": "todo"})),
            )
            .unwrap();
        assert_eq!(next, NodeId::UpdateTodos);

        let failed = router.route(
            NodeId::Controller,
            &with_call("UpdateMemory", json!({"update_type": "x"})),
        );
        assert!(failed.is_err());
        assert_eq!(
            recorder.hops(),
            vec![(NodeId::Controller, NodeId::UpdateTodos)]
        );
    }
}

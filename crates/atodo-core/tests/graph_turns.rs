//! End-to-end turns through the routing graph with a scripted model

use std::sync::Arc;

use atodo_ai::{MockLlmClient, MockStep, PATCH_DOC_TOOL, Role, ToolCall, ToolChoice};
use atodo_core::{
    Assistant, AssistantConfig, GraphConfig, GraphError, InMemoryStore, MemoryStore, MemoryType,
    Namespace, NodeId, RedbMemoryStore, RouteRecorder, TaskStatus, ToDo,
};
use serde_json::{Value, json};

fn update_memory(id: &str, update_type: &str) -> MockStep {
    MockStep::tool_call(id, "UpdateMemory", json!({"update_type": update_type}))
}

fn setup(steps: Vec<MockStep>) -> (MockLlmClient, Arc<InMemoryStore>, Assistant) {
    let llm = MockLlmClient::from_steps("mock", steps);
    let store = Arc::new(InMemoryStore::new());
    let assistant = Assistant::new(Arc::new(llm.clone()), store.clone());
    (llm, store, assistant)
}

fn ns(partition: MemoryType) -> Namespace {
    Namespace::for_config(partition, &AssistantConfig::default())
}

fn counts(store: &InMemoryStore) -> Vec<usize> {
    MemoryType::ALL
        .into_iter()
        .map(|partition| store.search(&ns(partition)).unwrap().len())
        .collect()
}

#[tokio::test]
async fn test_new_task_is_created() {
    let (_llm, store, assistant) = setup(vec![
        update_memory("call-1", "todo"),
        MockStep::tool_call(
            "x-1",
            "ToDo",
            json!({"task": "Buy milk", "deadline": "2026-10-23T17:00:00"}),
        ),
        MockStep::text("I added \"Buy milk\" to your ToDo list."),
    ]);
    let recorder = RouteRecorder::new();
    assistant.add_route_observer(recorder.clone());

    let reply = assistant.submit_turn("1", "Buy milk by Friday").await.unwrap();
    assert_eq!(reply, "I added \"Buy milk\" to your ToDo list.");

    let tasks = store.search(&ns(MemoryType::Todo)).unwrap();
    assert_eq!(tasks.len(), 1);
    let task: ToDo = serde_json::from_value(tasks[0].value.clone()).unwrap();
    assert_eq!(task.task, "Buy milk");
    assert!(task.deadline.is_some());
    assert_eq!(task.status, TaskStatus::NotStarted);

    let history = assistant.history("1").await;
    let roles: Vec<Role> = history.iter().map(|m| m.role.clone()).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    let tool_result = &history[2];
    assert_eq!(tool_result.tool_call_id.as_deref(), Some("call-1"));
    assert!(tool_result.content.contains("New ToDo created"));
    assert!(tool_result.content.contains("Buy milk"));

    assert_eq!(
        recorder.hops(),
        vec![
            (NodeId::Start, NodeId::Controller),
            (NodeId::Controller, NodeId::UpdateTodos),
            (NodeId::UpdateTodos, NodeId::Controller),
            (NodeId::Controller, NodeId::End),
        ]
    );
}

#[tokio::test]
async fn test_existing_task_is_patched_in_place() {
    let (_llm, store, assistant) = setup(vec![
        update_memory("call-1", "todo"),
        MockStep::tool_call(
            "x-1",
            PATCH_DOC_TOOL,
            json!({
                "json_doc_id": "t1",
                "planned_edits": "Mark the milk task as done",
                "patches": [{"op": "replace", "path": "/status", "value": "done"}]
            }),
        ),
        MockStep::text("Nice, I marked it as done."),
    ]);
    store
        .put(
            &ns(MemoryType::Todo),
            "t1",
            serde_json::to_value(ToDo::new("Buy milk")).unwrap(),
        )
        .unwrap();

    assistant.submit_turn("1", "I bought the milk").await.unwrap();

    let tasks = store.search(&ns(MemoryType::Todo)).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].key, "t1");
    assert_eq!(tasks[0].value["status"], "done");
    assert_eq!(tasks[0].value["task"], "Buy milk");

    let history = assistant.history("1").await;
    assert!(history[2].content.starts_with("Document t1 updated:"));
}

#[tokio::test]
async fn test_string_encoded_patch_is_reported_as_update() {
    let (_llm, store, assistant) = setup(vec![
        update_memory("call-1", "todo"),
        MockStep::tool_call(
            "x-1",
            PATCH_DOC_TOOL,
            json!({
                "json_doc_id": "t1",
                "planned_edits": "Mark done",
                "patches": "[{\"op\":\"replace\",\"path\":\"/status\",\"value\":\"done\"}]"
            }),
        ),
        MockStep::text("Marked as done."),
    ]);
    store
        .put(
            &ns(MemoryType::Todo),
            "t1",
            serde_json::to_value(ToDo::new("Buy milk")).unwrap(),
        )
        .unwrap();

    assistant.submit_turn("1", "I bought the milk").await.unwrap();

    let tasks = store.search(&ns(MemoryType::Todo)).unwrap();
    assert_eq!(tasks[0].value["status"], "done");
    assert_eq!(
        history_tool_content(&assistant).await,
        "Document t1 updated:\nPlan: Mark done\nAdded content: done"
    );
}

#[tokio::test]
async fn test_profile_patch_keeps_single_record() {
    let (llm, store, assistant) = setup(vec![
        update_memory("call-1", "user_profile"),
        MockStep::tool_call(
            "x-1",
            PATCH_DOC_TOOL,
            json!({
                "json_doc_id": "p1",
                "planned_edits": "Add location",
                "patches": [{"op": "add", "path": "/location", "value": "Beaverton, Oregon"}]
            }),
        ),
        MockStep::text("Beaverton is lovely."),
    ]);
    store
        .put(
            &ns(MemoryType::UserProfile),
            "p1",
            json!({"name": "Dan", "location": null, "job": null, "connections": [], "interests": []}),
        )
        .unwrap();

    assistant
        .submit_turn("1", "I live in Beaverton, Oregon")
        .await
        .unwrap();

    let profiles = store.search(&ns(MemoryType::UserProfile)).unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].key, "p1");
    assert_eq!(profiles[0].value["name"], "Dan");
    assert_eq!(profiles[0].value["location"], "Beaverton, Oregon");

    // Patch-only: with a profile on file the schema tool is not offered.
    let requests = llm.captured_requests().await;
    let tools: Vec<&str> = requests[1].tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tools, vec![PATCH_DOC_TOOL]);
    assert_eq!(history_tool_content(&assistant).await, "updated profile");
}

async fn history_tool_content(assistant: &Assistant) -> String {
    assistant
        .history("1")
        .await
        .into_iter()
        .find(|m| m.role == Role::Tool)
        .map(|m| m.content)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_new_profile_is_created_once_without_losing_fields() {
    let (llm, store, assistant) = setup(vec![
        update_memory("call-1", "user_profile"),
        MockStep::tool_calls(vec![
            ToolCall {
                id: "x-1".to_string(),
                name: "UserProfile".to_string(),
                arguments: json!({"name": "Dan"}),
            },
            ToolCall {
                id: "x-2".to_string(),
                name: "UserProfile".to_string(),
                arguments: json!({"location": "Beaverton", "interests": ["biking"]}),
            },
        ]),
        MockStep::text("Nice to meet you, Dan."),
    ]);

    assistant
        .submit_turn("1", "I am Dan from Beaverton and I like biking")
        .await
        .unwrap();

    let profiles = store.search(&ns(MemoryType::UserProfile)).unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].value["name"], "Dan");
    assert_eq!(profiles[0].value["location"], "Beaverton");
    assert_eq!(profiles[0].value["interests"], json!(["biking"]));

    // The first profile is requested as a single forced call.
    let requests = llm.captured_requests().await;
    assert_eq!(
        requests[1].tool_choice,
        Some(ToolChoice::Tool("UserProfile".to_string()))
    );
}

#[tokio::test]
async fn test_no_tool_call_terminates_without_updates() {
    let (llm, store, assistant) = setup(vec![MockStep::text("Hello! How can I help?")]);
    let before = counts(&store);

    let reply = assistant.submit_turn("1", "hi").await.unwrap();

    assert_eq!(reply, "Hello! How can I help?");
    assert_eq!(counts(&store), before);
    assert_eq!(llm.captured_requests().await.len(), 1);
}

#[tokio::test]
async fn test_turns_share_conversation_history() {
    let (llm, _store, assistant) = setup(vec![
        MockStep::text("Hi Dan"),
        MockStep::text("You said your name is Dan"),
    ]);

    assistant.submit_turn("1", "I am Dan").await.unwrap();
    assistant.submit_turn("1", "What is my name?").await.unwrap();
    assistant.submit_turn("2", "Fresh start").await.unwrap();

    let requests = llm.captured_requests().await;
    // System prompt, then the first exchange, then the new message.
    let second: Vec<&str> = requests[1].messages[1..]
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(second, vec!["I am Dan", "Hi Dan", "What is my name?"]);
    // Another conversation starts from scratch.
    assert_eq!(requests[2].messages.len(), 2);
    assert_eq!(assistant.history("1").await.len(), 4);
}

#[tokio::test]
async fn test_instructions_are_overwritten() {
    let (llm, store, assistant) = setup(vec![
        update_memory("call-1", "instructions"),
        MockStep::text("Group tasks by deadline."),
        MockStep::text("Got it."),
    ]);
    store
        .put(
            &ns(MemoryType::Instructions),
            "user_instructions",
            json!({"memory": "Old preferences"}),
        )
        .unwrap();

    assistant
        .submit_turn("1", "Please always group my tasks by deadline")
        .await
        .unwrap();

    let records = store.search(&ns(MemoryType::Instructions)).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, json!({"memory": "Group tasks by deadline."}));

    let requests = llm.captured_requests().await;
    let update_request = &requests[1];
    assert!(update_request.tools.is_empty());
    assert!(update_request.messages[0].content.contains("Old preferences"));
    assert_eq!(
        update_request.messages.last().map(|m| m.content.as_str()),
        Some("Please update the instructions based on the conversation")
    );
    assert_eq!(history_tool_content(&assistant).await, "updated instructions");
}

#[tokio::test]
async fn test_unrecognized_decision_fails_turn_without_committing_history() {
    let (_llm, store, assistant) = setup(vec![
        MockStep::text("Hello"),
        update_memory("call-1", "calendar"),
    ]);

    assistant.submit_turn("1", "hi").await.unwrap();
    let err = assistant
        .submit_turn("1", "add a meeting")
        .await
        .unwrap_err();

    assert!(matches!(err, GraphError::UnrecognizedDecision(_)));
    assert_eq!(assistant.history("1").await.len(), 2);
    assert_eq!(counts(&store), vec![0, 0, 0]);
}

#[tokio::test]
async fn test_invalid_task_writes_nothing() {
    let (_llm, store, assistant) = setup(vec![
        update_memory("call-1", "todo"),
        MockStep::tool_calls(vec![
            ToolCall {
                id: "x-1".to_string(),
                name: "ToDo".to_string(),
                arguments: json!({"task": "Valid"}),
            },
            ToolCall {
                id: "x-2".to_string(),
                name: "ToDo".to_string(),
                arguments: json!({"task": "Bad", "status": "someday"}),
            },
        ]),
    ]);

    let err = assistant.submit_turn("1", "two tasks").await.unwrap_err();

    assert!(matches!(
        err,
        GraphError::InvalidRecord {
            partition: MemoryType::Todo,
            ..
        }
    ));
    assert!(store.search(&ns(MemoryType::Todo)).unwrap().is_empty());
}

#[tokio::test]
async fn test_model_failure_surfaces_as_llm_error() {
    let (_llm, _store, assistant) = setup(vec![MockStep::error("service unavailable")]);

    let err = assistant.submit_turn("1", "hi").await.unwrap_err();

    assert!(matches!(err, GraphError::Llm(_)));
    assert!(err.is_model_failure());
    assert!(assistant.history("1").await.is_empty());
}

#[tokio::test]
async fn test_step_limit_stops_runaway_turns() {
    let mut steps = Vec::new();
    for n in 0..10 {
        steps.push(update_memory(&format!("call-{n}"), "instructions"));
        steps.push(MockStep::text("same instructions"));
    }
    let llm = MockLlmClient::from_steps("mock", steps);
    let assistant = Assistant::builder(Arc::new(llm), Arc::new(InMemoryStore::new()))
        .graph_config(GraphConfig { max_steps: 5 })
        .build();

    let err = assistant.submit_turn("1", "loop").await.unwrap_err();

    assert!(matches!(err, GraphError::StepLimitExceeded { limit: 5 }));
}

#[tokio::test]
async fn test_memory_is_isolated_per_user_and_shared_across_conversations() {
    let (_llm, store, assistant) = setup(vec![
        update_memory("call-1", "todo"),
        MockStep::tool_call("x-1", "ToDo", json!({"task": "Water plants"})),
        MockStep::text("Added."),
        MockStep::text("You have one task."),
    ]);
    let other_user = AssistantConfig::new("someone-else", "general");

    assistant.submit_turn("1", "Water the plants").await.unwrap();
    assistant
        .submit_turn_with("2", &other_user, "What do I have to do?")
        .await
        .unwrap();

    assert_eq!(
        assistant
            .query_memory(MemoryType::Todo, "general", "default-user")
            .unwrap()
            .len(),
        1
    );
    assert!(
        assistant
            .query_memory(MemoryType::Todo, "general", "someone-else")
            .unwrap()
            .is_empty()
    );
    assert_eq!(store.search(&ns(MemoryType::Todo)).unwrap().len(), 1);
}

#[tokio::test]
async fn test_redb_store_backs_a_full_turn() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atodo.db");
    let llm = MockLlmClient::from_steps(
        "mock",
        vec![
            update_memory("call-1", "todo"),
            MockStep::tool_call("x-1", "ToDo", json!({"task": "Renew passport"})),
            MockStep::text("Added."),
        ],
    );

    {
        let store = Arc::new(RedbMemoryStore::open(&path).unwrap());
        let assistant = Assistant::new(Arc::new(llm), store);
        assistant.submit_turn("1", "Renew my passport").await.unwrap();
    }

    let reopened = RedbMemoryStore::open(&path).unwrap();
    let tasks = reopened.search(&ns(MemoryType::Todo)).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].value["task"], Value::from("Renew passport"));
}

#[tokio::test]
async fn test_concurrent_turns_for_one_user_are_serialized() {
    let (llm, store, assistant) = setup(vec![
        update_memory("call-1", "todo").with_delay(30),
        MockStep::tool_call("x-1", "ToDo", json!({"task": "Buy milk"})).with_delay(30),
        MockStep::text("Added."),
        MockStep::text("You need to buy milk."),
    ]);

    let (first, second) = tokio::join!(
        assistant.submit_turn("kitchen", "Buy milk"),
        assistant.submit_turn("office", "What is on my list?"),
    );

    assert_eq!(first.unwrap(), "Added.");
    assert_eq!(second.unwrap(), "You need to buy milk.");
    assert_eq!(store.search(&ns(MemoryType::Todo)).unwrap().len(), 1);

    // The second turn starts only after the first one's write.
    let requests = llm.captured_requests().await;
    assert_eq!(requests.len(), 4);
    let second_controller = &requests[3];
    assert!(second_controller.messages[0].content.contains("Buy milk"));
    assert_eq!(
        second_controller.messages.last().map(|m| m.content.as_str()),
        Some("What is on my list?")
    );
    assert_eq!(assistant.history("office").await.len(), 2);
}

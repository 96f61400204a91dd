//! 编排链路集成测试：指令 → 分解 → 执行 → 持久化往返

use std::sync::Arc;

use serde_json::json;

use arna::core::{AgentManager, Task, TaskPlanner, TaskStatus, CURRENT_TASK_KEY};
use arna::llm::MockLlmClient;
use arna::memory::{FileStore, InMemoryStore, LongTermStore};
use arna::tools::EchoTool;

/// 五个叶子阶段：每个叶子消耗一条步骤回复与一条评估回复
fn scripted_llm_for_five_leaves() -> MockLlmClient {
    let mut responses = Vec::new();
    for _ in 0..5 {
        responses.push(
            r#"[{"description": "echo a marker", "tool_name": "echo", "parameters": {"text": "done"}}]"#
                .to_string(),
        );
        responses.push("yes".to_string());
    }
    MockLlmClient::with_responses(responses)
}

#[tokio::test]
async fn test_instruction_to_completed_tree() {
    let store = InMemoryStore::new();
    let mut agent = AgentManager::new(
        Arc::new(scripted_llm_for_five_leaves()),
        Arc::new(store),
    );
    agent.register_tool(EchoTool);

    agent.process_instruction("tidy up the backlog");
    agent.execute_current_task().await;

    let root = agent.current_task().unwrap();
    assert_eq!(root.status, TaskStatus::Completed);
    assert_eq!(root.subtasks.len(), 5);
    for sub in &root.subtasks {
        assert_eq!(sub.status, TaskStatus::Completed);
        assert!(sub.completed_at.is_some());
    }

    // 每个叶子的步骤结果都写进了短期记忆，历史按执行顺序记录五条
    let memory = agent.memory();
    let mut mem = memory.lock().unwrap();
    assert_eq!(mem.recall("step_0_result"), Some(json!("done")));
    let names: Vec<String> = mem
        .task_history(None)
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["analyze", "plan", "execute", "verify", "report"]);
}

#[tokio::test]
async fn test_failure_is_reported_not_raised() {
    // 所有步骤规划回复都不是 JSON：叶子全部失败，根任务 FAILED，但调用不抛错
    let mut agent = AgentManager::new(
        Arc::new(MockLlmClient::with_responses(
            std::iter::repeat("not json".to_string()).take(5).collect::<Vec<_>>(),
        )),
        Arc::new(InMemoryStore::new()),
    );

    agent.process_instruction("doomed instruction");
    let result = agent.execute_current_task().await;
    assert_eq!(result, None);

    let root = agent.current_task().unwrap();
    assert_eq!(root.status, TaskStatus::Failed);
    for sub in &root.subtasks {
        assert_eq!(sub.status, TaskStatus::Failed);
        assert!(sub.metadata["error"].as_str().unwrap().contains("no JSON"));
    }
}

#[tokio::test]
async fn test_state_survives_process_boundary() {
    let dir = tempfile::tempdir().unwrap();

    let original_id = {
        let mut agent = AgentManager::new(
            Arc::new(MockLlmClient::new()),
            Arc::new(FileStore::new(dir.path())),
        );
        let id = agent.process_instruction("long running job").id.clone();
        agent.save_state();
        id
    };

    // 新的管理器挂同一目录，模拟进程重启
    let mut revived = AgentManager::new(
        Arc::new(MockLlmClient::new()),
        Arc::new(FileStore::new(dir.path())),
    );
    assert!(revived.load_state().unwrap());

    let task = revived.current_task().unwrap();
    assert_eq!(task.id, original_id);
    assert_eq!(task.name, "long running job");
    let stages: Vec<&str> = task.subtasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(stages, vec!["analyze", "plan", "execute", "verify", "report"]);
}

#[tokio::test]
async fn test_planner_tree_round_trips_through_store() {
    // 规则表规划的树经 to_record 持久化再还原，结构与顺序不变
    let planner = TaskPlanner::new();
    let mut task = planner.create_task("Implement exporter", "write the exporter");
    planner.plan_task(&mut task, 4).await;

    let store = InMemoryStore::new();
    store.set(CURRENT_TASK_KEY, &task.to_record()).unwrap();

    let restored = Task::from_record(store.get(CURRENT_TASK_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(restored.id, task.id);
    assert_eq!(restored.status, TaskStatus::InProgress);
    assert_eq!(
        restored
            .subtasks
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>(),
        vec![
            "requirements analysis",
            "design",
            "implementation",
            "testing",
            "documentation"
        ]
    );
}

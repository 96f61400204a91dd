//! 任务规划器
//!
//! create_task 产出 Pending 任务；plan_task 先置 Planning，经外部规划
//! （LLM 返回 JSON 子任务数组）或规则表启发式生成有序子任务，最后置
//! InProgress。外部规划失败只记日志并留空子任务，不回落到规则表。

use std::sync::Arc;

use crate::core::decompose::{DecompositionStrategy, HeuristicDecomposition, SubtaskSpec};
use crate::core::{AgentError, Task, TaskStatus};
use crate::llm::{extract_json, LlmClient, Message};

/// 任务规划器：可选外部规划能力，未配置时走确定性规则表
#[derive(Default)]
pub struct TaskPlanner {
    llm: Option<Arc<dyn LlmClient>>,
    heuristic: HeuristicDecomposition,
}

impl TaskPlanner {
    /// 无外部规划能力的规划器（规则表路径）
    pub fn new() -> Self {
        Self::default()
    }

    /// 配置外部规划能力的规划器
    pub fn with_llm(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm: Some(llm),
            heuristic: HeuristicDecomposition,
        }
    }

    /// 创建 Pending 状态的新任务
    pub fn create_task(&self, name: impl Into<String>, description: impl Into<String>) -> Task {
        Task::new(name, description)
    }

    /// 把任务分解为子任务树的一层
    ///
    /// complexity 收敛到 1..=5，仅外部规划路径使用。外部路径失败时
    /// 子任务留空（只记日志）；规则表路径对相同输入恒产出相同序列。
    pub async fn plan_task(&self, task: &mut Task, complexity: u8) {
        task.update_status(TaskStatus::Planning);
        let complexity = complexity.clamp(1, 5);

        let specs = match &self.llm {
            Some(llm) => match self.plan_with_llm(llm.as_ref(), task, complexity).await {
                Ok(specs) => specs,
                Err(e) => {
                    tracing::warn!(
                        task_id = %task.id,
                        error = %e,
                        "external planning failed, leaving task without subtasks"
                    );
                    Vec::new()
                }
            },
            None => self.heuristic.decompose(&task.name, &task.description),
        };

        for spec in specs {
            task.add_subtask(spec.name, spec.description);
        }
        task.update_status(TaskStatus::InProgress);
    }

    async fn plan_with_llm(
        &self,
        llm: &dyn LlmClient,
        task: &Task,
        complexity: u8,
    ) -> Result<Vec<SubtaskSpec>, AgentError> {
        let prompt = format!(
            "Decompose the following task into an ordered list of subtasks.\n\
             Task name: {}\n\
             Task description: {}\n\
             Complexity level: {} (1 = trivial, 5 = very complex)\n\n\
             Respond with a JSON array of objects, each with \"name\" and \
             \"description\" fields, in execution order.",
            task.name, task.description, complexity
        );

        let reply = llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::Llm)?;

        let value = extract_json(&reply).ok_or_else(|| {
            AgentError::Planning(format!("no JSON subtask list in reply: {reply}"))
        })?;
        serde_json::from_value(value)
            .map_err(|e| AgentError::Planning(format!("malformed subtask list: {e}")))
    }
}

//! 执行引擎
//!
//! 按插入顺序递归执行任务树：父节点对子结果做 AND 聚合且不短路（前面的
//! 子任务失败不会阻止后面的执行）；叶子走「LLM 步骤规划 → 工具调用 →
//! LLM 评估」流程。引擎内部失败一律在任务边界吸收为 FAILED +
//! metadata["error"]，execute_task 从不向调用方抛错。

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::{AgentError, Task, TaskStatus};
use crate::llm::{extract_json, LlmClient, Message};
use crate::memory::MemoryManager;
use crate::tools::{Tool, ToolRegistry};

/// 外部服务返回的单个执行步骤
#[derive(Debug, Deserialize)]
struct PlannedStep {
    description: String,
    tool_name: String,
    #[serde(default)]
    parameters: Value,
}

/// 执行引擎：持有 LLM、工具注册表、共享记忆与取消令牌
pub struct ExecutionEngine {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    memory: Arc<Mutex<MemoryManager>>,
    cancel: CancellationToken,
}

impl ExecutionEngine {
    pub fn new(llm: Arc<dyn LlmClient>, memory: Arc<Mutex<MemoryManager>>) -> Self {
        Self {
            llm,
            tools: ToolRegistry::new(),
            memory,
            cancel: CancellationToken::new(),
        }
    }

    /// 换用外部取消令牌（默认自带一个从不触发的令牌）
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 注册工具；同名后注册者覆盖前者
    pub fn register_tool(&mut self, tool: impl Tool + 'static) {
        self.tools.register(tool);
    }

    /// 执行任务树，返回整体是否成功
    ///
    /// 递归深度即树深度；兄弟节点严格串行。引擎内部失败不会以 Err 形式
    /// 逃逸，调用方通过任务 status 与 metadata 读取结果。
    pub fn execute_task<'a>(
        &'a self,
        task: &'a mut Task,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            if self.cancel.is_cancelled() {
                task.update_status(TaskStatus::Cancelled);
                if task.subtasks.is_empty() {
                    self.snapshot_to_history(task);
                }
                return false;
            }

            task.update_status(TaskStatus::InProgress);

            if task.subtasks.is_empty() {
                return self.execute_leaf(task).await;
            }

            // 所有子任务都会被尝试：不因前面的失败短路
            let mut all_ok = true;
            for child in task.subtasks.iter_mut() {
                let ok = self.execute_task(child).await;
                all_ok = all_ok && ok;
            }
            task.update_status(if all_ok {
                TaskStatus::Completed
            } else {
                TaskStatus::Failed
            });
            all_ok
        })
    }

    /// 叶子执行边界：吸收一切内部错误，记快照后返回成败
    async fn execute_leaf(&self, task: &mut Task) -> bool {
        let ok = match self.run_steps(task).await {
            Ok(success) => {
                task.update_status(if success {
                    TaskStatus::Completed
                } else {
                    TaskStatus::Failed
                });
                success
            }
            Err(e) => {
                let text = e.to_string();
                tracing::warn!(task_id = %task.id, error = %text, "leaf execution failed");
                task.error = Some(text.clone());
                task.metadata
                    .insert("error".to_string(), Value::String(text));
                task.update_status(TaskStatus::Failed);
                false
            }
        };
        self.snapshot_to_history(task);
        ok
    }

    async fn run_steps(&self, task: &mut Task) -> Result<bool, AgentError> {
        let steps = self.plan_steps(task).await?;

        let mut executed = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            match self.invoke_tool(&step.tool_name, step.parameters.clone()).await {
                Ok(result) => {
                    if let Ok(mut mem) = self.memory.lock() {
                        mem.remember(&format!("step_{i}_result"), result, false);
                    }
                    executed.push(format!("{}. {} ({})", i + 1, step.description, step.tool_name));
                }
                Err(AgentError::ToolNotFound(name)) => {
                    // 未注册的工具不判失败，跳过该步骤
                    tracing::warn!(task_id = %task.id, tool = %name, "tool not registered, skipping step");
                    executed.push(format!(
                        "{}. {} (skipped: unknown tool {})",
                        i + 1,
                        step.description,
                        name
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        let verdict = self.evaluate(task, &executed).await?;
        task.result = Some(Value::String(verdict.clone()));
        Ok(verdict.to_lowercase().contains("yes"))
    }

    /// 请求外部服务给出有序步骤列表
    async fn plan_steps(&self, task: &Task) -> Result<Vec<PlannedStep>, AgentError> {
        let tool_list = if self.tools.is_empty() {
            "(no tools registered)".to_string()
        } else {
            self.tools
                .tool_descriptions()
                .iter()
                .map(|(name, desc)| format!("- {name}: {desc}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prompt = format!(
            "Plan the concrete steps needed to execute this task.\n\
             Task: {}\n\n\
             Available tools:\n{}\n\n\
             Respond with a JSON array of steps, each an object with \
             \"description\", \"tool_name\" and \"parameters\" fields. \
             Use only tools from the list.",
            task.description, tool_list
        );

        let reply = self
            .llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::Llm)?;

        let value = extract_json(&reply)
            .ok_or_else(|| AgentError::Execution(format!("no JSON step list in reply: {reply}")))?;
        serde_json::from_value(value)
            .map_err(|e| AgentError::Execution(format!("malformed step list: {e}")))
    }

    async fn invoke_tool(&self, name: &str, args: Value) -> Result<Value, AgentError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tool.execute(args).await.map_err(AgentError::Execution)
    }

    /// 让外部服务对执行结果做 yes/no 评估；回复中（大小写不敏感）含 "yes" 即成功
    async fn evaluate(&self, task: &Task, executed: &[String]) -> Result<String, AgentError> {
        let step_list = if executed.is_empty() {
            "(none)".to_string()
        } else {
            executed.join("\n")
        };
        let prompt = format!(
            "The task was: {}\n\
             The following steps were executed:\n{}\n\n\
             Did the execution accomplish the task? Answer yes or no.",
            task.description, step_list
        );
        self.llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::Llm)
    }

    fn snapshot_to_history(&self, task: &Task) {
        match self.memory.lock() {
            Ok(mut mem) => mem.add_task_to_history(task),
            Err(e) => tracing::error!(error = %e, "memory lock poisoned, snapshot dropped"),
        }
    }
}

//! Agent 门面
//!
//! 接收指令、持有唯一的 current_task、驱动规划与执行，并经长期存储
//! 持久化。指令入口用固定五阶段分解，与 TaskPlanner 的规则表是并存的
//! 两套策略；当前不支持同时跟踪多个任务。

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::core::decompose::{DecompositionStrategy, FixedStageDecomposition};
use crate::core::{AgentError, ExecutionEngine, Task, TaskPlanner};
use crate::llm::LlmClient;
use crate::memory::{LongTermStore, MemoryManager};
use crate::tools::Tool;

/// 当前任务在长期存储中的众所周知的键
pub const CURRENT_TASK_KEY: &str = "current_task";

/// Agent 门面：规划器、执行引擎、共享记忆与唯一 current_task
pub struct AgentManager {
    planner: TaskPlanner,
    engine: ExecutionEngine,
    memory: Arc<Mutex<MemoryManager>>,
    fixed_stages: FixedStageDecomposition,
    current_task: Option<Task>,
}

impl AgentManager {
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn LongTermStore>) -> Self {
        let memory = Arc::new(Mutex::new(MemoryManager::new(store)));
        Self {
            planner: TaskPlanner::with_llm(llm.clone()),
            engine: ExecutionEngine::new(llm, memory.clone()),
            memory,
            fixed_stages: FixedStageDecomposition,
            current_task: None,
        }
    }

    /// 注册叶子执行可用的工具
    pub fn register_tool(&mut self, tool: impl Tool + 'static) {
        self.engine.register_tool(tool);
    }

    pub fn planner(&self) -> &TaskPlanner {
        &self.planner
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current_task.as_ref()
    }

    /// 共享记忆句柄（快照、历史等只读用途）
    pub fn memory(&self) -> Arc<Mutex<MemoryManager>> {
        self.memory.clone()
    }

    /// 处理用户指令：以原文创建根任务并立即按固定五阶段分解
    /// （analyze / plan / execute / verify / report），整体替换先前的 current_task
    pub fn process_instruction(&mut self, instruction: &str) -> &Task {
        let mut root = Task::new(instruction, instruction);
        for spec in self.fixed_stages.decompose(&root.name, &root.description) {
            root.add_subtask(spec.name, spec.description);
        }
        self.current_task.insert(root)
    }

    /// 执行当前任务并返回其 result
    ///
    /// 执行序当前只有 current_task 一个元素，不做依赖感知调度。
    pub async fn execute_current_task(&mut self) -> Option<Value> {
        let task = self.current_task.as_mut()?;
        self.engine.execute_task(task).await;
        task.result.clone()
    }

    /// 当前任务的序列化记录；无任务时返回 {"status": "no_task"} 哨兵
    pub fn task_status(&self) -> Value {
        match &self.current_task {
            Some(task) => task.to_record(),
            None => serde_json::json!({"status": "no_task"}),
        }
    }

    /// 将当前任务记录写入长期键 "current_task"
    pub fn save_state(&self) {
        if let Some(task) = &self.current_task {
            match self.memory.lock() {
                Ok(mut mem) => mem.remember(CURRENT_TASK_KEY, task.to_record(), true),
                Err(e) => tracing::error!(error = %e, "memory lock poisoned, state not saved"),
            }
        }
    }

    /// 读取 "current_task"：命中则整体替换 current_task（不合并），返回是否命中；
    /// 损坏的记录以 Serialization 错误向上抛
    pub fn load_state(&mut self) -> Result<bool, AgentError> {
        let record = match self.memory.lock() {
            Ok(mut mem) => mem.recall(CURRENT_TASK_KEY),
            Err(e) => {
                tracing::error!(error = %e, "memory lock poisoned, state not loaded");
                None
            }
        };
        match record {
            Some(record) => {
                self.current_task = Some(Task::from_record(record)?);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

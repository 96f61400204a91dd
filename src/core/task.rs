//! 任务模型与状态机
//!
//! Task 是层级工作单元树的节点：父节点以 Vec<Task> 直接持有子任务（所有权树），
//! parent_id 仅存 id 反向引用，绝不存指针，避免所有权环。
//! 状态是封闭集合，所有消费方（规划器、引擎、持久化）对其穷尽匹配。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::AgentError;

/// 任务状态（封闭集合，序列化为小写下划线字符串，如 "in_progress"）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Planning,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// 是否为终态（Completed / Failed / Cancelled）
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// 任务树节点
///
/// 不变量：树内 id 唯一；updated_at 单调不减；completed_at 恰在转入
/// Completed 时盖章；子任务顺序即插入顺序，序列化往返后保持不变。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    /// 父任务 id 反向引用；通过 [`Task::find`] 在树上解析，不持有指针
    pub parent_id: Option<String>,
    pub subtasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// 运行期结果，不进入持久化记录；失败文本走 metadata["error"]
    #[serde(skip)]
    pub result: Option<Value>,
    #[serde(skip)]
    pub error: Option<String>,
}

impl Task {
    /// 创建 Pending 状态的新任务，id 为随机 UUID
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            parent_id: None,
            subtasks: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            metadata: Map::new(),
            result: None,
            error: None,
        }
    }

    /// 创建并追加一个子任务（parent_id 指向自身），返回其可变引用
    pub fn add_subtask(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut Task {
        let mut child = Task::new(name, description);
        child.parent_id = Some(self.id.clone());
        self.subtasks.push(child);
        self.touch();
        let last = self.subtasks.len() - 1;
        &mut self.subtasks[last]
    }

    /// 设置状态并推进 updated_at；转入 Completed 时同时盖 completed_at
    pub fn update_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.touch();
        if status == TaskStatus::Completed {
            self.completed_at = Some(self.updated_at);
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }

    /// 先序展开整棵子树（自身在前），用于审计与列表展示，不决定执行顺序
    pub fn all_subtasks(&self) -> Vec<&Task> {
        let mut out = Vec::new();
        self.collect_preorder(&mut out);
        out
    }

    fn collect_preorder<'a>(&'a self, out: &mut Vec<&'a Task>) {
        out.push(self);
        for sub in &self.subtasks {
            sub.collect_preorder(out);
        }
    }

    /// 按 id 在子树内查找节点，用于解析 parent_id 反向引用
    pub fn find(&self, id: &str) -> Option<&Task> {
        if self.id == id {
            return Some(self);
        }
        self.subtasks.iter().find_map(|t| t.find(id))
    }

    /// 递归结构化序列化；记录形如
    /// `{ id, name, description, status, parent_id, subtasks, created_at,
    ///    updated_at, completed_at | null, metadata }`
    pub fn to_record(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// 从记录还原任务树；损坏的记录返回 Serialization 错误
    pub fn from_record(record: Value) -> Result<Self, AgentError> {
        Ok(serde_json::from_value(record)?)
    }

    /// updated_at 单调不减：时钟回拨时保持原值
    fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("demo", "a demo task");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.parent_id.is_none());
        assert!(task.subtasks.is_empty());
        assert!(task.completed_at.is_none());
        assert!(task.result.is_none());
        assert!(task.error.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Planning.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_ids_unique() {
        let a = Task::new("a", "");
        let b = Task::new("b", "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_add_subtask_sets_parent_and_order() {
        let mut parent = Task::new("parent", "");
        parent.add_subtask("first", "1");
        parent.add_subtask("second", "2");

        assert_eq!(parent.subtasks.len(), 2);
        assert_eq!(parent.subtasks[0].name, "first");
        assert_eq!(parent.subtasks[1].name, "second");
        for sub in &parent.subtasks {
            assert_eq!(sub.parent_id.as_deref(), Some(parent.id.as_str()));
        }
    }

    #[test]
    fn test_update_status_stamps_completed_at() {
        let mut task = Task::new("t", "");
        task.update_status(TaskStatus::InProgress);
        assert!(task.completed_at.is_none());

        task.update_status(TaskStatus::Completed);
        assert!(task.is_completed());
        assert_eq!(task.completed_at, Some(task.updated_at));

        let mut failed = Task::new("f", "");
        failed.update_status(TaskStatus::Failed);
        assert!(failed.is_failed());
        assert!(failed.completed_at.is_none());
    }

    #[test]
    fn test_updated_at_monotonic() {
        let mut task = Task::new("t", "");
        let mut prev = task.updated_at;
        for status in [
            TaskStatus::Planning,
            TaskStatus::InProgress,
            TaskStatus::Completed,
        ] {
            task.update_status(status);
            assert!(task.updated_at >= prev);
            prev = task.updated_at;
        }
    }

    #[test]
    fn test_all_subtasks_preorder() {
        let mut root = Task::new("root", "");
        root.add_subtask("a", "").add_subtask("a1", "");
        root.add_subtask("b", "");

        let names: Vec<&str> = root.all_subtasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_find_resolves_parent_reference() {
        let mut root = Task::new("root", "");
        let child_parent_id = {
            let child = root.add_subtask("child", "");
            child.parent_id.clone().unwrap()
        };
        assert_eq!(root.find(&child_parent_id).unwrap().name, "root");
        assert!(root.find("missing").is_none());
    }

    #[test]
    fn test_record_round_trip() {
        let mut root = Task::new("root", "the root");
        root.metadata
            .insert("origin".to_string(), Value::String("test".to_string()));
        root.add_subtask("a", "first").update_status(TaskStatus::Completed);
        root.add_subtask("b", "second").update_status(TaskStatus::Failed);
        root.update_status(TaskStatus::InProgress);

        let record = root.to_record();
        let restored = Task::from_record(record).unwrap();

        assert_eq!(restored.id, root.id);
        assert_eq!(restored.name, root.name);
        assert_eq!(restored.description, root.description);
        assert_eq!(restored.status, root.status);
        assert_eq!(restored.created_at, root.created_at);
        assert_eq!(restored.updated_at, root.updated_at);
        assert_eq!(restored.completed_at, root.completed_at);
        assert_eq!(restored.metadata, root.metadata);
        assert_eq!(restored.subtasks.len(), 2);
        for (orig, back) in root.subtasks.iter().zip(restored.subtasks.iter()) {
            assert_eq!(back.id, orig.id);
            assert_eq!(back.name, orig.name);
            assert_eq!(back.status, orig.status);
            assert_eq!(back.parent_id, orig.parent_id);
            assert_eq!(back.completed_at, orig.completed_at);
        }
    }

    #[test]
    fn test_status_wire_format() {
        let mut task = Task::new("t", "");
        task.update_status(TaskStatus::InProgress);
        let record = task.to_record();
        assert_eq!(record["status"], "in_progress");
        assert_eq!(record["completed_at"], Value::Null);
    }

    #[test]
    fn test_from_record_rejects_corrupted() {
        let corrupted = serde_json::json!({"id": "x", "status": "nonsense"});
        assert!(matches!(
            Task::from_record(corrupted),
            Err(AgentError::Serialization(_))
        ));
    }
}

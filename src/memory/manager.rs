//! 分层记忆管理
//!
//! 短期是进程内表，长期挂 LongTermStore；recall 在长期命中时把值提升进
//! 短期（promotion），clear_short_term 不触碰长期副本。历史是只追加的
//! 任务快照日志。存储读写失败在此吸收：写失败记 error，读失败按未命中处理。

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::core::Task;
use crate::memory::LongTermStore;

/// 两张表的值拷贝与历史条数；改动它影响不到管理器内部状态
#[derive(Clone, Debug)]
pub struct MemorySnapshot {
    pub short_term: HashMap<String, Value>,
    pub long_term: HashMap<String, Value>,
    pub history_len: usize,
}

/// 分层记忆管理器
pub struct MemoryManager {
    short_term: HashMap<String, Value>,
    long_term: Arc<dyn LongTermStore>,
    history: Vec<Value>,
}

impl MemoryManager {
    pub fn new(long_term: Arc<dyn LongTermStore>) -> Self {
        Self {
            short_term: HashMap::new(),
            long_term,
            history: Vec::new(),
        }
    }

    /// 写入短期；persist 为 true 时同时写入长期
    pub fn remember(&mut self, key: &str, value: Value, persist: bool) {
        if persist {
            if let Err(e) = self.long_term.set(key, &value) {
                tracing::error!(key, error = %e, "long-term write failed");
            }
        }
        self.short_term.insert(key.to_string(), value);
    }

    /// 短期优先；长期命中时先提升进短期再返回；全未命中返回 None
    pub fn recall(&mut self, key: &str) -> Option<Value> {
        if let Some(v) = self.short_term.get(key) {
            return Some(v.clone());
        }
        match self.long_term.get(key) {
            Ok(Some(v)) => {
                self.short_term.insert(key.to_string(), v.clone());
                Some(v)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "long-term read failed, treating as miss");
                None
            }
        }
    }

    pub fn recall_or(&mut self, key: &str, default: Value) -> Value {
        self.recall(key).unwrap_or(default)
    }

    /// 从短期移除；purge_persisted 为 true 时连长期副本一并删除
    pub fn forget(&mut self, key: &str, purge_persisted: bool) {
        self.short_term.remove(key);
        if purge_persisted {
            if let Err(e) = self.long_term.remove(key) {
                tracing::error!(key, error = %e, "long-term remove failed");
            }
        }
    }

    /// 清空短期；长期不受影响
    pub fn clear_short_term(&mut self) {
        self.short_term.clear();
    }

    /// 追加任务的不可变快照（记录而非活引用）
    pub fn add_task_to_history(&mut self, task: &Task) {
        self.history.push(task.to_record());
    }

    /// 全量历史，或最近 limit 条（按执行顺序）
    pub fn task_history(&self, limit: Option<usize>) -> &[Value] {
        match limit {
            Some(n) if n < self.history.len() => &self.history[self.history.len() - n..],
            _ => &self.history,
        }
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        let mut long_term = HashMap::new();
        match self.long_term.keys() {
            Ok(keys) => {
                for key in keys {
                    if let Ok(Some(v)) = self.long_term.get(&key) {
                        long_term.insert(key, v);
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "long-term enumeration failed"),
        }
        MemorySnapshot {
            short_term: self.short_term.clone(),
            long_term,
            history_len: self.history.len(),
        }
    }
}

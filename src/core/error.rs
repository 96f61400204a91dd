//! Agent 错误类型
//!
//! 传播策略：引擎内部失败（规划、执行、工具缺失）在任务边界被吸收，
//! 调用方只通过任务的 status / metadata 感知结果；仅状态加载遇到
//! 损坏记录时以 Serialization 形式向上抛出。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（规划、执行、工具、LLM、持久化）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 外部分解调用失败或返回不可用数据；记日志后子任务留空，不上抛
    #[error("Planning failed: {0}")]
    Planning(String),

    /// 叶子执行期的工具 / 服务错误；吸收为 FAILED + metadata["error"]
    #[error("Execution failed: {0}")]
    Execution(String),

    /// 步骤引用了未注册的工具；告警后跳过该步骤，任务仍可成功
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    /// 持久化记录损坏；没有安全的默认值可替代，向调用方抛出
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

//! Arna - Rust 层级任务编排智能体核心
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 任务树与状态机、分解策略、规划器、执行引擎、Agent 门面
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）与结构化提取
//! - **memory**: 分层记忆（短期 / 长期 / 历史）与持久化后端
//! - **observability**: tracing 日志初始化
//! - **tools**: 工具 trait、注册表与内置 echo 工具

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;

//! 核心编排层：任务模型、分解策略、规划器、执行引擎、Agent 门面与错误类型

pub mod decompose;
pub mod engine;
pub mod error;
pub mod manager;
pub mod planner;
pub mod task;

pub use decompose::{DecompositionStrategy, FixedStageDecomposition, HeuristicDecomposition, SubtaskSpec};
pub use engine::ExecutionEngine;
pub use error::AgentError;
pub use manager::{AgentManager, CURRENT_TASK_KEY};
pub use planner::TaskPlanner;
pub use task::{Task, TaskStatus};

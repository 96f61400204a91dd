//! 任务分解策略
//!
//! 系统中并存两套独立的分解策略：TaskPlanner 走规则表启发式（按任务名
//! 子串匹配），AgentManager 的指令入口走固定五阶段。二者入口不同，
//! 行为差异是刻意保留的，不做合并。

use serde::{Deserialize, Serialize};

/// 分解产物：一个待创建子任务的名称与描述
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubtaskSpec {
    pub name: String,
    pub description: String,
}

/// 分解策略接口：输入任务名与描述，输出有序子任务列表
pub trait DecompositionStrategy: Send + Sync {
    fn decompose(&self, name: &str, description: &str) -> Vec<SubtaskSpec>;
}

fn specs(pairs: &[(&str, &str)]) -> Vec<SubtaskSpec> {
    pairs
        .iter()
        .map(|(name, description)| SubtaskSpec {
            name: (*name).to_string(),
            description: (*description).to_string(),
        })
        .collect()
}

/// 规则表启发式：按任务名的大小写不敏感子串匹配，依次检查
/// 开发 / 测试 / 设计三类，未命中时退为通用三步。
/// 同样输入恒产出同样序列，可作黄金测试。
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicDecomposition;

impl DecompositionStrategy for HeuristicDecomposition {
    fn decompose(&self, name: &str, _description: &str) -> Vec<SubtaskSpec> {
        let lowered = name.to_lowercase();

        if lowered.contains("develop") || lowered.contains("implement") {
            specs(&[
                ("requirements analysis", "Clarify and analyze the requirements"),
                ("design", "Design the solution"),
                ("implementation", "Implement the solution"),
                ("testing", "Test the implementation"),
                ("documentation", "Document the result"),
            ])
        } else if lowered.contains("test") {
            specs(&[
                ("test plan", "Draw up the test plan"),
                ("test case authoring", "Author the test cases"),
                ("test execution", "Execute the test cases"),
                ("bug fixing", "Fix the defects found"),
            ])
        } else if lowered.contains("design") {
            specs(&[
                ("requirements confirmation", "Confirm the requirements"),
                ("architecture design", "Design the overall architecture"),
                ("detailed design", "Work out the detailed design"),
                ("review", "Review the design"),
            ])
        } else {
            specs(&[
                ("plan", "Plan how to carry out the task"),
                ("execute", "Carry out the plan"),
                ("verify", "Verify the outcome"),
            ])
        }
    }
}

/// 固定五阶段分解：AgentManager 处理指令时使用，与规则表无关
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedStageDecomposition;

impl DecompositionStrategy for FixedStageDecomposition {
    fn decompose(&self, _name: &str, _description: &str) -> Vec<SubtaskSpec> {
        specs(&[
            ("analyze", "Analyze the instruction"),
            ("plan", "Draw up an execution plan"),
            ("execute", "Carry out the planned work"),
            ("verify", "Verify the results"),
            ("report", "Report the outcome"),
        ])
    }
}

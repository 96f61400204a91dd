//! Arna - 层级任务编排智能体
//!
//! 入口：初始化日志、加载配置、处理单条指令并打印最终任务记录。

use std::sync::Arc;

use anyhow::Context;
use arna::config::load_config;
use arna::core::AgentManager;
use arna::llm::create_llm_from_config;
use arna::memory::FileStore;
use arna::tools::EchoTool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    arna::observability::init();

    let cfg = load_config(None).context("Failed to load config")?;

    let instruction = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if instruction.is_empty() {
        anyhow::bail!("usage: arna <instruction>");
    }

    let store = Arc::new(FileStore::new(&cfg.agent.memory_dir));
    let llm = create_llm_from_config(&cfg);

    let mut agent = AgentManager::new(llm, store);
    agent.register_tool(EchoTool);

    agent.process_instruction(&instruction);
    agent.execute_current_task().await;
    agent.save_state();

    println!("{}", serde_json::to_string_pretty(&agent.task_status())?);
    Ok(())
}

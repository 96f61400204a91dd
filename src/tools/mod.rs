//! 工具箱：Tool trait、按名注册表与内置 echo 工具
//!
//! 网页检索、数学求值等工具属外部协作方，不在本 crate 内实现；
//! 调用方按需实现 Tool 并注册进引擎。

pub mod echo;
pub mod registry;

pub use echo::EchoTool;
pub use registry::{Tool, ToolRegistry};

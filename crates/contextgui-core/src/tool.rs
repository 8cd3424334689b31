//! 外部工具执行抽象（`reg export` / `reg import`）。
//!
//! 目标：
//! - 将“启动进程、等待退出、收集退出码与 stderr”集中到一个窄接口
//! - 备份/还原逻辑只关心结果，不关心进程细节
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use thiserror::Error;

use crate::cancel::CancelFlag;

/// 外部工具执行结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// 退出码；被信号终止等无退出码场景为 `None`。
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// 用于错误提示的输出摘要：优先 stderr，为空时退回 stdout。
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// 外部工具执行错误（进程未能正常跑完）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// 进程启动或等待失败。
    #[error("启动外部工具失败: {0}")]
    Spawn(String),
    /// 等待期间收到取消请求（进程已被终止）。
    #[error("外部工具已取消")]
    Cancelled,
}

/// 外部工具执行器。
pub trait ToolRunner: Send + Sync {
    /// 执行 `program args...` 并等待退出。
    ///
    /// 取消：
    /// - 等待期间 `cancel` 被置位时应终止子进程并返回 [`ToolError::Cancelled`]
    fn run(&self, program: &str, args: &[String], cancel: &CancelFlag) -> Result<ToolOutput, ToolError>;
}

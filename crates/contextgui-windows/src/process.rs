//! 外部工具执行（`reg export` / `reg import` 等）。
//!
//! 实现策略：
//! - 标准库 `Command` 启动子进程，stdout/stderr 由独立线程读取，避免管道写满导致死锁
//! - 每 50ms 轮询一次退出状态与取消信号；收到取消时直接终止子进程
//! - Windows 下以 `CREATE_NO_WINDOW` 启动，不弹出控制台窗口
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contextgui_core::cancel::CancelFlag;
use contextgui_core::tool::{ToolError, ToolOutput, ToolRunner};
use tracing::{debug, warn};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// 基于子进程的外部工具执行器。
#[derive(Debug, Clone)]
pub struct ProcessToolRunner {
    poll_interval: Duration,
}

impl Default for ProcessToolRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl ProcessToolRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ToolRunner for ProcessToolRunner {
    /// 启动 `program args...` 并等待退出。
    ///
    /// 异常处理：
    /// - 启动失败/等待失败：`ToolError::Spawn`
    /// - 等待期间取消：终止子进程并返回 `ToolError::Cancelled`
    /// - 退出码非 0 不视为错误，由调用方根据 [`ToolOutput`] 判断
    fn run(&self, program: &str, args: &[String], cancel: &CancelFlag) -> Result<ToolOutput, ToolError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        debug!("执行外部工具: {} {:?}", program, args);
        let mut child = cmd
            .spawn()
            .map_err(|e| ToolError::Spawn(format!("{program}: {e}")))?;
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                warn!("外部工具已取消并终止: {}", program);
                return Err(ToolError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => {
                    let _ = child.kill();
                    return Err(ToolError::Spawn(format!("等待 {program} 退出失败: {e}")));
                }
            }
        };

        Ok(ToolOutput {
            exit_code: status.code(),
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut p| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = p.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

//! Windows 平台能力封装（注册表、提权检测、外部进程、Shell 刷新）。
//!
//! 目标：
//! - 为 `contextgui-core` 中的抽象提供真实实现，避免核心逻辑直接依赖 Win32 细节
//! - 统一错误处理风格（平台细节以 `anyhow::Result` 形式向上返回）
//!
//! 说明：
//! - 外部进程执行器基于标准库，所有平台可用；其余模块仅在 Windows 下编译
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

#[cfg(windows)]
pub mod elevation;
pub mod process;
#[cfg(windows)]
pub mod registry;
#[cfg(windows)]
pub mod shell;

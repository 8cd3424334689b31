//! 协作式取消信号。
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::RegistryError;

/// 可跨线程共享的取消标志（克隆后共享同一状态）。
///
/// 用法：
/// - 界面/控制台线程调用 [`CancelFlag::cancel`]
/// - 后台工作线程在子键之间、等待外部进程期间调用 [`CancelFlag::check`]
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消。
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 已请求取消时返回 [`RegistryError::Cancelled`]。
    pub fn check(&self) -> Result<(), RegistryError> {
        if self.is_cancelled() {
            Err(RegistryError::Cancelled)
        } else {
            Ok(())
        }
    }
}

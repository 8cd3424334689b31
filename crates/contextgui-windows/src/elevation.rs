//! 提权/权限相关检测。
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use anyhow::Result;
use contextgui_core::privilege::PrivilegeCheck;
use tracing::warn;
use windows::Win32::UI::Shell::IsUserAnAdmin;

/// 判断当前进程是否以管理员权限运行。
///
/// 返回值：
/// - `Ok(true)`：当前为管理员
/// - `Ok(false)`：当前非管理员
///
/// 异常处理：
/// - 该 Win32 API 本身不返回错误码；此处保留 `Result` 以统一上层调用风格。
pub fn is_running_as_admin() -> Result<bool> {
    unsafe { Ok(IsUserAnAdmin().as_bool()) }
}

/// 基于 `IsUserAnAdmin` 的权限检测。
///
/// 安全注意：
/// - 该检查仅用于“是否应继续执行需要管理员权限的注册表修改”，不能作为完整的安全边界。
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminPrivilege;

impl PrivilegeCheck for AdminPrivilege {
    fn is_elevated(&self) -> bool {
        match is_running_as_admin() {
            Ok(v) => v,
            Err(e) => {
                warn!("管理员权限检测失败，按非管理员处理: {}", e);
                false
            }
        }
    }
}

//! 权限检测抽象。
//!
//! 说明：
//! - 只回答一个问题：当前进程是否以管理员（提权）身份运行
//! - Windows 实现见 `contextgui_windows::elevation::AdminPrivilege`
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

/// 权限检测。
pub trait PrivilegeCheck: Send + Sync {
    /// 当前进程是否具有管理员权限。
    fn is_elevated(&self) -> bool;
}

/// 固定结果的权限检测（测试与非 Windows 环境使用）。
#[derive(Debug, Clone, Copy)]
pub struct StaticPrivilege(pub bool);

impl StaticPrivilege {
    pub fn elevated() -> Self {
        Self(true)
    }

    pub fn denied() -> Self {
        Self(false)
    }
}

impl PrivilegeCheck for StaticPrivilege {
    fn is_elevated(&self) -> bool {
        self.0
    }
}

//! 通知资源管理器刷新文件关联（使右键菜单修改立即生效）。
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use windows::Win32::UI::Shell::{SHChangeNotify, SHCNE_ASSOCCHANGED, SHCNF_FLUSH};

/// 广播 `SHCNE_ASSOCCHANGED`。
///
/// 说明：
/// - 该 API 无返回值，也不会失败；刷新是否生效取决于资源管理器自身
pub fn notify_association_changed() {
    unsafe {
        SHChangeNotify(SHCNE_ASSOCCHANGED, SHCNF_FLUSH, None, None);
    }
}

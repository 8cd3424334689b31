//! 统一路径与目录约定（面向 Windows %APPDATA%）。
//!
//! 目标：
//! - 将落盘路径集中管理（备份目录、配置文件），避免散落在各模块中
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::path::{Path, PathBuf};

use crate::error::RegistryError;

/// %APPDATA% 下的产品目录名。
///
/// 示例（默认）：
/// - `%APPDATA%\ContextGUI`
pub const APP_DIR: &str = "ContextGUI";

/// 备份子目录名。
pub const BACKUP_DIR: &str = "Backups";

/// 覆盖备份目录的环境变量（便于排障与测试）。
pub const BACKUP_DIR_ENV: &str = "CONTEXTGUI_BACKUP_DIR";

/// 获取本项目在 %APPDATA% 下的根目录。
///
/// 返回值：
/// - 成功：`%APPDATA%\ContextGUI`
///
/// 异常处理：
/// - 环境变量 `APPDATA` 不存在或为空时返回 `NotFound`。
pub fn app_data_dir() -> Result<PathBuf, RegistryError> {
    match std::env::var_os("APPDATA") {
        Some(v) if !v.is_empty() => Ok(PathBuf::from(v).join(APP_DIR)),
        _ => Err(RegistryError::NotFound("读取 APPDATA 环境变量失败".to_string())),
    }
}

/// 默认备份目录。
///
/// 优先级：
/// 1) 环境变量 `CONTEXTGUI_BACKUP_DIR`
/// 2) `%APPDATA%\ContextGUI\Backups`
pub fn default_backup_dir() -> Result<PathBuf, RegistryError> {
    if let Some(v) = std::env::var_os(BACKUP_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(v));
    }
    Ok(app_data_dir()?.join(BACKUP_DIR))
}

/// 默认配置文件路径：`%APPDATA%\ContextGUI\config.json`。
pub fn default_config_file() -> Result<PathBuf, RegistryError> {
    Ok(app_data_dir()?.join("config.json"))
}

/// 确保目录存在（不存在则递归创建）。
///
/// 异常处理：
/// - 创建失败（权限、路径非法等）返回 `Io`。
pub fn ensure_dir(path: &Path) -> Result<(), RegistryError> {
    std::fs::create_dir_all(path)
        .map_err(|e| RegistryError::Io(format!("创建目录失败: {}: {e}", path.display())))
}

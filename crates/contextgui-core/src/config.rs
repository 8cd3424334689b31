//! 应用配置文件（config.json）。
//!
//! 约定：
//! - 所有字段通过 `#[serde(default)]` 提供默认值，缺失字段/缺失文件均回退默认配置
//! - 仅描述核心组件需要的配置，不包含界面层设置
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::paths;

/// 默认的注册表导出/导入工具。
pub const DEFAULT_REG_TOOL: &str = "reg";

/// 应用配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    /// 备份目录（为空则使用 [`paths::default_backup_dir`]）。
    pub backup_dir: Option<String>,
    #[serde(default = "default_reg_tool")]
    /// 导出/导入所用的可执行文件名或路径。
    pub reg_tool: String,
    #[serde(default)]
    /// 日志过滤指令（`tracing_subscriber::EnvFilter` 语法，可选）。
    pub log_filter: Option<String>,
}

fn default_reg_tool() -> String {
    DEFAULT_REG_TOOL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            reg_tool: default_reg_tool(),
            log_filter: None,
        }
    }
}

impl AppConfig {
    /// 读取配置文件。
    ///
    /// 参数：
    /// - `path`：配置文件路径
    ///
    /// 返回值：
    /// - 文件不存在：默认配置
    /// - 文件存在：解析后的配置
    ///
    /// 异常处理：
    /// - 读取失败返回 `Io`，JSON 解析失败返回 `InvalidArgument`。
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path)
            .map_err(|e| RegistryError::Io(format!("读取配置失败: {}: {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RegistryError::InvalidArgument(format!("解析配置 JSON 失败: {}: {e}", path.display())))
    }

    /// 解析最终使用的备份目录。
    pub fn backup_dir(&self) -> Result<PathBuf, RegistryError> {
        match self.backup_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            _ => paths::default_backup_dir(),
        }
    }
}

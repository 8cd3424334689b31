//! 统一错误分类。
//!
//! 分类约定：
//! - `Unauthorized`：权限检测未通过或系统拒绝访问
//! - `InvalidArgument`：路径格式不正确或必填字段为空
//! - `NotFound`：注册表键、父键或备份文件不存在
//! - `Unsupported`：该类条目不允许此操作（旧式/新式处理器、系统条目）
//! - `BackupFailed`：导出/导入工具退出码非 0，或备份文件校验失败
//! - `Io` / `Unexpected`：注册表访问过程中的 IO 错误与其它错误
//! - `Cancelled`：调用方请求取消
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::RegistryAccessError;

/// 失败类别（随 [`crate::model::RegistryResult`] 一并返回给界面层）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unauthorized,
    InvalidArgument,
    NotFound,
    Unsupported,
    BackupFailed,
    IoError,
    Unexpected,
    Cancelled,
}

/// 核心组件对外返回的错误。
///
/// 说明：
/// - 各变体携带的文本可直接展示给用户，不应包含敏感信息。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("{0}")]
    BackupFailed(String),
    #[error("注册表 IO 错误: {0}")]
    Io(String),
    #[error("{0}")]
    Unexpected(String),
    #[error("操作已取消")]
    Cancelled,
}

impl RegistryError {
    /// 返回该错误对应的失败类别。
    pub fn kind(&self) -> FailureKind {
        match self {
            RegistryError::Unauthorized(_) => FailureKind::Unauthorized,
            RegistryError::InvalidArgument(_) => FailureKind::InvalidArgument,
            RegistryError::NotFound(_) => FailureKind::NotFound,
            RegistryError::Unsupported(_) => FailureKind::Unsupported,
            RegistryError::BackupFailed(_) => FailureKind::BackupFailed,
            RegistryError::Io(_) => FailureKind::IoError,
            RegistryError::Unexpected(_) => FailureKind::Unexpected,
            RegistryError::Cancelled => FailureKind::Cancelled,
        }
    }

    /// 将注册表访问错误映射为对外错误。
    ///
    /// 参数：
    /// - `err`：访问层错误
    /// - `key_path`：出错的完整键路径（写入 NotFound 文本）
    ///
    /// 映射规则：
    /// - 拒绝访问 → `Unauthorized` 风格（保留系统原文）
    /// - IO → `Io`
    /// - 其它 → `Unexpected`
    pub fn from_access(err: RegistryAccessError, key_path: &str) -> Self {
        match err {
            RegistryAccessError::NotFound => RegistryError::NotFound(format!("注册表键不存在: {key_path}")),
            RegistryAccessError::AccessDenied(msg) => RegistryError::Unauthorized(format!("拒绝访问: {msg}")),
            RegistryAccessError::Io(msg) => RegistryError::Io(msg),
            RegistryAccessError::Other(msg) => RegistryError::Unexpected(msg),
        }
    }

    /// 权限检测未通过时使用的统一错误。
    pub fn admin_required() -> Self {
        RegistryError::Unauthorized("需要管理员权限".to_string())
    }
}

//! 调用方侧的变更许可检查。
//!
//! 说明：
//! - [`crate::mutator::RegistryMutator`] 不检查系统条目；删除/编辑系统条目的拦截由调用方在此完成
//! - 检查只依据路径本身（末级子键名、是否位于旧式处理器路径），不访问注册表
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::model::ContextMenuItem;
use crate::scanner::{is_legacy_handler_path, is_system_name};

/// 变更操作类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOp {
    Disable,
    Enable,
    Delete,
    Update,
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationOp::Disable => "禁用",
            MutationOp::Enable => "启用",
            MutationOp::Delete => "删除",
            MutationOp::Update => "编辑",
        };
        f.write_str(s)
    }
}

/// 按完整键路径检查操作是否被允许。
///
/// 规则：
/// - 系统条目（末级子键名为 `Windows.*`/`OpenWith`/`Sharing`）禁止删除与编辑
/// - 旧式处理器路径禁止编辑
/// - 启用/禁用对所有条目开放
pub fn check_mutation(op: MutationOp, registry_path: &str) -> Result<(), RegistryError> {
    let name = registry_path
        .trim_end_matches('\\')
        .rsplit('\\')
        .next()
        .unwrap_or_default();
    match op {
        MutationOp::Disable | MutationOp::Enable => Ok(()),
        MutationOp::Delete if is_system_name(name) => Err(system_item_error(op)),
        MutationOp::Delete => Ok(()),
        MutationOp::Update if is_system_name(name) => Err(system_item_error(op)),
        MutationOp::Update if is_legacy_handler_path(registry_path) => Err(RegistryError::Unsupported(
            "旧式处理器不支持编辑".to_string(),
        )),
        MutationOp::Update => Ok(()),
    }
}

/// 按扫描得到的条目检查操作是否被允许（额外识别新式处理器）。
pub fn check_item(op: MutationOp, item: &ContextMenuItem) -> Result<(), RegistryError> {
    let allowed = match op {
        MutationOp::Disable | MutationOp::Enable => item.can_toggle(),
        MutationOp::Delete => item.can_delete(),
        MutationOp::Update => item.can_edit(),
    };
    if allowed {
        return Ok(());
    }
    if item.is_system_item {
        Err(system_item_error(op))
    } else if item.is_legacy_handler {
        Err(RegistryError::Unsupported("旧式处理器不支持编辑".to_string()))
    } else {
        Err(RegistryError::Unsupported("新式处理器不支持编辑".to_string()))
    }
}

fn system_item_error(op: MutationOp) -> RegistryError {
    RegistryError::Unsupported(format!("系统条目不支持{op}"))
}

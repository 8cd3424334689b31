//! 基于 winreg 的注册表访问实现。
//!
//! 主要用途：
//! - 为扫描器/变更器提供真实的 HKEY_CLASSES_ROOT 读写
//! - 测试时可将根定位到 HKCU 下的临时子树（[`WinRegistry::rooted_at`]），避免触碰系统键
//!
//! 权限要求：
//! - 读取 HKEY_CLASSES_ROOT 通常不需要管理员；写入多数条目需要管理员
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::io;

use contextgui_core::registry::{RegValue, RegistryAccess, RegistryAccessError, RegistryKey};
use winreg::enums::{RegType, HKEY_CLASSES_ROOT, KEY_READ, KEY_WRITE};
use winreg::types::FromRegValue;
use winreg::{RegKey, HKEY};

/// winreg 注册表访问入口。
pub struct WinRegistry {
    root: RegKey,
    prefix: String,
}

impl WinRegistry {
    /// 以 HKEY_CLASSES_ROOT 为根（生产使用）。
    pub fn classes_root() -> Self {
        Self {
            root: RegKey::predef(HKEY_CLASSES_ROOT),
            prefix: String::new(),
        }
    }

    /// 以任意根键下的子路径为根（测试使用，如 `HKCU\Software\ContextGUITest\<uuid>`）。
    pub fn rooted_at(hive: HKEY, prefix: &str) -> Self {
        Self {
            root: RegKey::predef(hive),
            prefix: prefix.trim_matches('\\').to_string(),
        }
    }

    fn full_path(&self, path: &str) -> String {
        join_path(&self.prefix, path)
    }
}

impl RegistryAccess for WinRegistry {
    fn open_classes_root(&self, path: &str, writable: bool) -> Result<Box<dyn RegistryKey>, RegistryAccessError> {
        let key = self
            .root
            .open_subkey_with_flags(self.full_path(path), access_flags(writable))
            .map_err(map_io)?;
        Ok(Box::new(WinKey {
            key,
            path: path.trim_matches('\\').to_string(),
        }))
    }
}

/// winreg 键句柄。
struct WinKey {
    key: RegKey,
    path: String,
}

impl RegistryKey for WinKey {
    fn path(&self) -> &str {
        &self.path
    }

    fn subkey_names(&self) -> Result<Vec<String>, RegistryAccessError> {
        self.key
            .enum_keys()
            .collect::<io::Result<Vec<String>>>()
            .map_err(map_io)
    }

    fn open_subkey(&self, name: &str, writable: bool) -> Result<Box<dyn RegistryKey>, RegistryAccessError> {
        let key = self
            .key
            .open_subkey_with_flags(name, access_flags(writable))
            .map_err(map_io)?;
        Ok(Box::new(WinKey {
            key,
            path: join_path(&self.path, name),
        }))
    }

    fn get_value(&self, name: &str) -> Result<Option<RegValue>, RegistryAccessError> {
        match self.key.get_raw_value(name) {
            Ok(raw) => from_raw(raw).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io(e)),
        }
    }

    fn set_value(&self, name: &str, value: &RegValue) -> Result<(), RegistryAccessError> {
        let result = match value {
            RegValue::String(s) => self.key.set_value(name, s),
            RegValue::Dword(v) => self.key.set_value(name, v),
            RegValue::ExpandString(s) => self.key.set_raw_value(
                name,
                &winreg::RegValue {
                    bytes: utf16_bytes(s),
                    vtype: RegType::REG_EXPAND_SZ,
                },
            ),
            RegValue::Binary(b) => self.key.set_raw_value(
                name,
                &winreg::RegValue {
                    bytes: b.clone(),
                    vtype: RegType::REG_BINARY,
                },
            ),
        };
        result.map_err(map_io)
    }

    fn delete_value(&self, name: &str) -> Result<(), RegistryAccessError> {
        self.key.delete_value(name).map_err(map_io)
    }

    fn delete_subkey_tree(&self, name: &str) -> Result<(), RegistryAccessError> {
        // 空名称会删除当前键下的全部内容，必须拦截。
        if name.trim_matches('\\').is_empty() {
            return Err(RegistryAccessError::Other("子键名为空".to_string()));
        }
        self.key.delete_subkey_all(name).map_err(map_io)
    }

    fn create_subkey(&self, name: &str) -> Result<Box<dyn RegistryKey>, RegistryAccessError> {
        let (key, _disp) = self
            .key
            .create_subkey_with_flags(name, KEY_READ | KEY_WRITE)
            .map_err(map_io)?;
        Ok(Box::new(WinKey {
            key,
            path: join_path(&self.path, name),
        }))
    }
}

fn access_flags(writable: bool) -> u32 {
    if writable {
        KEY_READ | KEY_WRITE
    } else {
        KEY_READ
    }
}

fn join_path(parent: &str, child: &str) -> String {
    let child = child.trim_matches('\\');
    if parent.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        format!("{parent}\\{child}")
    }
}

/// 将 winreg 原始值转换为带类型的值；未单独建模的类型按二进制返回。
fn from_raw(raw: winreg::RegValue) -> Result<RegValue, RegistryAccessError> {
    match raw.vtype {
        RegType::REG_SZ => String::from_reg_value(&raw).map(RegValue::String).map_err(map_io),
        RegType::REG_EXPAND_SZ => String::from_reg_value(&raw)
            .map(RegValue::ExpandString)
            .map_err(map_io),
        RegType::REG_DWORD => u32::from_reg_value(&raw).map(RegValue::Dword).map_err(map_io),
        _ => Ok(RegValue::Binary(raw.bytes)),
    }
}

/// UTF-16 LE 编码并追加结尾 NUL（REG_EXPAND_SZ 的存储格式）。
fn utf16_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// 将 IO 错误映射为访问层错误（保留系统原文）。
fn map_io(e: io::Error) -> RegistryAccessError {
    match e.kind() {
        io::ErrorKind::NotFound => RegistryAccessError::NotFound,
        io::ErrorKind::PermissionDenied => RegistryAccessError::AccessDenied(e.to_string()),
        _ => RegistryAccessError::Io(e.to_string()),
    }
}

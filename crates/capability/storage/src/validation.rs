//! 验证辅助函数
//!
//! 写入前的最小字段校验，内存与 Postgres 实现共用：
//! - ensure_non_empty：必填字符串非空
//! - ensure_finite：数值必须是有限值

use crate::error::StorageError;

/// 验证必填字段非空
pub fn ensure_non_empty(field: &str, value: &str) -> Result<(), StorageError> {
    if value.trim().is_empty() {
        return Err(StorageError::new(format!("{field} required")));
    }
    Ok(())
}

/// 验证数值为有限值（拒绝 NaN / ±inf）
pub fn ensure_finite(field: &str, value: f64) -> Result<(), StorageError> {
    if !value.is_finite() {
        return Err(StorageError::new(format!("{field} must be finite")));
    }
    Ok(())
}

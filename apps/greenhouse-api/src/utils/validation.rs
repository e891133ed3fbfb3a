//! 输入验证辅助函数
//!
//! - normalize_required / normalize_optional：去除首尾空格并检查非空
//! - parse_field / parse_optional：把字符串字段解析为领域枚举，失败返回 400
//!
//! 失败统一返回 bad_request_error 响应。

use crate::utils::response::bad_request_error;
use axum::response::Response;
use std::fmt::Display;
use std::str::FromStr;

/// 验证必填字段，去除空格并检查非空
pub fn normalize_required(value: String, field: &str) -> Result<String, Response> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request_error(format!("{field} required")));
    }
    Ok(trimmed.to_string())
}

/// 验证可选字段，如果提供则去除空格并检查非空
pub fn normalize_optional(value: Option<String>, field: &str) -> Result<Option<String>, Response> {
    match value {
        Some(value) => normalize_required(value, field).map(Some),
        None => Ok(None),
    }
}

/// 解析必填的枚举字段
pub fn parse_field<T>(value: &str, field: &str) -> Result<T, Response>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse::<T>()
        .map_err(|err| bad_request_error(format!("invalid {field}: {err}")))
}

/// 解析可选的枚举字段
pub fn parse_optional<T>(value: Option<&str>, field: &str) -> Result<Option<T>, Response>
where
    T: FromStr,
    T::Err: Display,
{
    value.map(|value| parse_field(value, field)).transpose()
}

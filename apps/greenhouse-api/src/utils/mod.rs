//! Handler 公共工具：统一错误响应、DTO 转换、边界解析。

pub mod response;
pub mod validation;

pub use validation::*;

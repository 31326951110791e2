use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::domain::types::OperatorRole;

// ==========================================
// 公共工具：响应信封、错误映射、参数解析
// ==========================================

/// 错误体（返回给调用方）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,
}

/// 统一响应信封
///
/// 所有 handler 的返回值都包成 `{success, data, error, message}`；
/// HTTP 风格状态码单独携带,由承载层决定如何使用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// HTTP 风格状态码（不序列化进信封）
    #[serde(skip, default = "default_status")]
    pub status: u16,
}

fn default_status() -> u16 {
    200
}

impl ApiResponse {
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

/// 成功响应
pub fn ok<T: Serialize>(data: T) -> ApiResponse {
    match serde_json::to_value(data) {
        Ok(value) => ApiResponse {
            success: true,
            data: Some(value),
            error: None,
            message: None,
            status: 200,
        },
        Err(e) => fail(ApiError::InternalError(format!("序列化失败: {}", e))),
    }
}

/// 失败响应（500 级别的错误额外打日志）
pub fn fail(err: ApiError) -> ApiResponse {
    let status = err.http_status();
    if status >= 500 {
        tracing::error!(code = err.code(), error = %err, "请求处理失败");
    }
    ApiResponse {
        success: false,
        data: None,
        error: Some(ErrorBody {
            code: err.code().to_string(),
            message: err.to_string(),
        }),
        message: Some(err.to_string()),
        status,
    }
}

/// 将 ApiResult 折叠为信封
pub fn respond<T: Serialize>(result: Result<T, ApiError>) -> ApiResponse {
    match result {
        Ok(data) => ok(data),
        Err(err) => fail(err),
    }
}

/// 解析操作员角色
pub(super) fn parse_role(role: &str) -> Result<OperatorRole, ApiError> {
    OperatorRole::from_str(role)
        .ok_or_else(|| ApiError::InvalidInput(format!("未知角色: {}", role)))
}

/// 解析日期字符串（YYYY-MM-DD）
pub(super) fn parse_date(date_str: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| ApiError::InvalidInput(format!("日期格式错误（应为YYYY-MM-DD）: {}", e)))
}

/// 解析十进制数值
pub(super) fn parse_decimal(field: &str, value: &str) -> Result<Decimal, ApiError> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| ApiError::InvalidInput(format!("{} 数值格式错误: {}", field, e)))
}

//! 错误类型

use thiserror::Error;

/// 核心库错误
#[derive(Error, Debug)]
pub enum Error {
    /// JSON 无法解析或序列化
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// 没有 VCALENDAR 块
    #[error("Calendar has no VCALENDAR block")]
    MissingCalendar,

    /// 日历中没有 VEVENT
    #[error("Calendar has no events")]
    NoEvents,

    /// 缺少必需的属性
    #[error("Calendar has no {0}")]
    MissingProperty(&'static str),
}

/// 核心库的 Result 别名
pub type Result<T> = std::result::Result<T, Error>;

//! 领域层统一错误定义
//!
//! 乐观锁冲突（`VersionConflict`）与前置条件错误（`PreconditionViolation`）
//! 必须与一般的存储错误区分开，调用方据此决定是否“重新加载后重试”。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 乐观锁 ---
    #[error("version conflict: table={table}, key={key}, expected={expected}")]
    VersionConflict {
        table: &'static str,
        key: String,
        expected: u32,
    },
    #[error("precondition violation: {reason}")]
    PreconditionViolation { reason: String },

    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("parse error: {reason}")]
    Parse { reason: String },

    // --- 仓储/持久化 ---
    #[error("database error: {reason}")]
    Database { reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },
    #[error("duplicate record: table={table}, key={key}")]
    Duplicate { table: String, key: String },

    // --- 状态与取值 ---
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}

impl DomainError {
    /// 是否为乐观锁版本冲突（记录已被其他写入者修改）
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, DomainError::VersionConflict { .. })
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// 允许在基础设施层直接使用 `?` 将 sqlx 错误转换为 DomainError
#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound {
                reason: "row not found".to_string(),
            },
            other => DomainError::Database {
                reason: other.to_string(),
            },
        }
    }
}

impl From<std::num::ParseIntError> for DomainError {
    fn from(err: std::num::ParseIntError) -> Self {
        DomainError::Parse {
            reason: err.to_string(),
        }
    }
}

//! 迁移辅助：乐观锁版本列的添加与删除
//!
//! 版本列为可空的非负整数。Postgres 没有无符号整数，
//! 使用 `BIGINT` 加 `CHECK (col >= 0)` 约束表达。
//!
use crate::entity::DEFAULT_LOCK_COLUMN;
use crate::error::{DomainError, DomainResult};

/// 校验 SQL 标识符：`[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_identifier(ident: &str) -> DomainResult<()> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if !valid {
        return Err(DomainError::InvalidValue {
            reason: format!("invalid identifier: {ident:?}"),
        });
    }
    Ok(())
}

/// 双引号包裹标识符，内部的双引号转义
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `ALTER TABLE ... ADD COLUMN`：可空的无符号版本列
pub fn add_lock_version_column(table: &str, column: &str) -> DomainResult<String> {
    validate_identifier(table)?;
    validate_identifier(column)?;
    let column = quote_ident(column);
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {column} BIGINT NULL CHECK ({column} >= 0)",
        quote_ident(table)
    ))
}

/// `ALTER TABLE ... DROP COLUMN`
pub fn drop_lock_version_column(table: &str, column: &str) -> DomainResult<String> {
    validate_identifier(table)?;
    validate_identifier(column)?;
    Ok(format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote_ident(table),
        quote_ident(column)
    ))
}

/// 使用默认列名 `lock_version`
pub fn add_default_lock_version_column(table: &str) -> DomainResult<String> {
    add_lock_version_column(table, DEFAULT_LOCK_COLUMN)
}

pub fn drop_default_lock_version_column(table: &str) -> DomainResult<String> {
    drop_lock_version_column(table, DEFAULT_LOCK_COLUMN)
}

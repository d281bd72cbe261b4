//! 行存储协议（RecordStore）
//!
//! 乐观锁只依赖存储提供的一个原语：条件写，并如实返回受影响行数。
//!
use crate::entity::Attributes;
use crate::error::DomainResult as Result;
use crate::persist::ConditionedWrite;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 插入整行；主键已存在时返回 `DomainError::Duplicate`
    async fn insert(&self, table: &str, key_column: &str, row: Attributes) -> Result<()>;

    /// 按主键读取整行
    async fn find(&self, table: &str, key_column: &str, key: &Value)
    -> Result<Option<Attributes>>;

    /// 执行条件写，返回实际被修改的行数
    async fn conditioned_write(&self, write: &ConditionedWrite) -> Result<u64>;
}

#[async_trait]
impl<T> RecordStore for Arc<T>
where
    T: RecordStore + ?Sized,
{
    async fn insert(&self, table: &str, key_column: &str, row: Attributes) -> Result<()> {
        (**self).insert(table, key_column, row).await
    }

    async fn find(
        &self,
        table: &str,
        key_column: &str,
        key: &Value,
    ) -> Result<Option<Attributes>> {
        (**self).find(table, key_column, key).await
    }

    async fn conditioned_write(&self, write: &ConditionedWrite) -> Result<u64> {
        (**self).conditioned_write(write).await
    }
}

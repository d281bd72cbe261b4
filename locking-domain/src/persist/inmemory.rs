//! 内存行存储
//!
//! 以 (表, 主键) 为键保存整行。条件写在持有该行分片锁期间完成谓词判断与修改，
//! 因此同一行上的并发条件写彼此串行，最多一个能匹配同一个旧版本。
//!
use crate::entity::Attributes;
use crate::error::{DomainError, DomainResult as Result};
use crate::persist::{ConditionedWrite, RecordStore};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

type RowKey = (String, String);

#[derive(Debug, Default)]
pub struct InMemoryStore {
    rows: DashMap<RowKey, Attributes>,
    writes: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已执行的条件写次数（不论是否命中）
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn row_key(table: &str, key: &Value) -> RowKey {
        (table.to_string(), key.to_string())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn insert(&self, table: &str, key_column: &str, row: Attributes) -> Result<()> {
        let key = row
            .get(key_column)
            .ok_or_else(|| DomainError::InvalidValue {
                reason: format!("row for table {table} has no {key_column} column"),
            })?;

        match self.rows.entry(Self::row_key(table, key)) {
            Entry::Occupied(_) => Err(DomainError::Duplicate {
                table: table.to_string(),
                key: key.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(row);
                Ok(())
            }
        }
    }

    async fn find(
        &self,
        table: &str,
        _key_column: &str,
        key: &Value,
    ) -> Result<Option<Attributes>> {
        Ok(self
            .rows
            .get(&Self::row_key(table, key))
            .map(|row| row.value().clone()))
    }

    async fn conditioned_write(&self, write: &ConditionedWrite) -> Result<u64> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let Some(mut row) = self
            .rows
            .get_mut(&Self::row_key(write.table(), write.key().value()))
        else {
            return Ok(0);
        };

        if !write.matches(&row) {
            return Ok(0);
        }

        for (column, value) in write.values() {
            row.insert(column.clone(), value.clone());
        }

        Ok(1)
    }
}

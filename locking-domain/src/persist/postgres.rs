//! Postgres 行存储（需启用 `infra-sqlx` 特性）
//!
//! 条件写渲染为单条 `UPDATE ... WHERE key = .. AND lock_version = ..`，
//! 原子性由数据库的行级写串行化保证，受影响行数取自 `rows_affected()`。
//!
//! 所有取值都以一个 `jsonb` 参数传入，再经 `jsonb_populate_record(NULL::表, $n)`
//! 按表的行类型展开，由数据库按列类型完成转换；`timestamptz`、`uuid` 等列无需额外处理。
//!
use crate::entity::Attributes;
use crate::error::{DomainError, DomainResult as Result};
use crate::persist::{ConditionedWrite, RecordStore};
use crate::schema::{add_lock_version_column, drop_lock_version_column, quote_ident};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;
use sqlx::postgres::PgPool;
use sqlx::types::Json;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 迁移：为表添加乐观锁版本列
    pub async fn add_lock_version_column(&self, table: &str, column: &str) -> Result<()> {
        let ddl = add_lock_version_column(table, column)?;
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    /// 迁移：删除乐观锁版本列
    pub async fn drop_lock_version_column(&self, table: &str, column: &str) -> Result<()> {
        let ddl = drop_lock_version_column(table, column)?;
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

fn as_object(attributes: &Attributes) -> Value {
    Value::Object(
        attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, table: &str, key_column: &str, row: Attributes) -> Result<()> {
        let columns = row
            .keys()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let table_ident = quote_ident(table);

        // 只插入给出的列，其余列保留数据库默认值
        let sql = format!(
            "INSERT INTO {table_ident} ({columns}) \
             SELECT {columns} FROM jsonb_populate_record(NULL::{table_ident}, $1)"
        );
        tracing::trace!(%sql, "insert");

        let payload = as_object(&row);
        let query = sqlx::query(&sql).bind(Json(&payload));

        match query.execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(DomainError::Duplicate {
                    table: table.to_string(),
                    key: row
                        .get(key_column)
                        .map(|k| k.to_string())
                        .unwrap_or_default(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find(
        &self,
        table: &str,
        key_column: &str,
        key: &Value,
    ) -> Result<Option<Attributes>> {
        let table_ident = quote_ident(table);
        let key_ident = quote_ident(key_column);
        let sql = format!(
            "SELECT to_jsonb(t) AS row FROM {table_ident} AS t, \
             jsonb_populate_record(NULL::{table_ident}, $1) AS k \
             WHERE t.{key_ident} = k.{key_ident}"
        );
        tracing::trace!(%sql, "find");

        let mut condition = serde_json::Map::new();
        condition.insert(key_column.to_string(), key.clone());

        let Some(row) = sqlx::query(&sql)
            .bind(Json(Value::Object(condition)))
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        match row.try_get::<Value, _>("row")? {
            Value::Object(map) => Ok(Some(map.into_iter().collect())),
            other => Err(DomainError::InvalidValue {
                reason: format!("expected row object from {table}, got {other}"),
            }),
        }
    }

    async fn conditioned_write(&self, write: &ConditionedWrite) -> Result<u64> {
        let (sql, [values, conditions]) = write.to_sql();
        tracing::trace!(%sql, "conditioned write");

        let query = sqlx::query(&sql)
            .bind(Json(&values))
            .bind(Json(&conditions));

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

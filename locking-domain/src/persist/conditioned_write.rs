//! 条件写（ConditionedWrite）
//!
//! 一条原子更新语句的描述：`SET values WHERE key = ? [AND version = ?]`。
//! 谓词与写入必须在同一条语句中由存储执行，比较与修改之间不允许其他写入插入。
//!
use crate::entity::Attributes;
use crate::schema::quote_ident;
use bon::Builder;
use serde_json::Value;

/// 列等值谓词
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    column: String,
    value: Value,
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn matches(&self, row: &Attributes) -> bool {
        row.get(&self.column) == Some(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Builder)]
pub struct ConditionedWrite {
    #[builder(into)]
    table: String,
    /// 主键谓词
    key: Predicate,
    /// 版本谓词；关闭乐观锁时为 `None`
    version: Option<Predicate>,
    /// 要写入的列（包含新版本号）
    values: Attributes,
}

impl ConditionedWrite {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key(&self) -> &Predicate {
        &self.key
    }

    pub fn version(&self) -> Option<&Predicate> {
        self.version.as_ref()
    }

    pub fn values(&self) -> &Attributes {
        &self.values
    }

    pub fn is_locked(&self) -> bool {
        self.version.is_some()
    }

    /// 行是否满足全部谓词（AND 组合）
    pub fn matches(&self, row: &Attributes) -> bool {
        self.key.matches(row) && self.version.as_ref().is_none_or(|p| p.matches(row))
    }

    /// 渲染为 Postgres 的 UPDATE 语句，返回语句与两个 `jsonb` 参数：
    /// `$1` 为要写入的列，`$2` 为谓词列。
    ///
    /// 两个参数都经 `jsonb_populate_record(NULL::表, ..)` 展开为表的行类型，
    /// 因此每个值都按目标列的类型转换（`timestamptz`、`uuid` 等），`null` 即 `NULL`。
    pub fn to_sql(&self) -> (String, [Value; 2]) {
        let table = quote_ident(&self.table);

        let assignments = self
            .values
            .keys()
            .map(|column| {
                let column = quote_ident(column);
                format!("{column} = v.{column}")
            })
            .collect::<Vec<_>>()
            .join(", ");

        let predicates = self
            .predicates()
            .map(|p| {
                let column = quote_ident(&p.column);
                format!("t.{column} = c.{column}")
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        let sql = format!(
            "UPDATE {table} AS t SET {assignments} \
             FROM jsonb_populate_record(NULL::{table}, $1) AS v, \
             jsonb_populate_record(NULL::{table}, $2) AS c \
             WHERE {predicates}"
        );

        let values = Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        let conditions = Value::Object(
            self.predicates()
                .map(|p| (p.column.clone(), p.value.clone()))
                .collect(),
        );

        (sql, [values, conditions])
    }

    fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        std::iter::once(&self.key).chain(self.version.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values() -> Attributes {
        let mut values = Attributes::new();
        values.insert("name".into(), json!("b"));
        values.insert("lock_version".into(), json!(2));
        values
    }

    #[test]
    fn renders_locked_update() {
        let write = ConditionedWrite::builder()
            .table("users")
            .key(Predicate::eq("id", 1))
            .version(Predicate::eq("lock_version", 1))
            .values(values())
            .build();

        let (sql, [values, conditions]) = write.to_sql();
        assert_eq!(
            sql,
            r#"UPDATE "users" AS t SET "lock_version" = v."lock_version", "name" = v."name" FROM jsonb_populate_record(NULL::"users", $1) AS v, jsonb_populate_record(NULL::"users", $2) AS c WHERE t."id" = c."id" AND t."lock_version" = c."lock_version""#
        );
        assert_eq!(values, json!({"lock_version": 2, "name": "b"}));
        assert_eq!(conditions, json!({"id": 1, "lock_version": 1}));
        assert!(write.is_locked());
    }

    #[test]
    fn renders_unlocked_update_without_version_predicate() {
        let write = ConditionedWrite::builder()
            .table("users")
            .key(Predicate::eq("id", 1))
            .values(values())
            .build();

        let (sql, [_, conditions]) = write.to_sql();
        assert!(sql.ends_with(r#"WHERE t."id" = c."id""#));
        assert_eq!(conditions, json!({"id": 1}));
        assert!(!write.is_locked());
    }

    #[test]
    fn typed_values_travel_as_json() {
        let mut values = values();
        values.insert("bio".into(), Value::Null);
        values.insert("updated_at".into(), json!("2026-10-16T08:00:00Z"));
        let write = ConditionedWrite::builder()
            .table("users")
            .key(Predicate::eq("id", "0b5c2b1e-8f43-4d1e-9a38-2f3b5c6d7e80"))
            .version(Predicate::eq("lock_version", 1))
            .values(values)
            .build();

        let (sql, [values, conditions]) = write.to_sql();
        assert!(sql.contains(r#""bio" = v."bio""#));
        assert!(sql.contains(r#""updated_at" = v."updated_at""#));
        assert!(!sql.contains("= NULL"));
        assert_eq!(values["bio"], Value::Null);
        assert_eq!(values["updated_at"], json!("2026-10-16T08:00:00Z"));
        assert_eq!(conditions["id"], json!("0b5c2b1e-8f43-4d1e-9a38-2f3b5c6d7e80"));
    }

    #[test]
    fn matches_requires_both_predicates() {
        let write = ConditionedWrite::builder()
            .table("users")
            .key(Predicate::eq("id", 1))
            .version(Predicate::eq("lock_version", 1))
            .values(values())
            .build();

        let mut row = Attributes::new();
        row.insert("id".into(), json!(1));
        row.insert("lock_version".into(), json!(1));
        assert!(write.matches(&row));

        row.insert("lock_version".into(), json!(2));
        assert!(!write.matches(&row));

        row.insert("id".into(), json!(3));
        row.insert("lock_version".into(), json!(1));
        assert!(!write.matches(&row));
    }
}

//! 实体（Entity）基础抽象
//!
//! - `Entity`：可持久化的记录，具备主键与所在表；
//! - `Versioned`：在实体之上声明乐观锁版本列（即 HasVersion 能力）。
//!
//! 实体与存储之间通过 `Attributes`（列名 → JSON 值）交换数据，
//! 转换统一走 serde，因此实体需要实现 `Serialize + DeserializeOwned`。
//!
use crate::error::{DomainError, DomainResult};
use crate::value_object::LockVersion;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::fmt::Display;

/// 默认的乐观锁版本列名
pub const DEFAULT_LOCK_COLUMN: &str = "lock_version";

/// 列名到取值的有序映射（用于脏字段计算与写入载荷）
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// 可持久化实体
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// 主键类型
    type Id: Serialize + Clone + Display + Send + Sync;

    /// 所在表名
    const TABLE: &'static str;

    /// 主键列名
    const PRIMARY_KEY: &'static str = "id";

    /// 更新时间列；为 `Some` 时非空更新会自动写入当前 UTC 时间
    const UPDATED_AT: Option<&'static str> = None;

    /// 获取实体主键
    fn id(&self) -> &Self::Id;
}

/// 具备乐观锁版本的实体
///
/// 版本列名在类型定义时确定（关联常量），不随实例变化。
pub trait Versioned: Entity {
    const LOCK_COLUMN: &'static str = DEFAULT_LOCK_COLUMN;

    /// 当前内存中的版本；从未持久化时为 `None`
    fn lock_version(&self) -> Option<LockVersion>;

    fn set_lock_version(&mut self, version: Option<LockVersion>);

    /// 版本列名
    fn lock_version_column() -> &'static str {
        Self::LOCK_COLUMN
    }

    /// 当前版本（只读访问）
    fn current_lock_version(&self) -> Option<LockVersion> {
        self.lock_version()
    }

    /// 创建前初始化版本：未设置时置为 1，已设置时保持不变
    fn initialize_lock_version(&mut self) -> LockVersion {
        match self.lock_version() {
            Some(version) => version,
            None => {
                self.set_lock_version(Some(LockVersion::INITIAL));
                LockVersion::INITIAL
            }
        }
    }
}

/// 将实体序列化为列集合（包含主键与版本列）
pub fn to_attributes<E: Entity>(entity: &E) -> DomainResult<Attributes> {
    match serde_json::to_value(entity)? {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(DomainError::InvalidValue {
            reason: format!(
                "entity of table {} must serialize to an object, got {other}",
                E::TABLE
            ),
        }),
    }
}

/// 从列集合还原实体
pub fn from_attributes<E: Entity>(attributes: Attributes) -> DomainResult<E> {
    let map: serde_json::Map<String, serde_json::Value> = attributes.into_iter().collect();
    Ok(serde_json::from_value(serde_json::Value::Object(map))?)
}

/// 将若干列写回实体；列类型与字段不符时返回序列化错误且实体保持不变
pub fn apply_attributes<E: Entity>(entity: &mut E, changes: &Attributes) -> DomainResult<()> {
    if changes.is_empty() {
        return Ok(());
    }
    let mut attributes = to_attributes(entity)?;
    attributes.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
    *entity = from_attributes(attributes)?;
    Ok(())
}

/// 普通业务列：去掉主键与版本列
pub fn ordinary_attributes<E: Versioned>(entity: &E) -> DomainResult<Attributes> {
    let mut attributes = to_attributes(entity)?;
    attributes.remove(E::PRIMARY_KEY);
    attributes.remove(E::LOCK_COLUMN);
    Ok(attributes)
}

/// 主键的 JSON 表示，用作写入谓词
pub fn key_value<E: Entity>(entity: &E) -> DomainResult<serde_json::Value> {
    Ok(serde_json::to_value(entity.id())?)
}

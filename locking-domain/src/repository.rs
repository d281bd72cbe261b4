//! 带乐观锁的实体仓储（VersionedRepository）
//!
//! 更新流程（比较并递增）：
//! 1. 变更集为空：直接返回 `Unchanged`，不访问存储，不递增版本；
//! 2. 读取当前版本 `previous`（为空即前置条件错误），计算 `next = previous + 1`；
//! 3. 发出一条条件写：`SET changes + {版本列: next} WHERE 主键 = id AND 版本列 = previous`；
//!    关闭乐观锁的实例省略版本谓词，但版本仍然递增；
//! 4. 受影响行数为 0 且开启乐观锁：把内存版本恢复为 `previous` 并返回 `VersionConflict`；
//! 5. 否则保留 `next`，同步脏字段快照并返回 `Updated`。
//!
//! 第 2 步的读取只是乐观的预判，真正的仲裁是第 3 步语句中的版本谓词。
//!
use crate::entity::{
    Attributes, Versioned, apply_attributes, from_attributes, key_value, to_attributes,
};
use crate::error::{DomainError, DomainResult};
use crate::persist::{ConditionedWrite, Predicate, RecordStore};
use crate::record::Record;
use crate::value_object::LockVersion;
use bon::Builder;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// 一次保存的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// 首次持久化
    Created { version: LockVersion },
    /// 条件写命中，版本已推进
    Updated { version: LockVersion },
    /// 没有需要写入的变更
    Unchanged,
    /// 被 `UpdateObserver::updating` 否决
    Cancelled,
}

/// 更新生命周期回调
pub trait UpdateObserver<E>: Send + Sync {
    /// 写入前调用；返回 `false` 时放弃本次更新
    fn updating(&self, _entity: &E, _changes: &Attributes) -> bool {
        true
    }

    /// 条件写成功后调用
    fn updated(&self, _entity: &E) {}
}

#[derive(Builder)]
pub struct VersionedRepository<E, S> {
    store: S,
    #[builder(default)]
    observers: Vec<Arc<dyn UpdateObserver<E>>>,
}

impl<E, S> VersionedRepository<E, S>
where
    E: Versioned,
    S: RecordStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            observers: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 按主键加载，返回已同步、默认开启乐观锁的记录
    #[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE, key = %id))]
    pub async fn find(&self, id: &E::Id) -> DomainResult<Option<Record<E>>> {
        let key = serde_json::to_value(id)?;
        let Some(row) = self.store.find(E::TABLE, E::PRIMARY_KEY, &key).await? else {
            return Ok(None);
        };
        Ok(Some(Record::loaded(from_attributes::<E>(row)?)?))
    }

    /// 首次持久化：初始化版本（未提供时为 1）后插入整行
    #[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE, key = %record.id()))]
    pub async fn create(&self, record: &mut Record<E>) -> DomainResult<LockVersion> {
        if record.exists() {
            return Err(DomainError::InvalidState {
                reason: format!("{} record {} already exists", E::TABLE, record.id()),
            });
        }

        let version = record.initialize_lock_version();
        if let Some(column) = E::UPDATED_AT {
            apply_attributes(record.entity_mut(), &touch(column)?)?;
        }

        let row = to_attributes(record.entity())?;
        self.store.insert(E::TABLE, E::PRIMARY_KEY, row).await?;
        record.mark_persisted()?;

        tracing::debug!(%version, "record created");
        Ok(version)
    }

    /// 以脏字段作为变更集执行条件更新
    pub async fn update(&self, record: &mut Record<E>) -> DomainResult<SaveOutcome> {
        let changes = record.dirty()?;
        self.conditioned_update(record, changes).await
    }

    /// 未持久化则创建，否则更新
    pub async fn save(&self, record: &mut Record<E>) -> DomainResult<SaveOutcome> {
        if record.exists() {
            self.update(record).await
        } else {
            let version = self.create(record).await?;
            Ok(SaveOutcome::Created { version })
        }
    }

    /// 比较并递增：以给定变更集发出一条带版本谓词的原子写
    ///
    /// 变更会先写入内存实体。冲突时只恢复版本号，其余内存中的修改保持原样，
    /// 调用方应重新加载后再决定是否重试。
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(table = E::TABLE, key = %record.id(), locked = record.lock_enabled())
    )]
    pub async fn conditioned_update(
        &self,
        record: &mut Record<E>,
        mut changes: Attributes,
    ) -> DomainResult<SaveOutcome> {
        changes.remove(E::PRIMARY_KEY);
        changes.remove(E::LOCK_COLUMN);
        if changes.is_empty() {
            return Ok(SaveOutcome::Unchanged);
        }

        if !record.exists() {
            return Err(DomainError::PreconditionViolation {
                reason: format!("{} record {} has not been created", E::TABLE, record.id()),
            });
        }

        let previous =
            record
                .current_lock_version()
                .ok_or_else(|| DomainError::PreconditionViolation {
                    reason: format!(
                        "{} record {} has no {} (was it created without initialization?)",
                        E::TABLE,
                        record.id(),
                        E::LOCK_COLUMN
                    ),
                })?;

        if !self
            .observers
            .iter()
            .all(|o| o.updating(record.entity(), &changes))
        {
            tracing::debug!("update cancelled by observer");
            return Ok(SaveOutcome::Cancelled);
        }

        let next = previous.next()?;

        if let Some(column) = E::UPDATED_AT {
            changes.extend(touch(column)?);
        }
        apply_attributes(record.entity_mut(), &changes)?;

        let key = key_value(record.entity())?;
        changes.insert(E::LOCK_COLUMN.to_string(), Value::from(next.value()));

        let write = ConditionedWrite::builder()
            .table(E::TABLE)
            .key(Predicate::eq(E::PRIMARY_KEY, key))
            .maybe_version(
                record
                    .lock_enabled()
                    .then(|| Predicate::eq(E::LOCK_COLUMN, previous.value())),
            )
            .values(changes)
            .build();

        record.set_lock_version(Some(next));

        let affected = match self.store.conditioned_write(&write).await {
            Ok(affected) => affected,
            Err(err) => {
                record.set_lock_version(Some(previous));
                return Err(err);
            }
        };

        if affected == 0 {
            record.set_lock_version(Some(previous));

            if write.is_locked() {
                tracing::warn!(expected = %previous, "version conflict, record was changed by another writer");
                return Err(DomainError::VersionConflict {
                    table: E::TABLE,
                    key: record.id().to_string(),
                    expected: previous.value(),
                });
            }

            return Err(DomainError::NotFound {
                reason: format!("{} record {} no longer exists", E::TABLE, record.id()),
            });
        }

        record.sync_changes()?;
        for observer in &self.observers {
            observer.updated(record.entity());
        }

        tracing::debug!(from = %previous, to = %next, "record updated");
        Ok(SaveOutcome::Updated { version: next })
    }
}

fn touch(column: &str) -> DomainResult<Attributes> {
    let mut attributes = Attributes::new();
    attributes.insert(column.to_string(), serde_json::to_value(Utc::now())?);
    Ok(attributes)
}

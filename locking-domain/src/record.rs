//! 受跟踪的实体实例（Record）
//!
//! 在实体之外保存“上次同步时的列快照”，用于计算脏字段；
//! 同时承载每个实例的乐观锁开关（默认开启）。
//!
use crate::entity::{Attributes, Versioned, ordinary_attributes};
use crate::error::DomainResult;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone)]
pub struct Record<E> {
    entity: E,
    original: Attributes,
    exists: bool,
    lock_enabled: bool,
}

impl<E> Record<E>
where
    E: Versioned,
{
    /// 尚未持久化的新实例
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            original: Attributes::new(),
            exists: false,
            lock_enabled: true,
        }
    }

    /// 从存储加载的实例：以当前列值作为同步快照
    pub fn loaded(entity: E) -> DomainResult<Self> {
        let original = ordinary_attributes(&entity)?;
        Ok(Self {
            entity,
            original,
            exists: true,
            lock_enabled: true,
        })
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut E {
        &mut self.entity
    }

    pub fn into_inner(self) -> E {
        self.entity
    }

    /// 是否已经持久化
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn lock_enabled(&self) -> bool {
        self.lock_enabled
    }

    /// 关闭乐观锁：更新不再比较版本，直接覆盖（版本仍会递增）
    pub fn disable_locking(&mut self) -> &mut Self {
        self.lock_enabled = false;
        self
    }

    pub fn enable_locking(&mut self) -> &mut Self {
        self.lock_enabled = true;
        self
    }

    /// 自上次同步以来发生变化的普通列（不含主键与版本列）
    pub fn dirty(&self) -> DomainResult<Attributes> {
        let current = ordinary_attributes(&self.entity)?;
        Ok(current
            .into_iter()
            .filter(|(column, value)| self.original.get(column) != Some(value))
            .collect())
    }

    pub fn is_dirty(&self) -> DomainResult<bool> {
        Ok(!self.dirty()?.is_empty())
    }

    /// 将当前列值记为已同步
    pub fn sync_changes(&mut self) -> DomainResult<()> {
        self.original = ordinary_attributes(&self.entity)?;
        Ok(())
    }

    pub(crate) fn mark_persisted(&mut self) -> DomainResult<()> {
        self.exists = true;
        self.sync_changes()
    }
}

impl<E> Deref for Record<E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        &self.entity
    }
}

impl<E> DerefMut for Record<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entity
    }
}

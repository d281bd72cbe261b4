//! 乐观锁持久化基础库（locking-domain）
//!
//! 每个持久化实体携带一个单调递增的版本号；只有当调用方读到的版本仍与存储中的版本一致时，
//! 更新才会成功，否则返回 `DomainError::VersionConflict`，而不是静默覆盖并发修改。
//!
//! 组成：
//! - 版本策略（`entity::Versioned`、`value_object::LockVersion`）：列名、初始值与递增规则；
//! - 比较并递增的更新器（`repository::VersionedRepository`）：单条带版本谓词的原子写；
//! - 存储边界（`persist`）：条件写协议及内存/Postgres 实现；
//! - 外围协作者：迁移辅助（`schema`）与表单往返（`presentation`）。
//!
//! 典型用法：
//! 1. 用 `#[entity(table = "...")]` 定义实体（自动注入 `id` 与 `lock_version` 字段）；
//! 2. `VersionedRepository::create` 首次持久化，版本初始化为 1；
//! 3. 修改后 `update`/`save`，冲突时重新加载并由调用方决定是否重试。
//!
pub mod entity;
pub mod error;
pub mod persist;
pub mod presentation;
pub mod record;
pub mod repository;
pub mod schema;
pub mod value_object;

// 允许在本 crate 内部通过 ::locking_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::locking_domain 路径。
extern crate self as locking_domain;

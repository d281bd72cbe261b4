//! 持久化（persist）
//!
//! 定义乐观锁所依赖的存储边界：
//! - 条件写描述（`ConditionedWrite`/`Predicate`）；
//! - 行存储协议（`RecordStore`），要求如实返回受影响行数；
//! - 内存实现（`InMemoryStore`）与 Postgres 实现（`PgRecordStore`，`infra-sqlx` 特性）。
//!
mod conditioned_write;
mod inmemory;
#[cfg(feature = "infra-sqlx")]
mod postgres;
mod record_store;

pub use conditioned_write::{ConditionedWrite, Predicate};
pub use inmemory::InMemoryStore;
#[cfg(feature = "infra-sqlx")]
pub use postgres::PgRecordStore;
pub use record_store::RecordStore;

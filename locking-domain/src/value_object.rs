//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象，用于封装不可变的概念性值与校验逻辑。
//!

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// 值对象抽象
pub trait ValueObject {
    /// 业务校验失败时的错误类型
    type Error;

    /// 创建值对象时进行验证
    fn validate(&self) -> Result<(), Self::Error>;
}

/// 乐观锁版本号
///
/// 持久化后的实体版本号始终为正数：创建时为 1，每次成功更新加 1。
/// 列类型为无符号整数，因此内部使用 `u32`。
///
/// # 示例
///
/// ```
/// use locking_domain::value_object::LockVersion;
///
/// let v1 = LockVersion::INITIAL;
/// assert_eq!(v1.value(), 1);
///
/// let v2 = v1.next().unwrap();
/// assert_eq!(v2.value(), 2);
/// assert!(v2 > v1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct LockVersion(u32);

impl LockVersion {
    /// 新建实体的初始版本
    pub const INITIAL: LockVersion = LockVersion(1);

    /// 从值创建版本号（拒绝 0）
    ///
    /// ```
    /// use locking_domain::value_object::LockVersion;
    ///
    /// assert_eq!(LockVersion::try_from_value(5).unwrap().value(), 5);
    /// assert!(LockVersion::try_from_value(0).is_err());
    /// ```
    pub fn try_from_value(value: u32) -> DomainResult<Self> {
        let version = Self(value);
        version.validate()?;
        Ok(version)
    }

    /// 下一个版本号；达到 `u32::MAX` 时无法继续递增
    pub fn next(&self) -> DomainResult<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| DomainError::InvalidState {
                reason: format!("lock version {} cannot be incremented", self.0),
            })
    }

    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl ValueObject for LockVersion {
    type Error = DomainError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.0 == 0 {
            return Err(DomainError::InvalidValue {
                reason: "lock version must be strictly positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for LockVersion {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for LockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl TryFrom<u32> for LockVersion {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::try_from_value(value)
    }
}

impl From<LockVersion> for u32 {
    fn from(version: LockVersion) -> Self {
        version.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_version() {
        let v = LockVersion::INITIAL;
        assert_eq!(v.value(), 1);
        assert_eq!(LockVersion::default(), v);
    }

    #[test]
    fn test_zero_is_rejected() {
        let err = LockVersion::try_from_value(0).unwrap_err();
        match err {
            DomainError::InvalidValue { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
        assert!(LockVersion::try_from(0u32).is_err());
    }

    #[test]
    fn test_next_increments_by_one() {
        let v1 = LockVersion::try_from_value(10).unwrap();
        let v2 = v1.next().unwrap();

        assert_eq!(v1.value(), 10);
        assert_eq!(v2.value(), 11);
        assert!(v2 > v1);
    }

    #[test]
    fn test_next_overflow() {
        let max = LockVersion::try_from_value(u32::MAX).unwrap();
        match max.next().unwrap_err() {
            DomainError::InvalidState { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(LockVersion::INITIAL.to_string(), "v1");
        assert_eq!(LockVersion::try_from_value(7).unwrap().to_string(), "v7");
    }

    // 数据库列中保存的是裸整数
    #[test]
    fn test_serde_plain_integer() {
        let v = LockVersion::try_from_value(42).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "42");

        let back: LockVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        let none: Option<LockVersion> = serde_json::from_str("null").unwrap();
        assert!(none.is_none());

        assert!(serde_json::from_str::<LockVersion>("0").is_err());
    }
}

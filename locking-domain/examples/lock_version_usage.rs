//! LockVersion 与冲突重试示例
//!
//! 展示版本号的初始化与递增规则，以及冲突后“重新加载再重试”的典型写法。
//!
//! 运行示例：
//! ```bash
//! cargo run -p locking-domain --example lock_version_usage
//! ```

use locking_domain::entity::Versioned;
use locking_domain::error::{DomainError, DomainResult};
use locking_domain::persist::InMemoryStore;
use locking_domain::record::Record;
use locking_domain::repository::{SaveOutcome, VersionedRepository};
use locking_domain::value_object::LockVersion;
use locking_macros::entity;

#[entity(table = "accounts", id = u64)]
#[derive(Clone)]
struct Account {
    balance: i64,
}

type Repo = VersionedRepository<Account, InMemoryStore>;

/// 冲突时重新加载并重放修改，最多尝试 `attempts` 次
async fn deposit(repo: &Repo, id: u64, amount: i64, attempts: usize) -> DomainResult<SaveOutcome> {
    let mut last = None;
    for attempt in 1..=attempts {
        let Some(mut account) = repo.find(&id).await? else {
            return Err(DomainError::NotFound {
                reason: format!("account {id}"),
            });
        };
        account.balance += amount;
        match repo.update(&mut account).await {
            Err(err) if err.is_version_conflict() => {
                println!("   第 {attempt} 次提交冲突: {err}");
                last = Some(err);
            }
            other => return other,
        }
    }
    Err(last.unwrap_or(DomainError::InvalidState {
        reason: "no attempts made".into(),
    }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> DomainResult<()> {
    println!("=== LockVersion 使用示例 ===\n");

    println!("1. 版本规则");
    let v1 = LockVersion::INITIAL;
    println!("   初始版本: {} (value = {})", v1, v1.value());
    println!("   下一个版本: {}", v1.next()?);
    println!("   0 不是合法版本: {}\n", LockVersion::try_from_value(0).is_err());

    let repo: Repo = VersionedRepository::new(InMemoryStore::new());

    println!("2. 首次持久化");
    let mut account = Record::new(Account {
        id: 7,
        lock_version: None,
        balance: 100,
    });
    let version = repo.create(&mut account).await?;
    println!("   创建后版本: {version}\n");

    println!("3. 用旧副本制造冲突");
    let mut stale = account.clone();
    account.balance = 150;
    repo.update(&mut account).await?;
    stale.balance = 80;
    if let Err(err) = repo.update(&mut stale).await {
        println!("   旧副本提交失败: {err}");
        println!("   旧副本版本仍为: {:?}\n", stale.current_lock_version());
    }

    println!("4. 重新加载后重试");
    let outcome = deposit(&repo, 7, 25, 3).await?;
    println!("   结果: {outcome:?}");

    if let Some(latest) = repo.find(&7).await? {
        println!(
            "   最新余额: {} (版本 {:?})",
            latest.balance,
            latest.current_lock_version()
        );
    }

    Ok(())
}

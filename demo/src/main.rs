use anyhow::{Context, bail};
use locking_domain::entity::{Entity, Versioned};
use locking_domain::persist::{InMemoryStore, RecordStore};
use locking_domain::presentation::{fill_lock_version, lock_input};
use locking_domain::record::Record;
use locking_domain::repository::{SaveOutcome, VersionedRepository};
use locking_macros::entity;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[entity(table = "users", id = i64)]
#[derive(Clone)]
struct User {
    name: String,
}

/// 按浏览器提交表单的方式，把隐藏字段还原为 `name -> value`
fn submit_hidden_field(html: &str) -> Option<HashMap<String, String>> {
    let attribute = |name: &str| {
        html.split(&format!("{name}=\""))
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .map(str::to_string)
    };
    Some(HashMap::from([(attribute("name")?, attribute("value")?)]))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let store = Arc::new(InMemoryStore::new());
    let repo: VersionedRepository<User, _> = VersionedRepository::new(Arc::clone(&store));

    let mut created = Record::new(User {
        id: 1,
        lock_version: None,
        name: "a".into(),
    });
    repo.create(&mut created).await?;
    tracing::info!(version = ?created.current_lock_version(), "created user 1");

    // 两个读者读到同一个版本
    let mut r1 = repo.find(&1).await?.context("user 1 must exist")?;
    let mut r2 = repo.find(&1).await?.context("user 1 must exist")?;

    // 模拟表单往返：R2 的版本来自渲染出的隐藏字段
    let hidden = lock_input(r2.entity())?;
    tracing::info!(%hidden, "rendered form field for R2");
    let submitted = submit_hidden_field(&hidden).context("hidden field must carry name and value")?;
    tracing::info!(?submitted, "form submitted by R2");
    fill_lock_version(r2.entity_mut(), &submitted)?;

    r1.name = "b".into();
    match repo.update(&mut r1).await? {
        SaveOutcome::Updated { version } => tracing::info!(%version, "R1 committed"),
        other => bail!("R1 should have been updated, got {other:?}"),
    }

    r2.name = "c".into();
    match repo.update(&mut r2).await {
        Err(err) if err.is_version_conflict() => {
            tracing::info!(
                %err,
                version = ?r2.current_lock_version(),
                "R2 rejected: this record was changed by someone else"
            );
            if r2.current_lock_version().map(|v| v.value()) != Some(1) {
                bail!("R2 version should have been restored to 1");
            }
        }
        other => bail!("R2 should have conflicted, got {other:?}"),
    }

    let row = store
        .find(User::TABLE, User::PRIMARY_KEY, &serde_json::json!(1))
        .await?
        .context("row must exist")?;
    tracing::info!(?row, "durable row");

    if row.get("name") != Some(&serde_json::json!("b"))
        || row.get(User::LOCK_COLUMN) != Some(&serde_json::json!(2))
    {
        bail!("durable row should be {{id: 1, lock_version: 2, name: \"b\"}}");
    }

    Ok(())
}

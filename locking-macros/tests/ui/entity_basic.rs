use locking_domain::entity::{Entity, Versioned};
use locking_macros::entity;

#[entity(table = "accounts")]
#[derive(Clone)]
struct Account {
    name: String,
}

fn main() {
    let mut account = Account {
        id: "acc-1".to_string(),
        lock_version: None,
        name: "alice".to_string(),
    };
    assert_eq!(Account::TABLE, "accounts");
    assert_eq!(Account::LOCK_COLUMN, "lock_version");
    assert_eq!(account.id(), "acc-1");
    assert_eq!(account.initialize_lock_version().value(), 1);
    let _ = format!("{:?}", account.clone());
}

use locking_domain::entity::Entity;
use locking_domain::value_object::LockVersion;
use locking_macros::entity;
use serde::{Deserialize, Serialize};

// 已手写 id/lock_version 与 serde 派生时，宏复用用户定义且不重复派生
#[entity(table = "orders", id = u64, debug = false)]
#[derive(Serialize, Deserialize)]
struct Order {
    total: i64,
    id: u64,
    lock_version: Option<LockVersion>,
}

impl std::fmt::Debug for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order(..)")
    }
}

fn main() {
    let order = Order {
        id: 9,
        lock_version: None,
        total: 10,
    };
    assert_eq!(*order.id(), 9);
    let _ = format!("{:?}", order);
}

use locking_domain::entity::{Versioned, from_attributes, ordinary_attributes, to_attributes};
use locking_domain::value_object::LockVersion;
use locking_macros::entity;

// 手写的 lock_version 字段也按 lock_column 序列化
#[entity(table = "docs", id = u64, lock_column = "revision")]
struct Doc {
    id: u64,
    lock_version: Option<LockVersion>,
    name: String,
}

fn main() {
    let doc = Doc {
        id: 1,
        lock_version: Some(LockVersion::INITIAL),
        name: "a".into(),
    };

    let attributes = to_attributes(&doc).unwrap();
    assert_eq!(attributes.get("revision"), Some(&serde_json::json!(1)));
    assert!(!attributes.contains_key("lock_version"));

    let ordinary = ordinary_attributes(&doc).unwrap();
    assert!(!ordinary.contains_key("revision"));
    assert!(ordinary.contains_key("name"));

    let back: Doc = from_attributes(attributes).unwrap();
    assert_eq!(back.current_lock_version(), Some(LockVersion::INITIAL));
}

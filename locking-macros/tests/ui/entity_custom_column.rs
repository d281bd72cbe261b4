use locking_domain::entity::{Entity, Versioned, to_attributes};
use locking_domain::value_object::LockVersion;
use locking_macros::entity;
use uuid::Uuid;

#[entity(table = "profiles", id = Uuid, lock_column = "revision", updated_at = "touched_at")]
struct Profile {
    bio: String,
    touched_at: Option<String>,
}

fn main() {
    let profile = Profile {
        id: Uuid::new_v4(),
        lock_version: Some(LockVersion::INITIAL),
        bio: String::new(),
        touched_at: None,
    };
    assert_eq!(Profile::lock_version_column(), "revision");
    assert_eq!(Profile::UPDATED_AT, Some("touched_at"));

    let attributes = to_attributes(&profile).unwrap();
    assert!(attributes.contains_key("revision"));
    assert!(!attributes.contains_key("lock_version"));
}

mod derive_utils;
mod entity;
mod field_utils;

use proc_macro::TokenStream;

/// 实体宏
/// - 追加字段：`id: IdType`、`lock_version: Option<LockVersion>`（若缺失）并置于字段最前
/// - 自动实现 `::locking_domain::entity::Entity` 与 `::locking_domain::entity::Versioned`
/// - 参数：`#[entity(table = "users", id = i64, lock_column = "lock_version", updated_at = "updated_at")]`
///
/// ```ignore
/// use locking_macros::entity;
///
/// #[entity(table = "articles", id = i64)]
/// #[derive(Clone)]
/// struct Article {
///     title: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

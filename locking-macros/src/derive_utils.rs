use quote::ToTokens;
use syn::{Attribute, Path, Token, punctuated::Punctuated};

// serde 派生可能以 `Serialize` 或 `serde::Serialize` 两种形式出现，统一成同一个键
fn derive_key(path: &Path) -> String {
    match path.segments.last() {
        Some(last) if last.ident == "Serialize" || last.ident == "Deserialize" => {
            format!("serde::{}", last.ident)
        }
        Some(last) => last.ident.to_string(),
        None => path.to_token_stream().to_string(),
    }
}

/// 把宏要求的派生与用户已写的派生合并为一条 `#[derive(...)]`
/// - 宏要求的派生在前，用户已有的同名派生不会重复出现；
/// - 其它（非 derive）属性保持原顺序，位于合并后的 derive 之后，
///   这样 `#[serde(...)]` 等容器属性仍在 derive 作用范围内。
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<Path>) {
    let mut others = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs.drain(..) {
        if !attr.path().is_ident("derive") {
            others.push(attr);
            continue;
        }
        if let Ok(list) = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated) {
            existing.extend(list);
        }
    }

    let mut seen = std::collections::HashSet::new();
    let merged: Vec<Path> = required
        .into_iter()
        .chain(existing)
        .filter(|p| seen.insert(derive_key(p)))
        .collect();

    attrs.push(syn::parse_quote!(#[derive(#(#merged),*)]));
    attrs.extend(others);
}

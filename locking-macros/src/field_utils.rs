use syn::{Field, FieldsNamed, Token, punctuated::Punctuated};

fn field_named<'a>(named: &'a Punctuated<Field, Token![,]>, name: &str) -> Option<&'a Field> {
    named
        .iter()
        .find(|f| f.ident.as_ref().map(|i| i == name).unwrap_or(false))
}

/// 确保具名字段结构体以给定字段开头
/// - required: 期望的字段定义，按顺序放在最前；
/// - 若结构体中已存在同名字段，则复用用户的定义（包括其属性与类型）；
/// - 其余字段保持原有相对顺序。
pub(crate) fn ensure_leading_fields(fields_named: &mut FieldsNamed, required: Vec<Field>) {
    let old_named = fields_named.named.clone();
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();

    let required_names: Vec<String> = required
        .iter()
        .filter_map(|f| f.ident.as_ref().map(|i| i.to_string()))
        .collect();

    for (field, name) in required.into_iter().zip(required_names.iter()) {
        match field_named(&old_named, name) {
            Some(existing) => new_named.push(existing.clone()),
            None => new_named.push(field),
        }
    }

    for f in old_named.into_iter() {
        let is_required = f
            .ident
            .as_ref()
            .map(|i| required_names.iter().any(|n| i == n))
            .unwrap_or(false);
        if !is_required {
            new_named.push(f);
        }
    }

    fields_named.named = new_named;
}

/// 字段上 `#[serde(...)]` 里与列名映射有关的设置
#[derive(Default)]
pub(crate) struct SerdeRename {
    /// `rename = "..."`
    pub(crate) name: Option<String>,
    /// `rename(serialize = ..., deserialize = ...)`
    pub(crate) split: bool,
}

pub(crate) fn serde_rename(field: &Field) -> syn::Result<SerdeRename> {
    let mut out = SerdeRename::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            let is_rename = meta.path.is_ident("rename");
            if meta.input.peek(Token![=]) {
                let value = meta.value()?;
                if is_rename {
                    let lit: syn::LitStr = value.parse()?;
                    out.name = Some(lit.value());
                } else {
                    let _: syn::Expr = value.parse()?;
                }
            } else if meta.input.peek(syn::token::Paren) {
                let _content;
                syn::parenthesized!(_content in meta.input);
                out.split |= is_rename;
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// 字段序列化后的列名：`rename` 优先，否则为字段名
pub(crate) fn column_name(field: &Field) -> syn::Result<Option<String>> {
    let rename = serde_rename(field)?;
    Ok(rename
        .name
        .or_else(|| field.ident.as_ref().map(|i| i.to_string())))
}

pub(crate) fn find_field_mut<'a>(
    fields_named: &'a mut FieldsNamed,
    name: &str,
) -> Option<&'a mut Field> {
    fields_named
        .named
        .iter_mut()
        .find(|f| f.ident.as_ref().map(|i| i == name).unwrap_or(false))
}

/// 校验列名为合法 SQL 标识符：`[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

use crate::derive_utils::apply_derives;
use crate::field_utils::{
    column_name, ensure_leading_fields, find_field_mut, is_identifier, serde_rename,
};
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Item, ItemStruct, LitStr, Result, Token, Type, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

const DEFAULT_LOCK_COLUMN: &str = "lock_version";

/// #[entity] 宏实现
/// - 若缺失则追加字段：`id: IdType`, `lock_version: Option<LockVersion>`，并置于字段最前
/// - 自动实现 `::locking_domain::entity::{Entity, Versioned}`
/// - 支持参数：`#[entity(table = "...", id = IdType, lock_column = "...", updated_at = "...", debug = true|false)]`；
///   - `table` 必填
///   - `id` 默认 `String`
///   - `lock_column` 默认 `lock_version`；与字段名不同时通过 `#[serde(rename)]` 映射，
///     用户手写的 `lock_version` 字段同样会被补上该映射（已有的 rename 必须与之一致）
///   - `updated_at` 指定后非空更新会自动写入当前时间（字段需由用户声明，否则编译报错）
///   - `debug` 默认 `true`（派生 Debug）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[entity] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let Some(table) = cfg.table else {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "missing required key 'table' in #[entity(...)]",
        )
        .to_compile_error()
        .into();
    };

    // 仅支持具名字段结构体
    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    let id_type = cfg.id_ty.unwrap_or_else(|| syn::parse_quote! { String });
    let lock_column = cfg
        .lock_column
        .map(|lit| lit.value())
        .unwrap_or_else(|| DEFAULT_LOCK_COLUMN.to_string());

    // 版本列缺失时反序列化为 None；列名不同于字段名时做重命名
    let lock_field: syn::Field = if lock_column == DEFAULT_LOCK_COLUMN {
        syn::parse_quote! {
            #[serde(default)]
            lock_version: ::std::option::Option<::locking_domain::value_object::LockVersion>
        }
    } else {
        syn::parse_quote! {
            #[serde(default, rename = #lock_column)]
            lock_version: ::std::option::Option<::locking_domain::value_object::LockVersion>
        }
    };

    ensure_leading_fields(
        fields_named,
        vec![syn::parse_quote! { id: #id_type }, lock_field],
    );

    if let Err(err) = align_lock_field(fields_named, &lock_column) {
        return err.to_compile_error().into();
    }

    if let Some(lit) = &cfg.updated_at {
        if let Err(err) = ensure_column_declared(fields_named, lit) {
            return err.to_compile_error().into();
        }
    }

    // 合并/规范 derive：默认添加 Debug（可通过 debug=false 关闭）、Serialize、Deserialize
    let mut required: Vec<syn::Path> = vec![
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    if cfg.derive_debug.unwrap_or(true) {
        required.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, required);

    let out_struct = ItemStruct { ..st };

    let updated_at = cfg.updated_at.map(|lit| {
        quote! {
            const UPDATED_AT: ::std::option::Option<&'static str> = ::std::option::Option::Some(#lit);
        }
    });

    let ident = &out_struct.ident;
    let generics = out_struct.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let expanded = quote! {
        #out_struct

        impl #impl_generics ::locking_domain::entity::Entity for #ident #ty_generics #where_clause {
            type Id = #id_type;

            const TABLE: &'static str = #table;

            #updated_at

            fn id(&self) -> &Self::Id { &self.id }
        }

        impl #impl_generics ::locking_domain::entity::Versioned for #ident #ty_generics #where_clause {
            const LOCK_COLUMN: &'static str = #lock_column;

            fn lock_version(&self) -> ::std::option::Option<::locking_domain::value_object::LockVersion> {
                self.lock_version
            }

            fn set_lock_version(
                &mut self,
                version: ::std::option::Option<::locking_domain::value_object::LockVersion>,
            ) {
                self.lock_version = version;
            }
        }
    };

    TokenStream::from(expanded)
}

/// 用户手写的 `lock_version` 字段也要序列化到 `lock_column` 指定的列
fn align_lock_field(fields_named: &mut syn::FieldsNamed, lock_column: &str) -> Result<()> {
    let Some(field) = find_field_mut(fields_named, "lock_version") else {
        return Ok(());
    };
    let rename = serde_rename(field)?;
    if rename.split {
        return Err(syn::Error::new(
            field.span(),
            "`lock_version` does not support #[serde(rename(...))]; use #[entity(lock_column = \"...\")] instead",
        ));
    }
    match rename.name {
        Some(name) if name == lock_column => Ok(()),
        Some(name) => Err(syn::Error::new(
            field.span(),
            format!(
                "`lock_version` is renamed to '{name}' but lock_column is '{lock_column}'; remove the rename or make them agree"
            ),
        )),
        None if lock_column == DEFAULT_LOCK_COLUMN => Ok(()),
        None => {
            field
                .attrs
                .push(syn::parse_quote!(#[serde(rename = #lock_column)]));
            Ok(())
        }
    }
}

/// `updated_at` 必须对应结构体中的某个字段（按序列化后的列名比较）
fn ensure_column_declared(fields_named: &syn::FieldsNamed, lit: &LitStr) -> Result<()> {
    let wanted = lit.value();
    for field in &fields_named.named {
        if column_name(field)?.as_deref() == Some(wanted.as_str()) {
            return Ok(());
        }
    }
    Err(syn::Error::new(
        lit.span(),
        format!("updated_at = \"{wanted}\" names no field; declare a `{wanted}` field on the struct"),
    ))
}

// -------- parsing --------

struct EntityAttrConfig {
    id_ty: Option<Type>,
    table: Option<LitStr>,
    lock_column: Option<LitStr>,
    updated_at: Option<LitStr>,
    derive_debug: Option<bool>,
}

fn duplicate(span: proc_macro2::Span, key: &str) -> syn::Error {
    syn::Error::new(span, format!("duplicate key '{key}' in attribute"))
}

fn identifier_lit(lit: LitStr, key: &str) -> Result<LitStr> {
    if is_identifier(&lit.value()) {
        Ok(lit)
    } else {
        Err(syn::Error::new(
            lit.span(),
            format!("'{key}' must be a valid SQL identifier ([A-Za-z_][A-Za-z0-9_]*)"),
        ))
    }
}

impl Parse for EntityAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self {
            id_ty: None,
            table: None,
            lock_column: None,
            updated_at: None,
            derive_debug: None,
        };

        if input.is_empty() {
            return Ok(cfg);
        }

        let elems: Punctuated<EntityAttrElem, Token![,]> =
            Punctuated::<EntityAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                EntityAttrElem::Id(ty) => {
                    if cfg.id_ty.is_some() {
                        return Err(duplicate(ty.span(), "id"));
                    }
                    cfg.id_ty = Some(*ty);
                }
                EntityAttrElem::Table(lit) => {
                    if cfg.table.is_some() {
                        return Err(duplicate(lit.span(), "table"));
                    }
                    cfg.table = Some(identifier_lit(lit, "table")?);
                }
                EntityAttrElem::LockColumn(lit) => {
                    if cfg.lock_column.is_some() {
                        return Err(duplicate(lit.span(), "lock_column"));
                    }
                    cfg.lock_column = Some(identifier_lit(lit, "lock_column")?);
                }
                EntityAttrElem::UpdatedAt(lit) => {
                    if cfg.updated_at.is_some() {
                        return Err(duplicate(lit.span(), "updated_at"));
                    }
                    cfg.updated_at = Some(identifier_lit(lit, "updated_at")?);
                }
                EntityAttrElem::Debug(b) => {
                    if cfg.derive_debug.is_some() {
                        return Err(duplicate(proc_macro2::Span::call_site(), "debug"));
                    }
                    cfg.derive_debug = Some(b);
                }
            }
        }

        Ok(cfg)
    }
}

enum EntityAttrElem {
    Id(Box<Type>),
    Table(LitStr),
    LockColumn(LitStr),
    UpdatedAt(LitStr),
    Debug(bool),
}

impl Parse for EntityAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;

        if key == "id" {
            let ty: Type = input.parse()?;
            Ok(EntityAttrElem::Id(Box::new(ty)))
        } else if key == "table" {
            Ok(EntityAttrElem::Table(input.parse()?))
        } else if key == "lock_column" {
            Ok(EntityAttrElem::LockColumn(input.parse()?))
        } else if key == "updated_at" {
            Ok(EntityAttrElem::UpdatedAt(input.parse()?))
        } else if key == "debug" {
            let expr: syn::Expr = input.parse()?;
            match expr {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Bool(b),
                    ..
                }) => Ok(EntityAttrElem::Debug(b.value())),
                other => Err(syn::Error::new(
                    other.span(),
                    "expected boolean literal for 'debug'",
                )),
            }
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'table', 'id', 'lock_column', 'updated_at' or 'debug'",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::FieldsNamed;

    fn lock_field_rename(fields: &mut FieldsNamed) -> Option<String> {
        let field = find_field_mut(fields, "lock_version").unwrap();
        serde_rename(field).unwrap().name
    }

    #[test]
    fn declared_lock_field_gets_custom_column() {
        let mut fields: FieldsNamed = syn::parse_quote!({
            id: u64,
            lock_version: Option<LockVersion>,
            name: String,
        });
        align_lock_field(&mut fields, "revision").unwrap();
        assert_eq!(lock_field_rename(&mut fields).as_deref(), Some("revision"));
    }

    #[test]
    fn declared_lock_field_keeps_default_column() {
        let mut fields: FieldsNamed = syn::parse_quote!({
            lock_version: Option<LockVersion>,
        });
        align_lock_field(&mut fields, DEFAULT_LOCK_COLUMN).unwrap();
        assert_eq!(lock_field_rename(&mut fields), None);
    }

    #[test]
    fn matching_rename_is_accepted() {
        let mut fields: FieldsNamed = syn::parse_quote!({
            #[serde(default, rename = "revision")]
            lock_version: Option<LockVersion>,
        });
        align_lock_field(&mut fields, "revision").unwrap();
        let field = find_field_mut(&mut fields, "lock_version").unwrap();
        assert_eq!(field.attrs.len(), 1);
    }

    #[test]
    fn disagreeing_rename_is_rejected() {
        let mut fields: FieldsNamed = syn::parse_quote!({
            #[serde(rename = "rev")]
            lock_version: Option<LockVersion>,
        });
        let err = align_lock_field(&mut fields, "revision").unwrap_err();
        assert!(err.to_string().contains("lock_column is 'revision'"));

        let mut split: FieldsNamed = syn::parse_quote!({
            #[serde(rename(serialize = "a", deserialize = "b"))]
            lock_version: Option<LockVersion>,
        });
        assert!(align_lock_field(&mut split, "revision").is_err());
    }

    #[test]
    fn updated_at_must_name_a_field() {
        let fields: FieldsNamed = syn::parse_quote!({
            title: String,
            #[serde(rename = "modified_at")]
            modified: Option<String>,
        });

        let missing: LitStr = syn::parse_quote!("updated_at");
        let err = ensure_column_declared(&fields, &missing).unwrap_err();
        assert!(err.to_string().contains("names no field"));

        let renamed: LitStr = syn::parse_quote!("modified_at");
        assert!(ensure_column_declared(&fields, &renamed).is_ok());

        let by_ident: LitStr = syn::parse_quote!("title");
        assert!(ensure_column_declared(&fields, &by_ident).is_ok());
    }
}

//! 表单往返：将版本号渲染为隐藏字段，并从提交的表单中取回
//!
//! 只接受实现了 `Versioned` 的实体（编译期约束）。字段名取实体类型配置的版本列名。
//!
use crate::entity::Versioned;
use crate::error::DomainResult;
use crate::schema::validate_identifier;
use crate::value_object::LockVersion;
use std::collections::HashMap;

/// 渲染 `<input type="hidden" name="{column}" value="{version}">`
///
/// 列名必须是合法标识符、取值为整数，因此输出无需再做 HTML 转义。
/// 版本未设置时 `value` 为空。
pub fn lock_input<E: Versioned>(entity: &E) -> DomainResult<String> {
    let column = E::lock_version_column();
    validate_identifier(column)?;

    let value = entity
        .current_lock_version()
        .map(|v| v.value().to_string())
        .unwrap_or_default();

    Ok(format!(
        r#"<input type="hidden" name="{column}" value="{value}">"#
    ))
}

/// 用客户端提交的版本号覆盖实体当前版本
///
/// 缺失或为空时版本被清空，随后的更新会以前置条件错误失败；
/// 非数字或为 0 时返回错误且不修改实体。
pub fn fill_lock_version<E: Versioned>(
    entity: &mut E,
    input: &HashMap<String, String>,
) -> DomainResult<Option<LockVersion>> {
    let submitted = match input
        .get(E::lock_version_column())
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
    {
        Some(raw) => Some(LockVersion::try_from_value(raw.parse::<u32>()?)?),
        None => None,
    };

    entity.set_lock_version(submitted);
    Ok(submitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use locking_macros::entity;

    #[entity(id = u64, table = "invoices", lock_column = "revision")]
    #[derive(Clone)]
    struct Invoice {
        amount: i64,
    }

    fn invoice(version: Option<u32>) -> Invoice {
        Invoice {
            id: 1,
            lock_version: version.map(|v| LockVersion::try_from_value(v).unwrap()),
            amount: 100,
        }
    }

    #[test]
    fn renders_hidden_input_with_configured_column() {
        let html = lock_input(&invoice(Some(4))).unwrap();
        assert_eq!(html, r#"<input type="hidden" name="revision" value="4">"#);
    }

    #[test]
    fn renders_empty_value_when_unset() {
        let html = lock_input(&invoice(None)).unwrap();
        assert_eq!(html, r#"<input type="hidden" name="revision" value="">"#);
    }

    #[test]
    fn round_trip_through_form() {
        let original = invoice(Some(12));
        let html = lock_input(&original).unwrap();

        // 模拟浏览器提交隐藏字段
        let value = html
            .split("value=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap()
            .to_string();
        let input = HashMap::from([("revision".to_string(), value)]);

        let mut submitted = invoice(Some(1));
        let filled = fill_lock_version(&mut submitted, &input).unwrap();
        assert_eq!(filled, original.current_lock_version());
        assert_eq!(
            submitted.current_lock_version(),
            original.current_lock_version()
        );
    }

    #[test]
    fn missing_or_blank_input_clears_version() {
        let mut inv = invoice(Some(3));
        assert_eq!(fill_lock_version(&mut inv, &HashMap::new()).unwrap(), None);
        assert_eq!(inv.current_lock_version(), None);

        let mut inv = invoice(Some(3));
        let input = HashMap::from([("revision".to_string(), "  ".to_string())]);
        fill_lock_version(&mut inv, &input).unwrap();
        assert_eq!(inv.current_lock_version(), None);
    }

    #[test]
    fn malformed_input_is_rejected_without_mutation() {
        let mut inv = invoice(Some(3));
        let input = HashMap::from([("revision".to_string(), "abc".to_string())]);
        match fill_lock_version(&mut inv, &input).unwrap_err() {
            DomainError::Parse { .. } => {}
            other => panic!("unexpected {other:?}"),
        }

        let input = HashMap::from([("revision".to_string(), "0".to_string())]);
        match fill_lock_version(&mut inv, &input).unwrap_err() {
            DomainError::InvalidValue { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(inv.current_lock_version().map(|v| v.value()), Some(3));
    }
}

//! DynamicMessage -> FieldTree conversion

use contracts::{FieldTree, FieldValue};
use prost_reflect::{DynamicMessage, Kind, MapKey, ReflectMessage, Value};

/// Convert a decoded message into a field-number keyed tree
///
/// Every field declared by the descriptor is present; unset fields carry
/// their protobuf default, so lookups only fail for numbers the schema does
/// not define. An unset singular message field becomes an empty nested tree
/// and is not descended into, which keeps recursive schemas finite.
pub(crate) fn to_field_tree(message: &DynamicMessage) -> FieldTree {
    let descriptor = message.descriptor();
    let mut tree = FieldTree::new(descriptor.full_name());

    for field in descriptor.fields() {
        let kind = field.kind();
        let value = match kind.as_message() {
            Some(nested)
                if !field.is_list() && !field.is_map() && !message.has_field(&field) =>
            {
                FieldValue::Nested(FieldTree::new(nested.full_name()))
            }
            _ => convert_value(&message.get_field(&field), &kind),
        };
        tree.insert(field.number(), value);
    }

    tree
}

fn convert_value(value: &Value, kind: &Kind) -> FieldValue {
    match value {
        Value::Bool(v) => FieldValue::Bool(*v),
        Value::I32(v) => FieldValue::Int(i64::from(*v)),
        Value::I64(v) => FieldValue::Int(*v),
        Value::U32(v) => FieldValue::UInt(u64::from(*v)),
        Value::U64(v) => FieldValue::UInt(*v),
        Value::F32(v) => FieldValue::Float(widen_f32(*v)),
        Value::F64(v) => FieldValue::Float(*v),
        Value::String(s) => FieldValue::Str(s.clone()),
        Value::Bytes(b) => FieldValue::Bytes(b.clone()),
        Value::EnumNumber(number) => FieldValue::Enum {
            number: *number,
            name: kind
                .as_enum()
                .and_then(|e| e.get_value(*number))
                .map(|v| v.name().to_string()),
        },
        Value::Message(nested) => FieldValue::Nested(to_field_tree(nested)),
        Value::List(values) => {
            FieldValue::List(values.iter().map(|v| convert_value(v, kind)).collect())
        }
        Value::Map(entries) => {
            // map fields are typed by their synthetic entry message
            let value_kind = kind
                .as_message()
                .map(|entry| entry.map_entry_value_field().kind())
                .unwrap_or_else(|| kind.clone());
            FieldValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (map_key_text(k), convert_value(v, &value_kind)))
                    .collect(),
            )
        }
    }
}

/// Widen through the shortest decimal form so 12.3f32 becomes 12.3, not 12.300000190734863
fn widen_f32(v: f32) -> f64 {
    v.to_string().parse().unwrap_or(f64::from(v))
}

fn map_key_text(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(v) => v.clone(),
    }
}

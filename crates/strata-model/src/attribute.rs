//! Attribute schemas and the normalization pass.
//!
//! Raw declarations arrive as JSON-shaped data: a shorthand type string, an
//! object with a `type` plus modifier keys, or a relation object carrying
//! `model` or `collection`/`via`/`dominant`. Normalization resolves that
//! ambiguity once, up front, into an explicit tagged union so every later
//! stage matches on the variant instead of probing for keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DefinitionError;

/// Keys that mark an attribute as a relation rather than a column.
pub const STRUCTURAL_KEYS: [&str; 4] = ["model", "collection", "via", "dominant"];

/// A modifier as declared: a name plus its raw JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierValue {
    /// Modifier name, aliases already rewritten.
    pub name: String,
    /// Raw declared value (`true` for bare flags).
    pub value: Value,
}

impl ModifierValue {
    /// Creates a modifier with an explicit value.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Creates a bare flag modifier.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, Value::Bool(true))
    }
}

/// A plain column-producing attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarAttribute {
    /// Declared semantic type name, resolved against the type map at build
    /// time so an unknown name stays a per-column condition.
    pub type_name: String,
    /// Modifiers in declaration order.
    pub modifiers: Vec<ModifierValue>,
}

/// A single-valued relation: this side carries the foreign-key column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToOneRelation {
    /// Identity of the target model.
    pub target: String,
    /// Modifiers applied to the generated foreign-key column.
    pub modifiers: Vec<ModifierValue>,
}

/// A many-valued relation, resolved against the target's `via` attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToManyRelation {
    /// Identity of the target model.
    pub target: String,
    /// Name of the reciprocal attribute on the target.
    pub via: String,
    /// Whether this side claims ownership of the join table.
    pub dominant: bool,
}

/// Normalized attribute schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Plain column.
    Scalar(ScalarAttribute),
    /// Single-valued relation.
    ToOne(ToOneRelation),
    /// Many-valued relation.
    ToMany(ToManyRelation),
}

impl AttributeKind {
    /// True for relation variants.
    #[must_use]
    pub fn is_relation(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }
}

/// A named attribute on a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name as declared.
    pub name: String,
    /// Normalized schema.
    pub kind: AttributeKind,
}

/// Raw attribute forms accepted from declarations.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAttribute {
    /// Shorthand form: `"name": "string"`.
    Shorthand(String),
    /// Object form with `type`, relation keys, and modifiers.
    Spec(serde_json::Map<String, Value>),
}

impl RawAttribute {
    /// Normalizes a raw declaration into the tagged union.
    ///
    /// Legacy aliases are rewritten here, once: `allowNull` and `required`
    /// become `nullable`/`notNullable`, `primaryKey` becomes `primary`.
    /// Structural keys are consumed into the relation variants and never
    /// survive as modifiers.
    ///
    /// # Errors
    /// [`DefinitionError::MissingVia`] when a collection declaration does
    /// not name its reciprocal attribute.
    pub fn normalize(
        self,
        model: &str,
        attribute: &str,
    ) -> Result<AttributeKind, DefinitionError> {
        match self {
            Self::Shorthand(type_name) => Ok(AttributeKind::Scalar(ScalarAttribute {
                type_name,
                modifiers: Vec::new(),
            })),
            Self::Spec(map) => normalize_spec(&map, model, attribute),
        }
    }
}

fn normalize_spec(
    map: &serde_json::Map<String, Value>,
    model: &str,
    attribute: &str,
) -> Result<AttributeKind, DefinitionError> {
    if let Some(target) = map.get("model").and_then(Value::as_str) {
        return Ok(AttributeKind::ToOne(ToOneRelation {
            target: target.to_lowercase(),
            modifiers: collect_modifiers(map),
        }));
    }

    if let Some(target) = map.get("collection").and_then(Value::as_str) {
        let via = map
            .get("via")
            .and_then(Value::as_str)
            .ok_or_else(|| DefinitionError::MissingVia {
                model: model.to_string(),
                attribute: attribute.to_string(),
            })?;
        return Ok(AttributeKind::ToMany(ToManyRelation {
            target: target.to_lowercase(),
            via: via.to_string(),
            dominant: map.get("dominant").map_or(false, is_truthy),
        }));
    }

    let type_name = map
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(AttributeKind::Scalar(ScalarAttribute {
        type_name,
        modifiers: collect_modifiers(map),
    }))
}

/// Collects non-structural keys as modifiers, in declaration order.
fn collect_modifiers(map: &serde_json::Map<String, Value>) -> Vec<ModifierValue> {
    map.iter()
        .filter(|(key, _)| key.as_str() != "type" && !STRUCTURAL_KEYS.contains(&key.as_str()))
        .map(|(key, value)| normalize_modifier(key, value))
        .collect()
}

/// Rewrites legacy modifier aliases into their canonical names.
///
/// `allowNull: false` and `required: true` both mean NOT NULL; `primaryKey`
/// is the legacy spelling of `primary`. Everything else passes through
/// unchanged, including names the applier will later reject.
#[must_use]
pub fn normalize_modifier(name: &str, value: &Value) -> ModifierValue {
    match name {
        "allowNull" => {
            if is_truthy(value) {
                ModifierValue::flag("nullable")
            } else {
                ModifierValue::flag("notNullable")
            }
        }
        "required" => {
            if is_truthy(value) {
                ModifierValue::flag("notNullable")
            } else {
                ModifierValue::flag("nullable")
            }
        }
        "primaryKey" => ModifierValue::new("primary", value.clone()),
        _ => ModifierValue::new(name, value.clone()),
    }
}

/// JavaScript-style truthiness, matching how the declarations were always
/// interpreted.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> AttributeKind {
        let raw: RawAttribute = serde_json::from_value(value).expect("raw attribute");
        raw.normalize("user", "field").expect("normalized")
    }

    #[test]
    fn test_shorthand_is_scalar() {
        let kind = normalize(json!("string"));
        match kind {
            AttributeKind::Scalar(scalar) => {
                assert_eq!(scalar.type_name, "string");
                assert!(scalar.modifiers.is_empty());
            }
            other => panic!("Expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_allow_null_false_becomes_not_nullable() {
        let kind = normalize(json!({ "type": "string", "allowNull": false }));
        let AttributeKind::Scalar(scalar) = kind else {
            panic!("Expected scalar");
        };
        assert_eq!(scalar.modifiers, vec![ModifierValue::flag("notNullable")]);
    }

    #[test]
    fn test_allow_null_true_becomes_nullable() {
        let kind = normalize(json!({ "type": "string", "allowNull": true }));
        let AttributeKind::Scalar(scalar) = kind else {
            panic!("Expected scalar");
        };
        assert_eq!(scalar.modifiers, vec![ModifierValue::flag("nullable")]);
    }

    #[test]
    fn test_required_is_inverted() {
        let required = normalize(json!({ "type": "string", "required": true }));
        let AttributeKind::Scalar(scalar) = required else {
            panic!("Expected scalar");
        };
        assert_eq!(scalar.modifiers, vec![ModifierValue::flag("notNullable")]);

        let optional = normalize(json!({ "type": "string", "required": false }));
        let AttributeKind::Scalar(scalar) = optional else {
            panic!("Expected scalar");
        };
        assert_eq!(scalar.modifiers, vec![ModifierValue::flag("nullable")]);
    }

    #[test]
    fn test_primary_key_alias() {
        let kind = normalize(json!({ "type": "integer", "primaryKey": true }));
        let AttributeKind::Scalar(scalar) = kind else {
            panic!("Expected scalar");
        };
        assert_eq!(scalar.modifiers[0].name, "primary");
    }

    #[test]
    fn test_modifier_order_preserved() {
        let kind = normalize(json!({
            "type": "string",
            "defaultTo": "x",
            "unique": true,
            "index": true
        }));
        let AttributeKind::Scalar(scalar) = kind else {
            panic!("Expected scalar");
        };
        let names: Vec<&str> = scalar.modifiers.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["defaultTo", "unique", "index"]);
    }

    #[test]
    fn test_model_key_is_to_one() {
        let kind = normalize(json!({ "model": "User", "required": true }));
        let AttributeKind::ToOne(relation) = kind else {
            panic!("Expected to-one");
        };
        assert_eq!(relation.target, "user");
        assert_eq!(relation.modifiers, vec![ModifierValue::flag("notNullable")]);
    }

    #[test]
    fn test_collection_key_is_to_many() {
        let kind = normalize(json!({ "collection": "Role", "via": "users", "dominant": true }));
        let AttributeKind::ToMany(relation) = kind else {
            panic!("Expected to-many");
        };
        assert_eq!(relation.target, "role");
        assert_eq!(relation.via, "users");
        assert!(relation.dominant);
    }

    #[test]
    fn test_collection_without_via_is_rejected() {
        let raw: RawAttribute =
            serde_json::from_value(json!({ "collection": "role" })).expect("raw attribute");
        let err = raw.normalize("user", "roles").expect_err("missing via");
        assert!(
            matches!(err, DefinitionError::MissingVia { ref attribute, .. } if attribute == "roles"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_structural_keys_never_become_modifiers() {
        let kind = normalize(json!({ "collection": "role", "via": "users", "dominant": false }));
        let AttributeKind::ToMany(relation) = kind else {
            panic!("Expected to-many");
        };
        assert!(!relation.dominant);
    }

    #[test]
    fn test_unknown_modifier_passes_through() {
        let kind = normalize(json!({ "type": "string", "sparkles": true }));
        let AttributeKind::Scalar(scalar) = kind else {
            panic!("Expected scalar");
        };
        assert_eq!(scalar.modifiers[0].name, "sparkles");
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }
}

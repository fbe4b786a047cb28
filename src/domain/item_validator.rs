/// アイテム入力のバリデーション
///
/// リクエストボディのパース、名前の検証、アイテムIDの検証を行う。
use serde_json::Value;
use thiserror::Error;

use super::item::{is_reserved, ItemAttributes, ItemId, MAX_KEY_BYTES, NAME_KEY_PREFIX};
use super::item_limits::ItemLimits;

/// 入力バリデーションエラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// ボディが空、または属性を1つも含まない
    #[error("Item data is required")]
    MissingBody,
    /// ボディがJSONとしてパースできない
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),
    /// ボディがJSONオブジェクトでない
    #[error("Item data must be a JSON object")]
    NotAnObject,
    /// 名前が欠落、または空
    #[error("Name is required")]
    MissingName,
    /// 名前が文字列でない
    #[error("Name must be a string")]
    NameNotString,
    /// 名前が長すぎる
    #[error("Name must be at most {max} characters")]
    NameTooLong { max: usize },
    /// 名前のUTF-8バイト数がキーの上限を超える
    #[error("Name must be at most {max_bytes} bytes in UTF-8")]
    NameKeyTooLong { max_bytes: usize },
    /// アイテムIDが欠落、または空
    #[error("Item ID is required")]
    MissingItemId,
    /// アイテムIDのUTF-8バイト数がキーの上限を超える
    #[error("Item ID must be at most {max_bytes} bytes in UTF-8")]
    ItemIdTooLong { max_bytes: usize },
    /// 属性名が空文字列
    #[error("Attribute names must not be empty")]
    EmptyAttributeName,
}

/// Upsertリクエストのパース結果
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertRequest {
    /// 名前（未検証、トリム前）
    pub name: String,
    /// 任意属性（サーバー管理キーを除いたもの）
    pub attributes: ItemAttributes,
    /// 無視したサーバー管理キー
    pub ignored_keys: Vec<String>,
}

/// アイテム入力のバリデータ
pub struct ItemValidator;

impl ItemValidator {
    /// 名前を検証し、前後の空白を除いた名前を返す
    ///
    /// 空白のみの名前は空とみなす。長さは文字数で数え、さらに
    /// 名前予約キー（`name#`接頭辞込み）がキーのバイト数上限に収まることを確認する。
    pub fn validate_name(name: &str, limits: &ItemLimits) -> Result<String, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if trimmed.chars().count() > limits.max_name_length {
            return Err(ValidationError::NameTooLong {
                max: limits.max_name_length,
            });
        }
        let max_bytes = Self::max_name_bytes();
        if trimmed.len() > max_bytes {
            return Err(ValidationError::NameKeyTooLong { max_bytes });
        }
        Ok(trimmed.to_string())
    }

    /// 名前に使えるUTF-8バイト数の上限
    pub fn max_name_bytes() -> usize {
        MAX_KEY_BYTES - NAME_KEY_PREFIX.len()
    }

    /// アイテムIDを検証
    pub fn validate_item_id(id: &str) -> Result<ItemId, ValidationError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingItemId);
        }
        if trimmed.len() > MAX_KEY_BYTES {
            return Err(ValidationError::ItemIdTooLong {
                max_bytes: MAX_KEY_BYTES,
            });
        }
        Ok(ItemId::new(trimmed))
    }

    /// サーバー管理キーを取り除いた属性マップを返す
    pub fn sanitize_attributes(attributes: ItemAttributes) -> ItemAttributes {
        attributes
            .into_iter()
            .filter(|(key, _)| !is_reserved(key))
            .collect()
    }

    /// 属性マップを検証し、サーバー管理キーを取り除いて返す
    pub fn validate_attributes(attributes: ItemAttributes) -> Result<ItemAttributes, ValidationError> {
        if attributes.contains_key("") {
            return Err(ValidationError::EmptyAttributeName);
        }
        Ok(Self::sanitize_attributes(attributes))
    }

    /// Create/UpdateリクエストのボディをパースしてUpsertRequestを返す
    ///
    /// # 処理フロー
    /// 1. 空ボディ、JSONでないボディ、オブジェクトでないボディを拒否
    /// 2. `name`を取り出す（文字列以外は拒否）
    /// 3. 空の属性名を拒否する
    /// 4. 残りのキーのうちサーバー管理キーを`ignored_keys`に振り分ける
    pub fn parse_upsert_body(body: &str) -> Result<UpsertRequest, ValidationError> {
        if body.trim().is_empty() {
            return Err(ValidationError::MissingBody);
        }

        let value: Value =
            serde_json::from_str(body).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;

        let mut object = match value {
            Value::Object(object) => object,
            _ => return Err(ValidationError::NotAnObject),
        };

        if object.is_empty() {
            return Err(ValidationError::MissingBody);
        }

        let name = match object.remove("name") {
            None | Some(Value::Null) => return Err(ValidationError::MissingName),
            Some(Value::String(name)) => name,
            Some(_) => return Err(ValidationError::NameNotString),
        };

        let mut attributes = ItemAttributes::new();
        let mut ignored_keys = Vec::new();
        for (key, value) in object {
            if key.is_empty() {
                return Err(ValidationError::EmptyAttributeName);
            }
            if is_reserved(&key) {
                ignored_keys.push(key);
            } else {
                attributes.insert(key, value);
            }
        }

        Ok(UpsertRequest {
            name,
            attributes,
            ignored_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_name_trims() {
        let limits = ItemLimits::default();
        assert_eq!(
            ItemValidator::validate_name("  widget ", &limits),
            Ok("widget".to_string())
        );
    }

    #[test]
    fn test_validate_name_rejects_empty_and_blank() {
        let limits = ItemLimits::default();
        assert_eq!(
            ItemValidator::validate_name("", &limits),
            Err(ValidationError::MissingName)
        );
        assert_eq!(
            ItemValidator::validate_name(" \t\n", &limits),
            Err(ValidationError::MissingName)
        );
    }

    #[test]
    fn test_validate_name_character_limit() {
        let limits = ItemLimits {
            max_name_length: 3,
            ..ItemLimits::default()
        };

        assert!(ItemValidator::validate_name("あいう", &limits).is_ok());
        assert_eq!(
            ItemValidator::validate_name("abcd", &limits),
            Err(ValidationError::NameTooLong { max: 3 })
        );
    }

    #[test]
    fn test_max_name_bytes_leaves_room_for_prefix() {
        assert_eq!(ItemValidator::max_name_bytes(), 2043);
    }

    // 文字数上限内でもマルチバイト文字で名前予約キーが上限を超える場合は拒否
    #[test]
    fn test_validate_name_rejects_multibyte_name_over_key_limit() {
        let limits = ItemLimits::default();

        let name = "あ".repeat(1024);
        assert_eq!(
            ItemValidator::validate_name(&name, &limits),
            Err(ValidationError::NameKeyTooLong { max_bytes: 2043 })
        );

        // 681文字 x 3バイト = 2043バイトはちょうど上限
        let boundary = "あ".repeat(681);
        let accepted = ItemValidator::validate_name(&boundary, &limits).unwrap();
        assert_eq!(format!("name#{}", accepted).len(), 2048);

        let over = "あ".repeat(682);
        assert_eq!(
            ItemValidator::validate_name(&over, &limits),
            Err(ValidationError::NameKeyTooLong { max_bytes: 2043 })
        );
    }

    #[test]
    fn test_validate_name_byte_limit_applies_with_large_character_limit() {
        let limits = ItemLimits {
            max_name_length: 4096,
            ..ItemLimits::default()
        };

        assert!(ItemValidator::validate_name(&"a".repeat(2043), &limits).is_ok());
        assert_eq!(
            ItemValidator::validate_name(&"a".repeat(2044), &limits),
            Err(ValidationError::NameKeyTooLong { max_bytes: 2043 })
        );
    }

    #[test]
    fn test_validate_item_id() {
        assert_eq!(
            ItemValidator::validate_item_id(" abc "),
            Ok(ItemId::new("abc"))
        );
        assert_eq!(
            ItemValidator::validate_item_id("  "),
            Err(ValidationError::MissingItemId)
        );
        assert!(ItemValidator::validate_item_id(&"x".repeat(2048)).is_ok());
        assert_eq!(
            ItemValidator::validate_item_id(&"x".repeat(2049)),
            Err(ValidationError::ItemIdTooLong { max_bytes: 2048 })
        );
    }

    #[test]
    fn test_sanitize_attributes_removes_reserved_keys() {
        let attributes = json!({"id": "x", "updated_at": "y", "color": "red"})
            .as_object()
            .unwrap()
            .clone();

        let sanitized = ItemValidator::sanitize_attributes(attributes);

        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized["color"], "red");
    }

    #[test]
    fn test_validate_attributes() {
        let attributes = json!({"id": "x", "color": "red"}).as_object().unwrap().clone();
        let validated = ItemValidator::validate_attributes(attributes).unwrap();
        assert_eq!(validated.len(), 1);

        let attributes = json!({"": 1, "color": "red"}).as_object().unwrap().clone();
        assert_eq!(
            ItemValidator::validate_attributes(attributes),
            Err(ValidationError::EmptyAttributeName)
        );
    }

    #[test]
    fn test_parse_upsert_body_success() {
        let request =
            ItemValidator::parse_upsert_body(r#"{"name":"widget","color":"red","size":3}"#).unwrap();

        assert_eq!(request.name, "widget");
        assert_eq!(request.attributes.len(), 2);
        assert_eq!(request.attributes["color"], "red");
        assert!(request.ignored_keys.is_empty());
    }

    // listで取得したアイテムをそのまま送り返してもサーバー管理キーは無視される
    #[test]
    fn test_parse_upsert_body_ignores_server_managed_keys() {
        let request = ItemValidator::parse_upsert_body(
            r#"{"id":"abc","name":"widget","created_at":"2024-01-01T00:00:00Z","color":"red"}"#,
        )
        .unwrap();

        assert_eq!(request.attributes.len(), 1);
        assert_eq!(request.ignored_keys.len(), 2);
        assert!(request.ignored_keys.contains(&"id".to_string()));
        assert!(request.ignored_keys.contains(&"created_at".to_string()));
    }

    #[test]
    fn test_parse_upsert_body_errors() {
        assert_eq!(
            ItemValidator::parse_upsert_body(""),
            Err(ValidationError::MissingBody)
        );
        assert_eq!(
            ItemValidator::parse_upsert_body("{}"),
            Err(ValidationError::MissingBody)
        );
        assert_eq!(
            ItemValidator::parse_upsert_body("[1,2]"),
            Err(ValidationError::NotAnObject)
        );
        assert_eq!(
            ItemValidator::parse_upsert_body(r#"{"color":"red"}"#),
            Err(ValidationError::MissingName)
        );
        assert_eq!(
            ItemValidator::parse_upsert_body(r#"{"name":null}"#),
            Err(ValidationError::MissingName)
        );
        assert_eq!(
            ItemValidator::parse_upsert_body(r#"{"name":42}"#),
            Err(ValidationError::NameNotString)
        );
        assert!(matches!(
            ItemValidator::parse_upsert_body("{not json"),
            Err(ValidationError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_upsert_body_rejects_empty_attribute_name() {
        assert_eq!(
            ItemValidator::parse_upsert_body(r#"{"name":"widget","":1}"#),
            Err(ValidationError::EmptyAttributeName)
        );
        // 空白だけの属性名は有効なキーとして扱う
        assert!(ItemValidator::parse_upsert_body(r#"{"name":"widget"," ":1}"#).is_ok());
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(ValidationError::MissingName.to_string(), "Name is required");
        assert_eq!(ValidationError::MissingBody.to_string(), "Item data is required");
        assert_eq!(ValidationError::MissingItemId.to_string(), "Item ID is required");
        assert_eq!(
            ValidationError::NameTooLong { max: 10 }.to_string(),
            "Name must be at most 10 characters"
        );
        assert_eq!(
            ValidationError::NameKeyTooLong { max_bytes: 2043 }.to_string(),
            "Name must be at most 2043 bytes in UTF-8"
        );
        assert_eq!(
            ValidationError::EmptyAttributeName.to_string(),
            "Attribute names must not be empty"
        );
    }
}

/// アイテムのドメインモデル
///
/// サービスが管理する永続化レコード。`id`・`name`・タイムスタンプは
/// サーバー管理フィールドで、それ以外は任意属性としてそのまま保持する。
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 任意属性のマップ（JSONオブジェクト）
pub type ItemAttributes = Map<String, Value>;

/// サーバー管理のキー（任意属性として受け付けない）
pub const RESERVED_ATTRIBUTES: [&str; 5] = ["id", "name", "created_at", "updated_at", "record_type"];

/// 名前予約レコードのキー接頭辞
pub const NAME_KEY_PREFIX: &str = "name#";

/// ストアのパーティションキーの最大バイト数（UTF-8）
pub const MAX_KEY_BYTES: usize = 2048;

/// 名前予約レコードのキーを生成
pub fn name_key(name: &str) -> String {
    format!("{}{}", NAME_KEY_PREFIX, name)
}

/// アイテムID
///
/// 作成時にサービスが生成する不透明な識別子。作成後は変更されない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// 文字列からItemIdを作成
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 文字列としての参照を取得
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// アイテム
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// アイテムID
    pub id: ItemId,
    /// 一意な名前
    pub name: String,
    /// 作成日時（作成後は不変）
    #[serde(with = "rfc3339_micros")]
    pub created_at: DateTime<Utc>,
    /// 最終更新日時
    #[serde(with = "rfc3339_micros")]
    pub updated_at: DateTime<Utc>,
    /// 任意属性
    #[serde(flatten)]
    pub attributes: ItemAttributes,
}

impl Item {
    /// 新規アイテムを作成
    ///
    /// `created_at`と`updated_at`はともに`now`に設定される。
    /// 値が`null`の属性は保存しない。
    pub fn create(id: ItemId, name: String, attributes: ItemAttributes, now: DateTime<Utc>) -> Self {
        let attributes = attributes
            .into_iter()
            .filter(|(key, value)| !value.is_null() && !is_reserved(key))
            .collect();

        Self {
            id,
            name,
            created_at: now,
            updated_at: now,
            attributes,
        }
    }

    /// 属性をマージした更新後のアイテムを返す
    ///
    /// - `null`の属性は既存の属性を削除
    /// - それ以外の値は上書き
    /// - 指定されなかった属性はそのまま残す
    ///
    /// `updated_at`は必ず前回値より大きくなる。時計が進んでいない場合は
    /// 前回値に1マイクロ秒を加えた値を使う。
    pub fn merged(&self, attributes: ItemAttributes, now: DateTime<Utc>) -> Self {
        let mut merged = self.attributes.clone();
        for (key, value) in attributes {
            if is_reserved(&key) {
                continue;
            }
            if value.is_null() {
                merged.remove(&key);
            } else {
                merged.insert(key, value);
            }
        }

        let minimum = self.updated_at + Duration::microseconds(1);
        let updated_at = if now > self.updated_at { now } else { minimum };

        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at,
            attributes: merged,
        }
    }
}

/// サーバー管理キーかどうか
pub fn is_reserved(key: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&key)
}

/// タイムスタンプをRFC 3339文字列（マイクロ秒精度、Z表記）に変換
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// RFC 3339文字列をタイムスタンプに変換
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

mod rfc3339_micros {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(timestamp))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_timestamp(&value).map_err(serde::de::Error::custom)
    }
}

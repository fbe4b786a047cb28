/// DynamoDBでアイテムを管理するためのアイテムリポジトリ
///
/// アイテムテーブルには2種類のレコードを`record_type`で区別して保存する:
/// - `item`: アイテム本体（パーティションキー`id`）
/// - `name_guard`: 名前予約レコード（`id = "name#<name>"`、`item_id`で本体を指す）
///
/// 名前予約レコードを主キーにすることで、名前による強整合な検索と
/// 名前の一意性を保証する条件付き書き込みが可能になる。
use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, Select, TransactWriteItem};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::{format_timestamp, name_key, parse_timestamp, Item, ItemAttributes, ItemId};

/// リポジトリ操作のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    /// 条件付き書き込みの条件を満たさなかった（競合）
    #[error("Conditional check failed")]
    ConditionFailed,

    /// DynamoDBからの読み取りに失敗
    #[error("Read error: {0}")]
    ReadError(String),

    /// DynamoDBへの書き込みに失敗
    #[error("Write error: {0}")]
    WriteError(String),

    /// データのシリアライズ/デシリアライズに失敗
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// 書き込み条件
#[derive(Debug, Clone, PartialEq)]
pub enum PutCondition {
    /// 新規作成: 同じIDのアイテムも同じ名前のアイテムも存在しないこと
    Create,
    /// 置換: アイテムが存在し、名前と`updated_at`が読み取り時から変わっていないこと
    Replace {
        /// 読み取り時点の`updated_at`
        expected_updated_at: DateTime<Utc>,
    },
}

/// アイテム永続化用トレイト
///
/// 実際のDynamoDBとテスト用モックを差し替え可能にする。
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// 名前でアイテムを取得
    async fn get_by_name(&self, name: &str) -> Result<Option<Item>, RepositoryError>;

    /// IDでアイテムを取得
    async fn get_by_id(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError>;

    /// アイテムを条件付きで保存
    ///
    /// # 戻り値
    /// * 成功時は`Ok(())`
    /// * 条件を満たさない場合は`Err(RepositoryError::ConditionFailed)`
    async fn put(&self, item: &Item, condition: PutCondition) -> Result<(), RepositoryError>;

    /// 全アイテムを取得（ストア定義順）
    async fn scan_all(&self) -> Result<Vec<Item>, RepositoryError>;

    /// アイテムを削除
    ///
    /// # 戻り値
    /// * 削除した場合は`Ok(true)`
    /// * 対象が存在しなかった場合は`Ok(false)`
    async fn delete(&self, id: &ItemId) -> Result<bool, RepositoryError>;

    /// アイテムを参照している依存レコードの件数
    async fn count_dependents(&self, id: &ItemId) -> Result<u64, RepositoryError>;
}

/// アイテム本体のrecord_type値
const RECORD_TYPE_ITEM: &str = "item";

/// 名前予約レコードのrecord_type値
const RECORD_TYPE_NAME_GUARD: &str = "name_guard";

/// ItemRepositoryのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoItemRepository {
    /// DynamoDBクライアント
    client: DynamoDbClient,
    /// アイテムテーブル名
    table_name: String,
    /// 参照テーブル名（パーティションキー`item_id`、ソートキー`referrer_id`）
    references_table: Option<String>,
}

impl DynamoItemRepository {
    /// 新しいDynamoItemRepositoryを作成
    ///
    /// # 引数
    /// * `client` - DynamoDBクライアント
    /// * `table_name` - アイテムテーブルの名前
    /// * `references_table` - 参照テーブルの名前（未設定なら依存件数は常に0）
    pub fn new(client: DynamoDbClient, table_name: String, references_table: Option<String>) -> Self {
        Self {
            client,
            table_name,
            references_table,
        }
    }

    /// アイテムをDynamoDBの属性マップに変換
    ///
    /// 任意属性はserde_dynamoでネイティブなDynamoDB型に変換する。
    fn to_attribute_map(item: &Item) -> Result<HashMap<String, AttributeValue>, RepositoryError> {
        let mut map = HashMap::new();

        for (key, value) in &item.attributes {
            let attribute: AttributeValue = serde_dynamo::to_attribute_value(value)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
            map.insert(key.clone(), attribute);
        }

        map.insert("id".to_string(), AttributeValue::S(item.id.to_string()));
        map.insert(
            "record_type".to_string(),
            AttributeValue::S(RECORD_TYPE_ITEM.to_string()),
        );
        map.insert("name".to_string(), AttributeValue::S(item.name.clone()));
        map.insert(
            "created_at".to_string(),
            AttributeValue::S(format_timestamp(&item.created_at)),
        );
        map.insert(
            "updated_at".to_string(),
            AttributeValue::S(format_timestamp(&item.updated_at)),
        );

        Ok(map)
    }

    /// DynamoDBの属性マップをアイテムに変換
    ///
    /// アイテム本体以外のレコード（名前予約レコード等）は`Ok(None)`を返す。
    fn from_attribute_map(
        mut map: HashMap<String, AttributeValue>,
    ) -> Result<Option<Item>, RepositoryError> {
        match map.remove("record_type") {
            Some(AttributeValue::S(record_type)) if record_type == RECORD_TYPE_ITEM => {}
            _ => return Ok(None),
        }

        let id = take_string(&mut map, "id")?;
        let name = take_string(&mut map, "name")?;
        let created_at = take_timestamp(&mut map, "created_at")?;
        let updated_at = take_timestamp(&mut map, "updated_at")?;

        let mut attributes = ItemAttributes::new();
        for (key, attribute) in map {
            let value: Value = serde_dynamo::from_attribute_value(attribute)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
            attributes.insert(key, value);
        }

        Ok(Some(Item {
            id: ItemId::new(id),
            name,
            created_at,
            updated_at,
            attributes,
        }))
    }

    /// 名前予約レコードの属性マップを構築
    fn build_name_guard(item: &Item) -> HashMap<String, AttributeValue> {
        let mut map = HashMap::new();
        map.insert(
            "id".to_string(),
            AttributeValue::S(name_key(&item.name)),
        );
        map.insert(
            "record_type".to_string(),
            AttributeValue::S(RECORD_TYPE_NAME_GUARD.to_string()),
        );
        map.insert("item_id".to_string(), AttributeValue::S(item.id.to_string()));
        map
    }

    /// トランザクションのキャンセル理由に条件チェック失敗が含まれるか
    fn is_conditional_check_failure(message: &str) -> bool {
        message.contains("ConditionalCheckFailed")
    }

    /// 主キーでレコードを強整合読み取り
    async fn get_record(
        &self,
        key: &str,
    ) -> Result<Option<HashMap<String, AttributeValue>>, RepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(key.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| RepositoryError::ReadError(e.into_service_error().to_string()))?;

        Ok(result.item)
    }

    /// 名前予約レコードとアイテム本体をトランザクションで作成
    async fn put_new(&self, item: &Item) -> Result<(), RepositoryError> {
        let put_guard = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(Self::build_name_guard(item)))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(|e| RepositoryError::WriteError(e.to_string()))?;

        let put_item = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(Self::to_attribute_map(item)?))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(|e| RepositoryError::WriteError(e.to_string()))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(put_guard).build())
            .transact_items(TransactWriteItem::builder().put(put_item).build())
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_error = err.into_service_error();
                // TransactionCanceledExceptionの中にConditionalCheckFailedが含まれているか確認
                if Self::is_conditional_check_failure(&service_error.to_string()) {
                    return Err(RepositoryError::ConditionFailed);
                }
                Err(RepositoryError::WriteError(service_error.to_string()))
            }
        }
    }

    /// 既存アイテムを楽観ロック付きで置換
    async fn put_replace(
        &self,
        item: &Item,
        expected_updated_at: &DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(Self::to_attribute_map(item)?))
            .condition_expression(
                "attribute_exists(id) AND #name = :name AND updated_at = :expected_updated_at",
            )
            .expression_attribute_names("#name", "name")
            .expression_attribute_values(":name", AttributeValue::S(item.name.clone()))
            .expression_attribute_values(
                ":expected_updated_at",
                AttributeValue::S(format_timestamp(expected_updated_at)),
            )
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    return Err(RepositoryError::ConditionFailed);
                }
                Err(RepositoryError::WriteError(service_error.to_string()))
            }
        }
    }
}

#[async_trait]
impl ItemRepository for DynamoItemRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<Item>, RepositoryError> {
        let Some(guard) = self.get_record(&name_key(name)).await? else {
            return Ok(None);
        };

        let item_id = match guard.get("item_id") {
            Some(AttributeValue::S(item_id)) => ItemId::new(item_id.clone()),
            _ => {
                return Err(RepositoryError::SerializationError(
                    "Missing item_id field".to_string(),
                ));
            }
        };

        // 予約レコードが指すアイテムが消えている、または別名になっている場合は不在扱い
        Ok(self
            .get_by_id(&item_id)
            .await?
            .filter(|item| item.name == name))
    }

    async fn get_by_id(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        match self.get_record(id.as_str()).await? {
            Some(record) => Self::from_attribute_map(record),
            None => Ok(None),
        }
    }

    async fn put(&self, item: &Item, condition: PutCondition) -> Result<(), RepositoryError> {
        match condition {
            PutCondition::Create => self.put_new(item).await,
            PutCondition::Replace {
                expected_updated_at,
            } => self.put_replace(item, &expected_updated_at).await,
        }
    }

    async fn scan_all(&self) -> Result<Vec<Item>, RepositoryError> {
        let mut items = Vec::new();
        let mut last_evaluated_key = None;

        // ページネーション: LastEvaluatedKeyがある限りスキャンを続ける
        loop {
            let mut scan_builder = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("#record_type = :record_type")
                .expression_attribute_names("#record_type", "record_type")
                .expression_attribute_values(
                    ":record_type",
                    AttributeValue::S(RECORD_TYPE_ITEM.to_string()),
                );

            if let Some(key) = last_evaluated_key.take() {
                scan_builder = scan_builder.set_exclusive_start_key(Some(key));
            }

            let result = scan_builder
                .send()
                .await
                .map_err(|e| RepositoryError::ReadError(e.into_service_error().to_string()))?;

            for record in result.items.unwrap_or_default() {
                if let Some(item) = Self::from_attribute_map(record)? {
                    items.push(item);
                }
            }

            match result.last_evaluated_key {
                Some(key) => last_evaluated_key = Some(key),
                None => break,
            }
        }

        Ok(items)
    }

    async fn delete(&self, id: &ItemId) -> Result<bool, RepositoryError> {
        // 名前予約レコードを消すために名前が必要
        let Some(item) = self.get_by_id(id).await? else {
            return Ok(false);
        };

        let delete_item = Delete::builder()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .condition_expression("attribute_exists(id)")
            .build()
            .map_err(|e| RepositoryError::WriteError(e.to_string()))?;

        let delete_guard = Delete::builder()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(name_key(&item.name)))
            .condition_expression("attribute_not_exists(id) OR item_id = :item_id")
            .expression_attribute_values(":item_id", AttributeValue::S(id.to_string()))
            .build()
            .map_err(|e| RepositoryError::WriteError(e.to_string()))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().delete(delete_item).build())
            .transact_items(TransactWriteItem::builder().delete(delete_guard).build())
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_error = err.into_service_error();
                if Self::is_conditional_check_failure(&service_error.to_string()) {
                    return Ok(false);
                }
                Err(RepositoryError::WriteError(service_error.to_string()))
            }
        }
    }

    async fn count_dependents(&self, id: &ItemId) -> Result<u64, RepositoryError> {
        let Some(references_table) = &self.references_table else {
            return Ok(0);
        };

        let mut total = 0u64;
        let mut last_evaluated_key = None;

        loop {
            let mut query_builder = self
                .client
                .query()
                .table_name(references_table)
                .key_condition_expression("item_id = :item_id")
                .expression_attribute_values(":item_id", AttributeValue::S(id.to_string()))
                .select(Select::Count);

            if let Some(key) = last_evaluated_key.take() {
                query_builder = query_builder.set_exclusive_start_key(Some(key));
            }

            let result = query_builder
                .send()
                .await
                .map_err(|e| RepositoryError::ReadError(e.into_service_error().to_string()))?;

            total += result.count.max(0) as u64;

            match result.last_evaluated_key {
                Some(key) => last_evaluated_key = Some(key),
                None => break,
            }
        }

        Ok(total)
    }
}

/// 文字列属性を取り出す
fn take_string(
    map: &mut HashMap<String, AttributeValue>,
    key: &str,
) -> Result<String, RepositoryError> {
    match map.remove(key) {
        Some(AttributeValue::S(value)) => Ok(value),
        _ => Err(RepositoryError::SerializationError(format!(
            "Missing {} field",
            key
        ))),
    }
}

/// タイムスタンプ属性を取り出す
fn take_timestamp(
    map: &mut HashMap<String, AttributeValue>,
    key: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let value = take_string(map, key)?;
    parse_timestamp(&value)
        .map_err(|e| RepositoryError::SerializationError(format!("Invalid {}: {}", key, e)))
}

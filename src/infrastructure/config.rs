/// DynamoDB接続設定
use aws_sdk_dynamodb::Client as DynamoDbClient;
use thiserror::Error;

/// 環境変数名: アイテムテーブル
pub const ENV_TABLE_NAME: &str = "TABLE_NAME";

/// 環境変数名: 参照テーブル（任意）
pub const ENV_REFERENCES_TABLE: &str = "REFERENCES_TABLE";

/// DynamoDB設定のエラー型
#[derive(Debug, Error)]
pub enum DynamoDbConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// テーブル名とクライアントを持つDynamoDB設定
///
/// テーブル名は以下の環境変数で設定:
/// - TABLE_NAME: アイテム保存用テーブル（必須）
/// - REFERENCES_TABLE: アイテムへの参照を保持するテーブル（任意）
#[derive(Debug, Clone)]
pub struct DynamoDbConfig {
    /// DynamoDBクライアントインスタンス
    client: DynamoDbClient,
    /// アイテムテーブル名
    items_table: String,
    /// 参照テーブル名
    references_table: Option<String>,
}

impl DynamoDbConfig {
    /// 環境からAWS設定を読み込み、環境変数からテーブル名を読み取って新しいDynamoDbConfigを作成
    pub async fn from_env() -> Result<Self, DynamoDbConfigError> {
        // 環境からAWS設定を読み込み（認証情報、リージョンなど）
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = DynamoDbClient::new(&aws_config);

        let (items_table, references_table) = read_table_names(ENV_TABLE_NAME, ENV_REFERENCES_TABLE)?;

        Ok(Self {
            client,
            items_table,
            references_table,
        })
    }

    /// 明示的な値で新しいDynamoDbConfigを作成（テスト用）
    pub fn new(client: DynamoDbClient, items_table: String, references_table: Option<String>) -> Self {
        Self {
            client,
            items_table,
            references_table,
        }
    }

    /// DynamoDBクライアントへの参照を取得
    pub fn client(&self) -> &DynamoDbClient {
        &self.client
    }

    /// アイテムテーブル名を取得
    pub fn items_table(&self) -> &str {
        &self.items_table
    }

    /// 参照テーブル名を取得
    pub fn references_table(&self) -> Option<&str> {
        self.references_table.as_deref()
    }
}

/// 環境変数からテーブル名を読み込む
///
/// 参照テーブルは未設定または空文字列の場合`None`になる。
fn read_table_names(
    items_var: &str,
    references_var: &str,
) -> Result<(String, Option<String>), DynamoDbConfigError> {
    let items_table = std::env::var(items_var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| DynamoDbConfigError::MissingEnvVar(ENV_TABLE_NAME.to_string()))?;

    let references_table = std::env::var(references_var)
        .ok()
        .filter(|value| !value.trim().is_empty());

    Ok((items_table, references_table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    unsafe fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    // 他のテストとの競合を避けるためユニークな環境変数名を使用
    const ITEMS_VAR: &str = "TEST_CONFIG_TABLE_NAME";
    const REFERENCES_VAR: &str = "TEST_CONFIG_REFERENCES_TABLE";

    unsafe fn cleanup() {
        unsafe {
            remove_env(ITEMS_VAR);
            remove_env(REFERENCES_VAR);
        }
    }

    #[test]
    fn test_missing_env_var_error_display() {
        let error = DynamoDbConfigError::MissingEnvVar("TABLE_NAME".to_string());
        assert_eq!(error.to_string(), "Missing environment variable: TABLE_NAME");
    }

    #[tokio::test]
    async fn test_dynamodb_config_getters() {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = DynamoDbClient::new(&aws_config);

        let config = DynamoDbConfig::new(
            client,
            "ItemsTable".to_string(),
            Some("ItemReferencesTable".to_string()),
        );

        assert_eq!(config.items_table(), "ItemsTable");
        assert_eq!(config.references_table(), Some("ItemReferencesTable"));
        let _client_ref = config.client();
    }

    #[test]
    #[serial(item_env)]
    fn test_read_table_names_missing_items_table() {
        unsafe {
            cleanup();
            set_env(REFERENCES_VAR, "refs");
        }

        match read_table_names(ITEMS_VAR, REFERENCES_VAR) {
            Err(DynamoDbConfigError::MissingEnvVar(var)) => assert_eq!(var, "TABLE_NAME"),
            Ok(_) => panic!("TABLE_NAMEが未設定ならエラーになるべき"),
        }

        unsafe { cleanup() };
    }

    #[test]
    #[serial(item_env)]
    fn test_read_table_names_without_references_table() {
        unsafe {
            cleanup();
            set_env(ITEMS_VAR, "ItemsTable");
            set_env(REFERENCES_VAR, "  ");
        }

        let (items_table, references_table) = read_table_names(ITEMS_VAR, REFERENCES_VAR).unwrap();
        assert_eq!(items_table, "ItemsTable");
        assert!(references_table.is_none());

        unsafe { cleanup() };
    }

    #[test]
    #[serial(item_env)]
    fn test_read_table_names_all_set() {
        unsafe {
            cleanup();
            set_env(ITEMS_VAR, "ItemsTable");
            set_env(REFERENCES_VAR, "ItemReferencesTable");
        }

        let (items_table, references_table) = read_table_names(ITEMS_VAR, REFERENCES_VAR).unwrap();
        assert_eq!(items_table, "ItemsTable");
        assert_eq!(references_table.as_deref(), Some("ItemReferencesTable"));

        unsafe { cleanup() };
    }
}

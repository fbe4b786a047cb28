// ドメイン層
pub mod domain;

// アプリケーション層
pub mod application;

// インフラストラクチャ層
pub mod infrastructure;

use application::ItemService;
use domain::ItemLimits;
use infrastructure::{DynamoDbConfig, DynamoDbConfigError, DynamoItemRepository};

/// 環境変数からDynamoDB実装のItemServiceを構築
///
/// 各Lambdaエントリポイントのwarm start用に一度だけ呼び出す。
pub async fn build_item_service() -> Result<ItemService<DynamoItemRepository>, DynamoDbConfigError> {
    let config = DynamoDbConfig::from_env().await?;
    let repository = DynamoItemRepository::new(
        config.client().clone(),
        config.items_table().to_string(),
        config.references_table().map(str::to_string),
    );

    Ok(ItemService::new(repository, ItemLimits::from_env()))
}

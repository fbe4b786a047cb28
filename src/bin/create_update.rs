/// Create/Update HTTP Lambdaエントリポイント
///
/// API Gateway経由の`POST /items/create`を処理し、
/// 名前をキーにアイテムを作成または更新する。
use std::sync::Arc;

use item_service::application::{ApiResponse, CreateUpdateHandler, ItemService};
use item_service::build_item_service;
use item_service::infrastructure::{init_logging, DynamoItemRepository, StageConfig};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use tokio::sync::OnceCell;
use tracing::{error, info};

/// ItemServiceの静的インスタンス
///
/// Lambda warm start時にDynamoDBクライアントを再利用する。
static ITEM_SERVICE: OnceCell<Arc<ItemService<DynamoItemRepository>>> = OnceCell::const_new();

#[tokio::main]
async fn main() -> Result<(), Error> {
    let stage_config = StageConfig::from_env();
    init_logging(&stage_config.log_level);

    info!(stage = %stage_config.stage, "Create/Update Lambda関数を初期化");

    run(service_fn(handler)).await
}

/// HTTPリクエストハンドラー
async fn handler(request: Request) -> Result<Response<Body>, Error> {
    let service = match ITEM_SERVICE
        .get_or_try_init(|| async { build_item_service().await.map(Arc::new) })
        .await
    {
        Ok(service) => service.clone(),
        Err(err) => {
            error!(error = %err, "設定の読み込みに失敗");
            return Ok(ApiResponse::internal_error(err.to_string()));
        }
    };

    Ok(CreateUpdateHandler::new(service).handle(&request).await)
}

/// Create/Updateハンドラー
///
/// `POST /items/create`のリクエストボディを解釈し、名前をキーに
/// アイテムを作成または更新する。
use std::sync::Arc;

use lambda_http::http::StatusCode;
use lambda_http::{Body, Request, Response};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::api_response::ApiResponse;
use super::item_service::{ItemService, ItemServiceError, UpsertOutcome};
use crate::domain::{ItemValidator, ValidationError};
use crate::infrastructure::ItemRepository;

/// Create/Updateリクエストを処理するハンドラー
pub struct CreateUpdateHandler<R>
where
    R: ItemRepository,
{
    /// アイテムサービス
    service: Arc<ItemService<R>>,
}

impl<R> CreateUpdateHandler<R>
where
    R: ItemRepository,
{
    /// 新しいCreateUpdateHandlerを作成
    pub fn new(service: Arc<ItemService<R>>) -> Self {
        Self { service }
    }

    /// リクエストを処理してレスポンスを生成
    ///
    /// # 戻り値
    /// - 201 Created: 新規作成
    /// - 200 OK: 既存アイテムを更新
    /// - 400 / 409 / 503: サービスエラー（`ApiResponse::from_service_error`参照）
    pub async fn handle(&self, request: &Request) -> Response<Body> {
        let result = match body_text(request.body()) {
            Ok(body) => self.upsert(&body).await,
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(response) => response,
            Err(err) => {
                log_failure(&err);
                ApiResponse::from_service_error(&err)
            }
        }
    }

    async fn upsert(&self, body: &str) -> Result<Response<Body>, ItemServiceError> {
        let request = ItemValidator::parse_upsert_body(body)?;

        if !request.ignored_keys.is_empty() {
            debug!(
                ignored_keys = ?request.ignored_keys,
                "サーバー管理キーを無視"
            );
        }

        let result = self.service.upsert(&request.name, request.attributes).await?;

        let (status, message) = match result.outcome {
            UpsertOutcome::Created => (StatusCode::CREATED, "Item created successfully"),
            UpsertOutcome::Updated => (StatusCode::OK, "Item updated successfully"),
        };

        info!(
            item_id = %result.item.id,
            name = %result.item.name,
            outcome = ?result.outcome,
            "アイテムを保存"
        );

        Ok(ApiResponse::json(
            status,
            &json!({
                "message": message,
                "item": result.item,
            }),
        ))
    }
}

/// リクエストボディを文字列として取り出す
fn body_text(body: &Body) -> Result<String, ValidationError> {
    match body {
        Body::Text(text) => Ok(text.clone()),
        Body::Binary(bytes) => String::from_utf8(bytes.clone())
            .map_err(|e| ValidationError::InvalidJson(e.to_string())),
        _ => Ok(String::new()),
    }
}

/// エラー種別に応じたレベルでログ出力
pub(crate) fn log_failure(err: &ItemServiceError) {
    match err {
        ItemServiceError::StoreUnavailable(_) => error!(error = %err, "サーバーエラー"),
        _ => warn!(error = %err, "クライアントエラー"),
    }
}

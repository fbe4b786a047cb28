/// Deleteハンドラー
///
/// `DELETE /items/{id}`でアイテムを削除する。成功時は204でボディなし。
use std::sync::Arc;

use lambda_http::{Body, Request, RequestExt, Response};
use tracing::info;

use super::api_response::ApiResponse;
use super::create_update_handler::log_failure;
use super::item_service::ItemService;
use crate::infrastructure::ItemRepository;

/// 削除リクエストを処理するハンドラー
pub struct DeleteHandler<R>
where
    R: ItemRepository,
{
    /// アイテムサービス
    service: Arc<ItemService<R>>,
}

impl<R> DeleteHandler<R>
where
    R: ItemRepository,
{
    /// 新しいDeleteHandlerを作成
    pub fn new(service: Arc<ItemService<R>>) -> Self {
        Self { service }
    }

    /// リクエストを処理してレスポンスを生成
    ///
    /// IDはパスパラメーター`id`から取得し、無ければURIの`/items/{id}`から取得する。
    pub async fn handle(&self, request: &Request) -> Response<Body> {
        let item_id = extract_item_id(request).unwrap_or_default();

        match self.service.delete(&item_id).await {
            Ok(()) => {
                info!(item_id = %item_id, "アイテムを削除");
                ApiResponse::no_content()
            }
            Err(err) => {
                log_failure(&err);
                ApiResponse::from_service_error(&err)
            }
        }
    }
}

/// リクエストから削除対象のIDを取り出す
fn extract_item_id(request: &Request) -> Option<String> {
    if let Some(id) = request.path_parameters().first("id") {
        return Some(id.to_string());
    }
    item_id_from_path(request.uri().path())
}

/// `.../items/{id}`形式のパスからIDを取り出す
fn item_id_from_path(path: &str) -> Option<String> {
    let mut segments = path.trim_end_matches('/').rsplit('/');
    let id = segments.next()?;
    match segments.next() {
        Some("items") if !id.is_empty() => Some(id.to_string()),
        _ => None,
    }
}

/// Listハンドラー
///
/// `GET /items`で全アイテムと件数を返す。
use std::sync::Arc;

use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use serde::Serialize;
use tracing::info;

use super::api_response::ApiResponse;
use super::create_update_handler::log_failure;
use super::item_service::ItemService;
use crate::domain::Item;
use crate::infrastructure::ItemRepository;

/// 一覧レスポンスのボディ
#[derive(Debug, Serialize)]
pub struct ListResponse<'a> {
    /// 全アイテム
    pub items: &'a [Item],
    /// 件数
    pub count: usize,
}

/// 一覧リクエストを処理するハンドラー
pub struct ListHandler<R>
where
    R: ItemRepository,
{
    /// アイテムサービス
    service: Arc<ItemService<R>>,
}

impl<R> ListHandler<R>
where
    R: ItemRepository,
{
    /// 新しいListHandlerを作成
    pub fn new(service: Arc<ItemService<R>>) -> Self {
        Self { service }
    }

    /// 全アイテムを取得してレスポンスを生成
    pub async fn handle(&self) -> Response<Body> {
        match self.service.list().await {
            Ok(items) => {
                info!(item_count = items.len(), "アイテム一覧を取得");
                ApiResponse::json(
                    StatusCode::OK,
                    &ListResponse {
                        items: &items,
                        count: items.len(),
                    },
                )
            }
            Err(err) => {
                log_failure(&err);
                ApiResponse::from_service_error(&err)
            }
        }
    }
}

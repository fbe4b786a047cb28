// アプリケーション層モジュール
pub mod api_response;
pub mod create_update_handler;
pub mod delete_handler;
pub mod item_service;
pub mod list_handler;

// 再エクスポート
pub use api_response::{ApiErrorBody, ApiResponse};
pub use create_update_handler::CreateUpdateHandler;
pub use delete_handler::DeleteHandler;
pub use item_service::{ItemService, ItemServiceError, UpsertOutcome, UpsertResult};
pub use list_handler::{ListHandler, ListResponse};

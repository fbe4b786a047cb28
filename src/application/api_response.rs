// HTTPレスポンス生成
//
// API Gateway向けのJSONレスポンスを構築する。
// 成功・失敗を問わずすべてのレスポンスにCORSヘッダーを付与する。

use lambda_http::http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use serde::{Deserialize, Serialize};

use super::item_service::ItemServiceError;

/// 許可するリクエストヘッダー
const ALLOWED_HEADERS: &str = "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";

/// 許可するメソッド
const ALLOWED_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";

/// エラーレスポンスのボディ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    /// エラー種別（例: "bad_request", "not_found", "store_unavailable"）
    pub error: String,
    /// 詳細なエラーメッセージ
    pub message: String,
}

/// HTTPレスポンスビルダー
pub struct ApiResponse;

impl ApiResponse {
    /// JSONボディのレスポンスを生成
    ///
    /// シリアライズに失敗した場合は500エラーを返す。
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
        match serde_json::to_string(body) {
            Ok(json) => Self::build(status, Body::Text(json)),
            Err(err) => Self::internal_error(format!("Failed to serialize response: {}", err)),
        }
    }

    /// ボディなしの204レスポンスを生成
    pub fn no_content() -> Response<Body> {
        Self::build(StatusCode::NO_CONTENT, Body::Empty)
    }

    /// エラーレスポンスを生成
    pub fn error(status: StatusCode, error: &str, message: impl Into<String>) -> Response<Body> {
        let body = ApiErrorBody {
            error: error.to_string(),
            message: message.into(),
        };
        // ApiErrorBodyは文字列フィールドのみなので失敗しない
        let json = serde_json::to_string(&body).unwrap_or_default();
        Self::build(status, Body::Text(json))
    }

    /// 500 Internal Server Errorを生成
    pub fn internal_error(message: impl Into<String>) -> Response<Body> {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// サービスエラーをステータスコードとエラー種別に対応付けてレスポンスを生成
    ///
    /// | エラー | ステータス |
    /// |--------|-----------|
    /// | Validation | 400 |
    /// | NotFound | 404 |
    /// | ReferentialIntegrityViolation | 409 |
    /// | Conflict | 409 |
    /// | StoreUnavailable | 503 |
    pub fn from_service_error(err: &ItemServiceError) -> Response<Body> {
        let (status, error) = Self::classify(err);
        Self::error(status, error, err.to_string())
    }

    /// サービスエラーのステータスコードとエラー種別
    pub fn classify(err: &ItemServiceError) -> (StatusCode, &'static str) {
        match err {
            ItemServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ItemServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ItemServiceError::ReferentialIntegrityViolation { .. } => {
                (StatusCode::CONFLICT, "referential_integrity_violation")
            }
            ItemServiceError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ItemServiceError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
            }
        }
    }

    /// CORSヘッダーを生成
    pub fn build_cors_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );

        headers
    }

    fn build(status: StatusCode, body: Body) -> Response<Body> {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = Self::build_cors_headers();
        response
    }
}

/// レスポンスボディを文字列として取り出す（テスト用）
#[cfg(test)]
pub(crate) fn body_text(response: &Response<Body>) -> String {
    match response.body() {
        Body::Text(text) => text.clone(),
        Body::Binary(bytes) => String::from_utf8(bytes.clone()).unwrap(),
        Body::Empty => String::new(),
        _ => panic!("予期しないBody型"),
    }
}

// ステージ設定
//
// デプロイステージ（dev / prod）とログレベルを保持する。
// ステージごとのデフォルトログレベルは環境変数LOG_LEVELで上書きできる。

use std::fmt;

/// 環境変数名: ステージ
pub const ENV_STAGE: &str = "STAGE";

/// 環境変数名: ログレベル
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// デプロイステージ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// 開発環境
    #[default]
    Dev,
    /// 本番環境
    Prod,
}

impl Stage {
    /// 文字列からステージを解釈する
    ///
    /// 未知の値は`Dev`として扱う。
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Stage::Prod,
            _ => Stage::Dev,
        }
    }

    /// ステージのデフォルトログレベル
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Stage::Dev => "debug",
            Stage::Prod => "error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Dev => f.write_str("dev"),
            Stage::Prod => f.write_str("prod"),
        }
    }
}

/// ステージ設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageConfig {
    /// デプロイステージ
    pub stage: Stage,
    /// ログレベル（EnvFilterのディレクティブ）
    pub log_level: String,
}

impl StageConfig {
    /// 明示的な値で作成
    pub fn new(stage: Stage, log_level: Option<String>) -> Self {
        let log_level = log_level
            .map(|level| level.trim().to_ascii_lowercase())
            .filter(|level| !level.is_empty())
            .unwrap_or_else(|| stage.default_log_level().to_string());

        Self { stage, log_level }
    }

    /// 環境変数から設定を読み込み
    ///
    /// # 環境変数
    /// - STAGE: `dev`または`prod`（未設定は`dev`）
    /// - LOG_LEVEL: ログレベル（未設定はステージのデフォルト）
    pub fn from_env() -> Self {
        let stage = std::env::var(ENV_STAGE)
            .map(|value| Stage::parse(&value))
            .unwrap_or_default();
        let log_level = std::env::var(ENV_LOG_LEVEL).ok();

        Self::new(stage, log_level)
    }
}

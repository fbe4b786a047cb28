/// 時刻とID生成の抽象化
///
/// サービス構築時に注入し、テストでは固定値を返す実装に差し替える。
use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::domain::ItemId;

/// 現在時刻を返すトレイト
pub trait Clock: Send + Sync {
    /// 現在時刻（UTC）
    fn now(&self) -> DateTime<Utc>;
}

/// システム時計
///
/// 保存形式と一致させるためマイクロ秒精度に切り詰める。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// アイテムIDを生成するトレイト
pub trait IdGenerator: Send + Sync {
    /// 新しい一意なIDを生成
    fn generate(&self) -> ItemId;
}

/// UUID v4によるID生成
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> ItemId {
        ItemId::new(Uuid::new_v4().to_string())
    }
}

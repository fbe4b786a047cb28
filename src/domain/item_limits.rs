// アイテム制限値設定
//
// アイテムサービスの制限値を型安全に保持し、
// 環境変数からの読み込みとデフォルト値を提供するドメイン層コンポーネント。

use tracing::info;

/// 名前の最大文字数
///
/// キーのバイト数上限は別途`ItemValidator::validate_name`で検査する。
pub const DEFAULT_MAX_NAME_LENGTH: usize = 1024;

/// 条件付き書き込みの最大試行回数（初回を含む）
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;

/// 環境変数名: max_name_length
pub const ENV_MAX_NAME_LENGTH: &str = "ITEM_MAX_NAME_LENGTH";

/// 環境変数名: max_write_attempts
pub const ENV_MAX_WRITE_ATTEMPTS: &str = "ITEM_MAX_WRITE_ATTEMPTS";

/// アイテム制限値
///
/// 呼び出し側が構築してサービスに明示的に渡す不変データ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLimits {
    /// 名前の最大文字数
    pub max_name_length: usize,

    /// 条件付き書き込みが競合した場合を含む最大試行回数
    pub max_write_attempts: u32,
}

impl Default for ItemLimits {
    fn default() -> Self {
        Self {
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

impl ItemLimits {
    /// 環境変数から設定を読み込み
    ///
    /// 未設定、パースエラー、または0の場合はデフォルト値を使用する。
    ///
    /// # 環境変数
    /// - ITEM_MAX_NAME_LENGTH: 名前の最大文字数
    /// - ITEM_MAX_WRITE_ATTEMPTS: 条件付き書き込みの最大試行回数
    pub fn from_env() -> Self {
        let max_name_length = parse_env(ENV_MAX_NAME_LENGTH, DEFAULT_MAX_NAME_LENGTH);
        let max_write_attempts = parse_env(ENV_MAX_WRITE_ATTEMPTS, DEFAULT_MAX_WRITE_ATTEMPTS);

        info!(max_name_length, max_write_attempts, "ItemLimits loaded");

        Self {
            max_name_length,
            max_write_attempts,
        }
    }
}

/// 環境変数から正の整数値を読み込む
fn parse_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + PartialEq + Default + Copy + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => match value.parse::<T>() {
            Ok(parsed) if parsed != T::default() => parsed,
            _ => {
                info!(
                    key,
                    value = %value,
                    default = %default,
                    "Invalid environment variable, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
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

    unsafe fn cleanup() {
        unsafe {
            remove_env(ENV_MAX_NAME_LENGTH);
            remove_env(ENV_MAX_WRITE_ATTEMPTS);
        }
    }

    #[test]
    fn test_default_values() {
        let limits = ItemLimits::default();
        assert_eq!(limits.max_name_length, 1024);
        assert_eq!(limits.max_write_attempts, 3);
    }

    #[test]
    #[serial(item_env)]
    fn test_from_env_uses_defaults_when_unset() {
        unsafe { cleanup() };

        assert_eq!(ItemLimits::from_env(), ItemLimits::default());
    }

    #[test]
    #[serial(item_env)]
    fn test_from_env_reads_values() {
        unsafe {
            cleanup();
            set_env(ENV_MAX_NAME_LENGTH, "64");
            set_env(ENV_MAX_WRITE_ATTEMPTS, "5");
        }

        let limits = ItemLimits::from_env();

        assert_eq!(limits.max_name_length, 64);
        assert_eq!(limits.max_write_attempts, 5);

        unsafe { cleanup() };
    }

    // パースできない値と0はデフォルトにフォールバック
    #[test]
    #[serial(item_env)]
    fn test_from_env_falls_back_on_invalid_values() {
        unsafe {
            cleanup();
            set_env(ENV_MAX_NAME_LENGTH, "not-a-number");
            set_env(ENV_MAX_WRITE_ATTEMPTS, "0");
        }

        let limits = ItemLimits::from_env();

        assert_eq!(limits.max_name_length, DEFAULT_MAX_NAME_LENGTH);
        assert_eq!(limits.max_write_attempts, DEFAULT_MAX_WRITE_ATTEMPTS);

        unsafe { cleanup() };
    }
}

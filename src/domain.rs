// ドメイン層モジュール
pub mod item;
pub mod item_limits;
pub mod item_validator;

// 再エクスポート
pub use item::{
    format_timestamp, name_key, parse_timestamp, Item, ItemAttributes, ItemId, MAX_KEY_BYTES,
    NAME_KEY_PREFIX, RESERVED_ATTRIBUTES,
};
pub use item_limits::ItemLimits;
pub use item_validator::{ItemValidator, UpsertRequest, ValidationError};

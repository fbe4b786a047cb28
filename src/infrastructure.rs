// インフラストラクチャ層モジュール
pub mod clock;
pub mod config;
pub mod item_repository;
pub mod logging;
pub mod stage_config;

// 再エクスポート
pub use clock::{Clock, IdGenerator, SystemClock, UuidGenerator};
pub use config::{DynamoDbConfig, DynamoDbConfigError};
pub use item_repository::{DynamoItemRepository, ItemRepository, PutCondition, RepositoryError};
pub use logging::init_logging;
pub use stage_config::{Stage, StageConfig};

//! アイテムサービス
//!
//! アイテムの検証と永続化を行う。名前の一意性、存在確認、
//! 参照整合性チェックを担い、ストアは`ItemRepository`経由でのみ扱う。

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{Item, ItemAttributes, ItemId, ItemLimits, ItemValidator, ValidationError};
use crate::infrastructure::{
    Clock, IdGenerator, ItemRepository, PutCondition, RepositoryError, SystemClock, UuidGenerator,
};

/// アイテムサービスのエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ItemServiceError {
    /// 入力が不正（リトライしない）
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// アイテムが存在しない
    #[error("Item with id {0} not found")]
    NotFound(ItemId),

    /// 依存レコードが残っているため削除できない
    #[error("Item {id} is still referenced by {count} dependent record(s)")]
    ReferentialIntegrityViolation { id: ItemId, count: u64 },

    /// 同時更新の競合が試行回数内に解消しなかった
    #[error("Item '{0}' was modified concurrently, please retry")]
    Conflict(String),

    /// ストアに到達できない、または書き込みに失敗（呼び出し側でのリトライ対象）
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<RepositoryError> for ItemServiceError {
    fn from(err: RepositoryError) -> Self {
        ItemServiceError::StoreUnavailable(err.to_string())
    }
}

/// Upsertの結果種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// 新規作成した
    Created,
    /// 既存アイテムを更新した
    Updated,
}

/// Upsertの結果
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertResult {
    /// 保存後のアイテム
    pub item: Item,
    /// 作成か更新か
    pub outcome: UpsertOutcome,
}

/// アイテムサービス
///
/// 呼び出し間で可変状態を持たない。時計・ID生成・制限値は構築時に注入する。
pub struct ItemService<R>
where
    R: ItemRepository,
{
    /// アイテムリポジトリ
    repository: R,
    /// 時計
    clock: Arc<dyn Clock>,
    /// ID生成
    id_generator: Arc<dyn IdGenerator>,
    /// 制限値
    limits: ItemLimits,
}

impl<R> ItemService<R>
where
    R: ItemRepository,
{
    /// システム時計とUUID生成を使うItemServiceを作成
    pub fn new(repository: R, limits: ItemLimits) -> Self {
        Self::with_dependencies(
            repository,
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
            limits,
        )
    }

    /// すべての依存を明示的に指定してItemServiceを作成
    pub fn with_dependencies(
        repository: R,
        clock: Arc<dyn Clock>,
        id_generator: Arc<dyn IdGenerator>,
        limits: ItemLimits,
    ) -> Self {
        Self {
            repository,
            clock,
            id_generator,
            limits,
        }
    }

    /// 名前をキーにアイテムを作成または更新
    ///
    /// # 処理フロー
    /// 1. 名前を検証（失敗時はストアに一切アクセスしない）
    /// 2. 名前で既存アイテムを検索
    /// 3. 見つかれば属性をマージして楽観ロック付きで置換、
    ///    見つからなければIDを生成して条件付きで新規作成
    /// 4. 条件付き書き込みが競合した場合は2から繰り返す（最大`max_write_attempts`回）
    pub async fn upsert(
        &self,
        name: &str,
        attributes: ItemAttributes,
    ) -> Result<UpsertResult, ItemServiceError> {
        let name = ItemValidator::validate_name(name, &self.limits)?;
        let attributes = ItemValidator::validate_attributes(attributes)?;
        let max_attempts = self.limits.max_write_attempts.max(1);

        for _ in 0..max_attempts {
            let now = self.clock.now();

            let (item, condition, outcome) = match self.repository.get_by_name(&name).await? {
                Some(existing) => {
                    let updated = existing.merged(attributes.clone(), now);
                    let condition = PutCondition::Replace {
                        expected_updated_at: existing.updated_at,
                    };
                    (updated, condition, UpsertOutcome::Updated)
                }
                None => {
                    let created = Item::create(
                        self.id_generator.generate(),
                        name.clone(),
                        attributes.clone(),
                        now,
                    );
                    (created, PutCondition::Create, UpsertOutcome::Created)
                }
            };

            match self.repository.put(&item, condition).await {
                Ok(()) => return Ok(UpsertResult { item, outcome }),
                Err(RepositoryError::ConditionFailed) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(ItemServiceError::Conflict(name))
    }

    /// 全アイテムを取得
    pub async fn list(&self) -> Result<Vec<Item>, ItemServiceError> {
        Ok(self.repository.scan_all().await?)
    }

    /// アイテムを削除
    ///
    /// # 処理フロー
    /// 1. IDを検証
    /// 2. アイテムの存在を確認
    /// 3. 依存レコードが残っていないことを確認
    /// 4. 削除（確認後に消えていた場合はNotFound）
    pub async fn delete(&self, id: &str) -> Result<(), ItemServiceError> {
        let id = ItemValidator::validate_item_id(id)?;

        if self.repository.get_by_id(&id).await?.is_none() {
            return Err(ItemServiceError::NotFound(id));
        }

        let count = self.repository.count_dependents(&id).await?;
        if count > 0 {
            return Err(ItemServiceError::ReferentialIntegrityViolation { id, count });
        }

        if !self.repository.delete(&id).await? {
            return Err(ItemServiceError::NotFound(id));
        }

        Ok(())
    }
}

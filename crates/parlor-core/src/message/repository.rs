//! Message and block storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::{Mutex, broadcast};

use super::model::{BlockId, Message, MessageBlock, MessageId, TopicId};
use crate::{Error, Result};

/// Capacity of the change notification channel.
const EVENT_CAPACITY: usize = 64;

/// Change notification emitted by [`MessageStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A message and some of its blocks were committed.
    Committed {
        /// Topic of the message.
        topic_id: TopicId,
        /// Committed message.
        message_id: MessageId,
        /// Blocks written in the same commit.
        block_ids: Vec<BlockId>,
    },
}

/// Repository for messages and their blocks.
///
/// Messages and blocks are stored as JSON documents keyed by ID, with the
/// owning topic/message kept in indexed columns. Writes are serialized so a
/// read-modify-write through [`MessageStore::update_block`] never loses a
/// concurrent update.
pub struct MessageStore {
    pool: SqlitePool,
    events: broadcast::Sender<StoreEvent>,
    write_lock: Mutex<()>,
}

impl MessageStore {
    /// Create a new store with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Self::with_pool(pool).await
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let store = Self {
            pool,
            events,
            write_lock: Mutex::new(()),
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                topic_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                data TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS message_blocks (
                id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL,
                data TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_topic
            ON messages(topic_id, created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_blocks_message
            ON message_blocks(message_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Write a message and a set of its blocks in one transaction.
    ///
    /// The message must belong to `topic_id`. Blocks are upserted; blocks not
    /// listed are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic does not match or the database write fails.
    pub async fn commit(
        &self,
        topic_id: &TopicId,
        message: &Message,
        blocks: &[MessageBlock],
    ) -> Result<()> {
        if &message.topic_id != topic_id {
            return Err(Error::Config(format!(
                "message {} belongs to topic {}, not {topic_id}",
                message.id, message.topic_id
            )));
        }

        let _guard = self.write_lock.lock().await;
        self.write(message, blocks).await?;
        self.notify_committed(message, blocks);

        Ok(())
    }

    /// Replace one block by a function of its stored version.
    ///
    /// The read, `update` and write happen under the store's write lock, so
    /// concurrent updates of the same block apply one after the other. When
    /// `update` returns `None` nothing is written. Otherwise the new block is
    /// committed with its message, whose `updated_at` is refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error if the block or its message is missing or the write fails.
    pub async fn update_block<F>(
        &self,
        block_id: &BlockId,
        update: F,
    ) -> Result<Option<MessageBlock>>
    where
        F: FnOnce(&MessageBlock) -> Option<MessageBlock>,
    {
        let _guard = self.write_lock.lock().await;

        let block = self
            .get_block(block_id)
            .await?
            .ok_or_else(|| Error::BlockNotFound(block_id.to_string()))?;
        let Some(updated) = update(&block) else {
            return Ok(None);
        };

        let message = self
            .get_message(&updated.message_id)
            .await?
            .ok_or_else(|| Error::MessageNotFound(updated.message_id.to_string()))?
            .touched();

        let blocks = std::slice::from_ref(&updated);
        self.write(&message, blocks).await?;
        self.notify_committed(&message, blocks);

        Ok(Some(updated))
    }

    /// Upsert a message and blocks in one transaction. Callers hold the write lock.
    async fn write(&self, message: &Message, blocks: &[MessageBlock]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO messages (id, topic_id, created_at, data)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                topic_id = excluded.topic_id,
                data = excluded.data
            ",
        )
        .bind(message.id.as_str())
        .bind(message.topic_id.as_str())
        .bind(message.created_at.to_rfc3339())
        .bind(serde_json::to_string(message)?)
        .execute(&mut *tx)
        .await?;

        for block in blocks {
            sqlx::query(
                r"
                INSERT INTO message_blocks (id, message_id, data)
                VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    message_id = excluded.message_id,
                    data = excluded.data
                ",
            )
            .bind(block.id.as_str())
            .bind(block.message_id.as_str())
            .bind(serde_json::to_string(block)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            "Committed message {} with {} block(s)",
            message.id,
            blocks.len()
        );
        Ok(())
    }

    fn notify_committed(&self, message: &Message, blocks: &[MessageBlock]) {
        // No receivers is fine.
        let _ = self.events.send(StoreEvent::Committed {
            topic_id: message.topic_id.clone(),
            message_id: message.id.clone(),
            block_ids: blocks.iter().map(|b| b.id.clone()).collect(),
        });
    }

    /// Get a message by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the stored JSON is invalid.
    pub async fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let row = sqlx::query(r"SELECT data FROM messages WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let data: String = row.get("data");
            serde_json::from_str(&data).map_err(Error::from)
        })
        .transpose()
    }

    /// Get a block by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the stored JSON is invalid.
    pub async fn get_block(&self, id: &BlockId) -> Result<Option<MessageBlock>> {
        let row = sqlx::query(r"SELECT data FROM message_blocks WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let data: String = row.get("data");
            serde_json::from_str(&data).map_err(Error::from)
        })
        .transpose()
    }

    /// List messages of a topic, oldest first.
    ///
    /// Rows with unreadable JSON are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn messages_for_topic(&self, topic_id: &TopicId) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r"
            SELECT id, data FROM messages
            WHERE topic_id = ?
            ORDER BY created_at ASC
            ",
        )
        .bind(topic_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(|row| decode_row(row, "message")).collect())
    }

    /// Get the blocks of a message in the message's block order.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is missing or the database query fails.
    pub async fn blocks_for_message(&self, message_id: &MessageId) -> Result<Vec<MessageBlock>> {
        let message = self
            .get_message(message_id)
            .await?
            .ok_or_else(|| Error::MessageNotFound(message_id.to_string()))?;

        let rows = sqlx::query(r"SELECT id, data FROM message_blocks WHERE message_id = ?")
            .bind(message_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut blocks: Vec<MessageBlock> = rows
            .iter()
            .filter_map(|row| decode_row(row, "block"))
            .collect();

        blocks.sort_by_key(|block| {
            message
                .block_ids
                .iter()
                .position(|id| id == &block.id)
                .unwrap_or(usize::MAX)
        });

        Ok(blocks)
    }

    /// List all topics that have messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn topics(&self) -> Result<Vec<TopicId>> {
        let rows = sqlx::query(
            r"
            SELECT topic_id, MAX(created_at) AS last_activity
            FROM messages
            GROUP BY topic_id
            ORDER BY last_activity DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| TopicId(row.get::<String, _>("topic_id")))
            .collect())
    }
}

/// Decodes a JSON `data` column, logging rows that fail.
fn decode_row<T: serde::de::DeserializeOwned>(row: &sqlx::sqlite::SqliteRow, kind: &str) -> Option<T> {
    let data: String = row.get("data");
    match serde_json::from_str(&data) {
        Ok(value) => Some(value),
        Err(e) => {
            let id: String = row.get("id");
            tracing::warn!("Skipping unreadable {} {}: {}", kind, id, e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::{BlockStatus, MessageRole};

    fn message_with_blocks(topic: &str, count: usize) -> (Message, Vec<MessageBlock>) {
        let mut message = Message::new(TopicId::from(topic), MessageRole::Assistant);
        let blocks: Vec<MessageBlock> = (0..count)
            .map(|i| MessageBlock::main_text(message.id.clone(), format!("block {i}")))
            .collect();
        message.block_ids = blocks.iter().map(|b| b.id.clone()).collect();
        (message, blocks)
    }

    #[tokio::test]
    async fn test_commit_and_read_back() {
        let store = MessageStore::in_memory().await.unwrap();
        let (message, blocks) = message_with_blocks("t1", 2);

        store
            .commit(&message.topic_id, &message, &blocks)
            .await
            .unwrap();

        let loaded = store.get_message(&message.id).await.unwrap().unwrap();
        assert_eq!(loaded, message);

        let block = store.get_block(&blocks[1].id).await.unwrap().unwrap();
        assert_eq!(block.text(), Some("block 1"));
    }

    #[tokio::test]
    async fn test_blocks_follow_message_order() {
        let store = MessageStore::in_memory().await.unwrap();
        let (mut message, blocks) = message_with_blocks("t1", 3);
        message.block_ids.reverse();

        store
            .commit(&message.topic_id, &message, &blocks)
            .await
            .unwrap();

        let loaded = store.blocks_for_message(&message.id).await.unwrap();
        let texts: Vec<_> = loaded.iter().filter_map(MessageBlock::text).collect();
        assert_eq!(texts, vec!["block 2", "block 1", "block 0"]);
    }

    #[tokio::test]
    async fn test_commit_upserts_block() {
        let store = MessageStore::in_memory().await.unwrap();
        let (message, mut blocks) = message_with_blocks("t1", 1);
        store
            .commit(&message.topic_id, &message, &blocks)
            .await
            .unwrap();

        blocks[0].status = BlockStatus::Paused;
        store
            .commit(&message.topic_id, &message.touched(), &blocks)
            .await
            .unwrap();

        let block = store.get_block(&blocks[0].id).await.unwrap().unwrap();
        assert_eq!(block.status, BlockStatus::Paused);
        let loaded = store.get_message(&message.id).await.unwrap().unwrap();
        assert!(loaded.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_commit_rejects_wrong_topic() {
        let store = MessageStore::in_memory().await.unwrap();
        let (message, blocks) = message_with_blocks("t1", 1);

        let result = store.commit(&TopicId::from("t2"), &message, &blocks).await;
        assert!(matches!(result, Err(Error::Config(_))));
        assert!(store.get_message(&message.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_notifies_subscribers() {
        let store = MessageStore::in_memory().await.unwrap();
        let mut events = store.subscribe();
        let (message, blocks) = message_with_blocks("t1", 1);

        store
            .commit(&message.topic_id, &message, &blocks)
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            StoreEvent::Committed {
                topic_id: TopicId::from("t1"),
                message_id: message.id.clone(),
                block_ids: vec![blocks[0].id.clone()],
            }
        );
    }

    #[tokio::test]
    async fn test_topics_newest_first() {
        let store = MessageStore::in_memory().await.unwrap();
        let (first, first_blocks) = message_with_blocks("t1", 1);
        let (mut second, second_blocks) = message_with_blocks("t2", 1);
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        store
            .commit(&first.topic_id, &first, &first_blocks)
            .await
            .unwrap();
        store
            .commit(&second.topic_id, &second, &second_blocks)
            .await
            .unwrap();

        let topics = store.topics().await.unwrap();
        assert_eq!(topics, vec![TopicId::from("t2"), TopicId::from("t1")]);
    }

    #[tokio::test]
    async fn test_update_block_writes_and_touches_message() {
        let store = MessageStore::in_memory().await.unwrap();
        let (message, blocks) = message_with_blocks("t1", 1);
        store
            .commit(&message.topic_id, &message, &blocks)
            .await
            .unwrap();
        let mut events = store.subscribe();

        let updated = store
            .update_block(&blocks[0].id, |block| {
                let mut next = block.clone();
                next.status = BlockStatus::Paused;
                Some(next)
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, BlockStatus::Paused);
        let stored = store.get_block(&blocks[0].id).await.unwrap().unwrap();
        assert_eq!(stored.status, BlockStatus::Paused);
        let loaded = store.get_message(&message.id).await.unwrap().unwrap();
        assert!(loaded.updated_at.is_some());
        assert!(matches!(
            events.recv().await.unwrap(),
            StoreEvent::Committed { .. }
        ));
    }

    #[tokio::test]
    async fn test_update_block_none_writes_nothing() {
        let store = MessageStore::in_memory().await.unwrap();
        let (message, blocks) = message_with_blocks("t1", 1);
        store
            .commit(&message.topic_id, &message, &blocks)
            .await
            .unwrap();

        let result = store.update_block(&blocks[0].id, |_| None).await.unwrap();
        assert!(result.is_none());
        let loaded = store.get_message(&message.id).await.unwrap().unwrap();
        assert_eq!(loaded, message);
    }

    #[tokio::test]
    async fn test_update_missing_block() {
        let store = MessageStore::in_memory().await.unwrap();
        let result = store
            .update_block(&BlockId::from("nope"), |block| Some(block.clone()))
            .await;
        assert!(matches!(result, Err(Error::BlockNotFound(_))));
    }

    #[tokio::test]
    async fn test_blocks_for_missing_message() {
        let store = MessageStore::in_memory().await.unwrap();
        let result = store.blocks_for_message(&MessageId::from("nope")).await;
        assert!(matches!(result, Err(Error::MessageNotFound(_))));
    }
}

use std::path::Path;
use std::sync::{Arc, Mutex};

use chia_cc_protocol::{PendingAction, WalletInfo, WalletType};
use chia_protocol::Bytes;
use chia_traits::Streamable;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{ActionQueue, ServiceError, ServiceResult, WalletStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users_wallets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        wallet_type INTEGER NOT NULL,
        data BLOB NOT NULL
    );

    CREATE TABLE IF NOT EXISTS action_queue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        wallet_id INTEGER NOT NULL,
        wallet_type INTEGER NOT NULL,
        data BLOB NOT NULL,
        done INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS action_queue_wallet ON action_queue(wallet_id, done);
";

/// Wallet records and the action queue, kept in one SQLite database.
///
/// Queries run on tokio's blocking pool, so the store has to be used from
/// inside a runtime.
pub struct SqliteWalletStore {
    conn: Arc<Mutex<Connection>>,
}

fn wallet_type(value: u8) -> rusqlite::Result<WalletType> {
    WalletType::from_bytes(&[value])
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(2, i64::from(value)))
}

fn wallet_info_from_row(row: &Row<'_>) -> rusqlite::Result<WalletInfo> {
    Ok(WalletInfo::new(
        row.get(0)?,
        row.get(1)?,
        wallet_type(row.get(2)?)?,
        Bytes::new(row.get(3)?),
    ))
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<PendingAction> {
    Ok(PendingAction::new(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        wallet_type(row.get(3)?)?,
        Bytes::new(row.get(4)?),
        row.get(5)?,
    ))
}

fn insert_wallet(
    conn: &Connection,
    name: &str,
    wallet_type: WalletType,
    data: &[u8],
) -> ServiceResult<u32> {
    conn.execute(
        "INSERT INTO users_wallets (name, wallet_type, data) VALUES (?1, ?2, ?3)",
        params![name, wallet_type as u8, data],
    )?;
    u32::try_from(conn.last_insert_rowid())
        .map_err(|_| ServiceError::Storage("wallet id out of range".to_string()))
}

fn replace_wallet(conn: &mut Connection, info: &WalletInfo) -> ServiceResult<()> {
    let tx = conn.transaction()?;
    let changed = tx.execute(
        "UPDATE users_wallets SET name = ?2, wallet_type = ?3, data = ?4 WHERE id = ?1",
        params![info.id, info.name, info.wallet_type as u8, info.data.as_slice()],
    )?;
    if changed != 1 {
        return Err(ServiceError::Storage(format!("no wallet with id {}", info.id)));
    }
    tx.commit()?;
    Ok(())
}

fn select_wallet(conn: &Connection, id: u32) -> ServiceResult<Option<WalletInfo>> {
    Ok(conn
        .query_row(
            "SELECT id, name, wallet_type, data FROM users_wallets WHERE id = ?1",
            [id],
            wallet_info_from_row,
        )
        .optional()?)
}

fn insert_action(
    conn: &mut Connection,
    name: &str,
    wallet_id: u32,
    wallet_type: WalletType,
    data: &[u8],
) -> ServiceResult<u32> {
    let tx = conn.transaction()?;
    let existing: Option<u32> = tx
        .query_row(
            "SELECT id FROM action_queue
             WHERE name = ?1 AND wallet_id = ?2 AND data = ?3 AND done = 0",
            params![name, wallet_id, data],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        log::debug!("action {name} for wallet {wallet_id} is already queued as {id}");
        return Ok(id);
    }
    tx.execute(
        "INSERT INTO action_queue (name, wallet_id, wallet_type, data, done)
         VALUES (?1, ?2, ?3, ?4, 0)",
        params![name, wallet_id, wallet_type as u8, data],
    )?;
    let id = u32::try_from(tx.last_insert_rowid())
        .map_err(|_| ServiceError::Storage("action id out of range".to_string()))?;
    tx.commit()?;
    Ok(id)
}

fn complete_action(conn: &Connection, action_id: u32) -> ServiceResult<()> {
    conn.execute(
        "UPDATE action_queue SET done = 1 WHERE id = ?1",
        [action_id],
    )?;
    Ok(())
}

fn select_pending_actions(conn: &Connection, wallet_id: u32) -> ServiceResult<Vec<PendingAction>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, wallet_id, wallet_type, data, done FROM action_queue
         WHERE wallet_id = ?1 AND done = 0 ORDER BY id",
    )?;
    let actions = stmt
        .query_map([wallet_id], action_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(actions)
}

impl SqliteWalletStore {
    pub fn open(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::info!("opened wallet database at {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> ServiceResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> ServiceResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> ServiceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> ServiceResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| ServiceError::Storage("connection mutex poisoned".to_string()))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| ServiceError::Storage(format!("database task failed: {e}")))?
    }
}

impl WalletStore for SqliteWalletStore {
    async fn create_wallet(
        &self,
        name: String,
        wallet_type: WalletType,
        data: Bytes,
    ) -> ServiceResult<WalletInfo> {
        self.blocking(move |conn| {
            let id = insert_wallet(conn, &name, wallet_type, &data)?;
            Ok(WalletInfo::new(id, name, wallet_type, data))
        })
        .await
    }

    async fn update_wallet(&self, info: WalletInfo) -> ServiceResult<()> {
        self.blocking(move |conn| replace_wallet(conn, &info)).await
    }

    async fn get_wallet(&self, id: u32) -> ServiceResult<Option<WalletInfo>> {
        self.blocking(move |conn| select_wallet(conn, id)).await
    }
}

impl ActionQueue for SqliteWalletStore {
    async fn enqueue(
        &self,
        name: String,
        wallet_id: u32,
        wallet_type: WalletType,
        data: Bytes,
    ) -> ServiceResult<u32> {
        self.blocking(move |conn| insert_action(conn, &name, wallet_id, wallet_type, &data))
            .await
    }

    async fn mark_done(&self, action_id: u32) -> ServiceResult<()> {
        self.blocking(move |conn| complete_action(conn, action_id)).await
    }

    async fn pending_actions(&self, wallet_id: u32) -> ServiceResult<Vec<PendingAction>> {
        self.blocking(move |conn| select_pending_actions(conn, wallet_id))
            .await
    }
}

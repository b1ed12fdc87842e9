//! SQLite-backed task store.
//!
//! # Responsibility
//! - Persist one JSON record per task, keyed by the compound key string.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `SubscriptionTask::validate()` before SQL mutations.
//! - Read paths reject rows whose record does not match their key column.
//! - The `version` column is authoritative over the JSON record.
//! - Multi-row removals run in one transaction; hooks fire after commit.
//! - Writes take the write lock up front (`BEGIN IMMEDIATE`) so the referendum
//!   limit is checked against rows no other connection can change before
//!   the commit.

use crate::model::referendum::ReferendumStatus;
use crate::model::task::{key_of, AccountRef, SubscriptionTask, TaskKey};
use crate::repo::task_store::{
    check_referendum_limit, fire_transition_hooks, FeedHooks, StoreError, StoreResult,
    TaskStore, UpdateOutcome,
};
use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::sync::Arc;

const TASK_SELECT_SQL: &str = "SELECT task_key, version, record FROM subscription_tasks";

/// SQLite task store. Owns its connection.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
    hooks: Arc<dyn FeedHooks>,
}

impl SqliteTaskStore {
    /// Wraps a migrated connection (see `db::open_db`).
    pub fn new(conn: Connection, hooks: Arc<dyn FeedHooks>) -> Self {
        Self {
            conn: Mutex::new(conn),
            hooks,
        }
    }

    fn query_tasks(
        &self,
        where_sql: &str,
        bind: &[&dyn rusqlite::ToSql],
    ) -> StoreResult<Vec<SubscriptionTask>> {
        let conn = self.conn.lock();
        select_tasks(&conn, where_sql, bind)
    }

    fn remove_where(
        &self,
        where_sql: &str,
        bind: &[&dyn rusqlite::ToSql],
    ) -> StoreResult<Vec<SubscriptionTask>> {
        let removed = {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            let removed = select_tasks(&tx, where_sql, bind)?;
            tx.execute(
                &format!("DELETE FROM subscription_tasks WHERE {where_sql};"),
                bind,
            )?;
            tx.commit()?;
            removed
        };

        for task in &removed {
            fire_transition_hooks(self.hooks.as_ref(), Some(task), None);
        }
        debug!(
            "event=store_remove module=repo status=ok backend=sqlite removed={}",
            removed.len()
        );
        Ok(removed)
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn backend_id(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &TaskKey) -> StoreResult<Option<SubscriptionTask>> {
        let conn = self.conn.lock();
        get_by_key(&conn, key)
    }

    async fn get_all(&self, chain_id: &str) -> StoreResult<Vec<SubscriptionTask>> {
        self.query_tasks(
            "chain_id = ?1 AND account_address IS NULL AND referendum_id IS NULL",
            &[&chain_id],
        )
    }

    async fn get_all_for_account(
        &self,
        account: &AccountRef,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        self.query_tasks(
            "chain_id = ?1 AND account_address = ?2",
            &[&account.chain_id, &account.address],
        )
    }

    async fn get_all_for_referenda(
        &self,
        chain_id: &str,
        referendum_id: Option<u32>,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        match referendum_id {
            Some(id) => self.query_tasks(
                "chain_id = ?1 AND referendum_id = ?2",
                &[&chain_id, &id],
            ),
            None => self.query_tasks(
                "chain_id = ?1 AND referendum_id IS NOT NULL",
                &[&chain_id],
            ),
        }
    }

    async fn get_active_count(&self) -> StoreResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subscription_tasks WHERE status = 'enable';",
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative active count {count}")))
    }

    async fn get_all_enabled(&self) -> StoreResult<Vec<SubscriptionTask>> {
        self.query_tasks("status = 'enable'", &[])
    }

    async fn get_referendum_status(
        &self,
        chain_id: &str,
        referendum_id: u32,
    ) -> StoreResult<ReferendumStatus> {
        let conn = self.conn.lock();
        read_referendum_status(&conn, chain_id, referendum_id)
    }

    async fn set_referendum_status(
        &self,
        chain_id: &str,
        referendum_id: u32,
        status: ReferendumStatus,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO referendum_status (chain_id, referendum_id, status)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(chain_id, referendum_id) DO UPDATE SET
                status = excluded.status,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![chain_id, referendum_id, status.as_str()],
        )?;
        debug!(
            "event=referendum_status module=repo status=ok backend=sqlite chain={} referendum={} value={}",
            chain_id, referendum_id, status
        );
        Ok(())
    }

    async fn insert(&self, task: &SubscriptionTask) -> StoreResult<SubscriptionTask> {
        task.validate()?;
        let key = key_of(task);

        let (previous, stored) = {
            let mut conn = self.conn.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            check_limit(&tx, task)?;
            let previous = get_by_key(&tx, &key)?;
            let mut stored = task.clone();
            stored.version = allocate_version(&tx)?;
            write_task(&tx, &key, &stored)?;
            tx.commit()?;
            (previous, stored)
        };

        fire_transition_hooks(self.hooks.as_ref(), previous.as_ref(), Some(&stored));
        debug!(
            "event=store_insert module=repo status=ok backend=sqlite key={} version={}",
            key, stored.version
        );
        Ok(stored)
    }

    async fn remove(&self, task: &SubscriptionTask) -> StoreResult<Option<SubscriptionTask>> {
        let key = key_of(task);
        let removed = self.remove_where("task_key = ?1", &[&key.as_str()])?;
        Ok(removed.into_iter().next())
    }

    async fn remove_all_for_account(
        &self,
        account: &AccountRef,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        self.remove_where(
            "chain_id = ?1 AND account_address = ?2",
            &[&account.chain_id, &account.address],
        )
    }

    async fn remove_all_for_referendum(
        &self,
        chain_id: &str,
        referendum_id: u32,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        self.remove_where(
            "chain_id = ?1 AND referendum_id = ?2",
            &[&chain_id, &referendum_id],
        )
    }

    async fn update(&self, task: &SubscriptionTask) -> StoreResult<UpdateOutcome> {
        task.validate()?;
        let key = key_of(task);

        let (previous, stored) = {
            let mut conn = self.conn.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(previous) = get_by_key(&tx, &key)? else {
                warn!(
                    "event=store_update module=repo status=skipped backend=sqlite reason=unknown_key key={}",
                    key
                );
                return Ok(UpdateOutcome::UnknownKey(key));
            };
            if previous.version != task.version {
                return Err(StoreError::VersionConflict {
                    key,
                    expected: task.version,
                    actual: previous.version,
                });
            }
            check_limit(&tx, task)?;
            let mut stored = task.clone();
            stored.version = allocate_version(&tx)?;
            write_task(&tx, &key, &stored)?;
            tx.commit()?;
            (previous, stored)
        };

        fire_transition_hooks(self.hooks.as_ref(), Some(&previous), Some(&stored));
        debug!(
            "event=store_update module=repo status=ok backend=sqlite key={} version={}",
            key, stored.version
        );
        Ok(UpdateOutcome::Updated(stored))
    }
}

fn get_by_key(conn: &Connection, key: &TaskKey) -> StoreResult<Option<SubscriptionTask>> {
    conn.query_row(
        &format!("{TASK_SELECT_SQL} WHERE task_key = ?1;"),
        [key.as_str()],
        read_raw_row,
    )
    .optional()?
    .map(parse_raw_row)
    .transpose()
}

fn select_tasks(
    conn: &Connection,
    where_sql: &str,
    bind: &[&dyn rusqlite::ToSql],
) -> StoreResult<Vec<SubscriptionTask>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL} WHERE {where_sql} ORDER BY task_key ASC;"
    ))?;
    let raw_rows = stmt
        .query_map(bind, read_raw_row)?
        .collect::<Result<Vec<_>, _>>()?;
    raw_rows.into_iter().map(parse_raw_row).collect()
}

fn read_referendum_status(
    conn: &Connection,
    chain_id: &str,
    referendum_id: u32,
) -> StoreResult<ReferendumStatus> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT status FROM referendum_status WHERE chain_id = ?1 AND referendum_id = ?2;",
            params![chain_id, referendum_id],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        None => Ok(ReferendumStatus::default()),
        Some(name) => ReferendumStatus::from_name(&name).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "unknown status `{name}` for referendum {referendum_id} on {chain_id}"
            ))
        }),
    }
}

fn check_limit(conn: &Connection, task: &SubscriptionTask) -> StoreResult<()> {
    let Some(referendum_id) = task.referendum_id else {
        return Ok(());
    };
    if !task.is_enabled() {
        return Ok(());
    }
    let status = read_referendum_status(conn, &task.chain_id, referendum_id)?;
    let siblings = select_tasks(
        conn,
        "chain_id = ?1 AND referendum_id = ?2",
        &[&task.chain_id, &referendum_id],
    )?;
    check_referendum_limit(task, status, &siblings)
}

fn allocate_version(conn: &Connection) -> StoreResult<u64> {
    conn.execute(
        "UPDATE store_sequence SET last_version = last_version + 1 WHERE id = 1;",
        [],
    )?;
    let version: i64 = conn.query_row(
        "SELECT last_version FROM store_sequence WHERE id = 1;",
        [],
        |row| row.get(0),
    )?;
    u64::try_from(version)
        .map_err(|_| StoreError::InvalidData(format!("invalid store sequence {version}")))
}

fn write_task(conn: &Connection, key: &TaskKey, task: &SubscriptionTask) -> StoreResult<()> {
    let record = serde_json::to_string(task)
        .map_err(|err| StoreError::InvalidData(format!("cannot encode task `{key}`: {err}")))?;
    conn.execute(
        "INSERT INTO subscription_tasks (
            task_key,
            chain_id,
            action,
            account_address,
            referendum_id,
            status,
            version,
            record
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(task_key) DO UPDATE SET
            status = excluded.status,
            version = excluded.version,
            record = excluded.record,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            key.as_str(),
            task.chain_id.as_str(),
            task.action.as_str(),
            task.account.as_ref().map(|account| account.address.as_str()),
            task.referendum_id,
            task.status.as_str(),
            version_to_db(task.version)?,
            record,
        ],
    )?;
    Ok(())
}

struct RawRow {
    key: String,
    version: i64,
    record: String,
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        key: row.get("task_key")?,
        version: row.get("version")?,
        record: row.get("record")?,
    })
}

fn parse_raw_row(raw: RawRow) -> StoreResult<SubscriptionTask> {
    let mut task: SubscriptionTask = serde_json::from_str(&raw.record).map_err(|err| {
        StoreError::InvalidData(format!("undecodable record for `{}`: {err}", raw.key))
    })?;
    task.version = u64::try_from(raw.version).map_err(|_| {
        StoreError::InvalidData(format!("invalid version {} for `{}`", raw.version, raw.key))
    })?;
    task.validate()?;
    if key_of(&task).as_str() != raw.key {
        return Err(StoreError::InvalidData(format!(
            "record identity does not match key column `{}`",
            raw.key
        )));
    }
    Ok(task)
}

fn version_to_db(version: u64) -> StoreResult<i64> {
    i64::try_from(version)
        .map_err(|_| StoreError::InvalidData(format!("version {version} exceeds storage range")))
}

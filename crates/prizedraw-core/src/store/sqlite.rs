//! `SQLite`-backed state store.
//!
//! A single connection sits behind a mutex, which serializes every operation
//! inside this process. Write paths additionally open `BEGIN IMMEDIATE`
//! transactions (reset uses `BEGIN EXCLUSIVE`) so that a second process
//! sharing the database file cannot interleave with a check-then-act
//! sequence.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OpenFlags, TransactionBehavior, params};
use tracing::{debug, info, warn};

use super::backend::{AbsenceRecord, StateStore, StoreError, StoreSnapshot, WinnerRecord};
use crate::tier::{PrizeTier, TierStatus, TierTable};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Draw state persisted in `SQLite`.
///
/// Cloning is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct SqliteStateStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStateStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStateStore {
    /// Opens or creates the store at `path`.
    ///
    /// Tier totals are seeded from `totals` only when the tier rows do not
    /// exist yet. Once seeded, totals are fixed for the lifetime of the
    /// database; a differing `totals` argument is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>, totals: &TierTable) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::initialize_connection(&mut conn, totals)?;

        info!(path = %path.display(), "Opened draw state store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory(totals: &TierTable) -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        Self::initialize_connection(&mut conn, totals)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file location, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn initialize_connection(conn: &mut Connection, totals: &TierTable) -> Result<(), StoreError> {
        // Includes PRAGMA statements.
        conn.execute_batch(SCHEMA_SQL)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for (tier, status) in totals.iter() {
            tx.execute(
                "INSERT OR IGNORE INTO prize_tiers (tier, rank, total, remaining)
                 VALUES (?1, ?2, ?3, ?3)",
                params![tier.as_str(), tier.rank(), status.total],
            )?;
        }
        let persisted = read_tiers(&tx)?;
        tx.commit()?;

        for (tier, status) in persisted.iter() {
            let configured = totals.get(tier).total;
            if status.total != configured {
                warn!(
                    tier = %tier,
                    persisted_total = status.total,
                    configured_total = configured,
                    "Tier total differs from configuration; keeping persisted total"
                );
            }
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl StateStore for SqliteStateStore {
    fn read_tier_status(&self) -> Result<TierTable, StoreError> {
        let conn = self.lock()?;
        read_tiers(&conn)
    }

    fn read_draw_counter(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        read_counter(&conn)
    }

    fn read_winner_ids(&self) -> Result<BTreeSet<u32>, StoreError> {
        let conn = self.lock()?;
        read_id_set(&conn, "SELECT participant_id FROM winners")
    }

    fn read_absent_ids(&self) -> Result<BTreeSet<u32>, StoreError> {
        let conn = self.lock()?;
        read_id_set(&conn, "SELECT participant_id FROM absences")
    }

    fn read_winners(&self) -> Result<Vec<WinnerRecord>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT participant_id, tier, awarded_at_ns
             FROM winners
             ORDER BY awarded_at_ns ASC, participant_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(participant_id, tier, ts)| {
                Ok(WinnerRecord {
                    participant_id,
                    tier: parse_tier(&tier)?,
                    timestamp_ns: u64::try_from(ts).unwrap_or_default(),
                })
            })
            .collect()
    }

    fn read_absences(&self) -> Result<Vec<AbsenceRecord>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT participant_id, marked_at_ns
             FROM absences
             ORDER BY marked_at_ns ASC, participant_id ASC",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(AbsenceRecord {
                    participant_id: row.get(0)?,
                    timestamp_ns: u64::try_from(row.get::<_, i64>(1)?).unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let snapshot = StoreSnapshot {
            tiers: read_tiers(&tx)?,
            draw_count: read_counter(&tx)?,
            winners: read_id_set(&tx, "SELECT participant_id FROM winners")?,
            absent: read_id_set(&tx, "SELECT participant_id FROM absences")?,
        };

        tx.commit()?;
        Ok(snapshot)
    }

    fn commit_win(&self, participant_id: u32, tier: PrizeTier) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        apply_win(&tx, participant_id, tier)?;

        tx.commit()?;
        debug!(participant_id, tier = %tier, "Recorded winner");
        Ok(())
    }

    fn commit_draw(&self, participant_id: u32, tier: PrizeTier) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        apply_win(&tx, participant_id, tier)?;
        let draw_count = bump_counter(&tx)?;

        tx.commit()?;
        debug!(participant_id, tier = %tier, draw_count, "Committed draw");
        Ok(draw_count)
    }

    fn mark_absent(&self, participant_id: u32) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO absences (participant_id, marked_at_ns) VALUES (?1, ?2)",
            params![participant_id, now_ns()],
        )?;
        if inserted == 0 {
            return Err(StoreError::AlreadyAbsent { participant_id });
        }

        tx.commit()?;
        debug!(participant_id, "Recorded absence");
        Ok(())
    }

    fn increment_draw_counter(&self) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let draw_count = bump_counter(&tx)?;

        tx.commit()?;
        Ok(draw_count)
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Exclusive)?;

        let winners = tx.execute("DELETE FROM winners", [])?;
        let absences = tx.execute("DELETE FROM absences", [])?;
        tx.execute("UPDATE prize_tiers SET remaining = total", [])?;
        tx.execute("UPDATE draw_counter SET count = 0 WHERE id = 1", [])?;

        tx.commit()?;
        info!(
            cleared_winners = winners,
            cleared_absences = absences,
            "Reset draw state"
        );
        Ok(())
    }
}

/// Check-then-act for a single win. Must run inside a write transaction;
/// returning an error before commit rolls everything back.
fn apply_win(conn: &Connection, participant_id: u32, tier: PrizeTier) -> Result<(), StoreError> {
    let already_won: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM winners WHERE participant_id = ?1)",
        params![participant_id],
        |row| row.get(0),
    )?;
    if already_won {
        return Err(StoreError::DuplicateWinner { participant_id });
    }

    let tiers = read_tiers(conn)?;
    if tiers.get(tier).remaining == 0 {
        return Err(StoreError::TierExhausted { tier });
    }
    if let Some(&pending) = tier
        .predecessors()
        .iter()
        .find(|earlier| tiers.get(**earlier).remaining > 0)
    {
        return Err(StoreError::TierOutOfOrder {
            requested: tier,
            pending,
        });
    }

    conn.execute(
        "INSERT INTO winners (participant_id, tier, awarded_at_ns) VALUES (?1, ?2, ?3)",
        params![participant_id, tier.as_str(), now_ns()],
    )?;
    let updated = conn.execute(
        "UPDATE prize_tiers SET remaining = remaining - 1 WHERE tier = ?1 AND remaining > 0",
        params![tier.as_str()],
    )?;
    if updated != 1 {
        return Err(StoreError::CorruptState(format!(
            "tier {tier} lost capacity inside its own transaction"
        )));
    }
    Ok(())
}

fn bump_counter(conn: &Connection) -> Result<u64, StoreError> {
    let count: i64 = conn.query_row(
        "UPDATE draw_counter SET count = count + 1 WHERE id = 1 RETURNING count",
        [],
        |row| row.get(0),
    )?;
    to_u64(count, "draw counter")
}

fn read_counter(conn: &Connection) -> Result<u64, StoreError> {
    let count: i64 =
        conn.query_row("SELECT count FROM draw_counter WHERE id = 1", [], |row| {
            row.get(0)
        })?;
    to_u64(count, "draw counter")
}

fn read_tiers(conn: &Connection) -> Result<TierTable, StoreError> {
    let mut stmt = conn.prepare("SELECT tier, total, remaining FROM prize_tiers")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut table = TierTable::full(0, 0, 0);
    let mut seen = [false; PrizeTier::ORDER.len()];
    for (name, total, remaining) in rows {
        let tier = parse_tier(&name)?;
        if remaining > total {
            return Err(StoreError::CorruptState(format!(
                "tier {tier} has remaining {remaining} above total {total}"
            )));
        }
        *table.get_mut(tier) = TierStatus { total, remaining };
        seen[tier.rank()] = true;
    }

    if let Some(missing) = PrizeTier::ORDER.into_iter().find(|t| !seen[t.rank()]) {
        return Err(StoreError::CorruptState(format!(
            "missing tier row {missing}"
        )));
    }
    Ok(table)
}

fn read_id_set(conn: &Connection, sql: &str) -> Result<BTreeSet<u32>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([], |row| row.get::<_, u32>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(ids)
}

fn parse_tier(name: &str) -> Result<PrizeTier, StoreError> {
    name.parse()
        .map_err(|e: crate::tier::ParseTierError| StoreError::CorruptState(e.to_string()))
}

fn to_u64(value: i64, what: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::CorruptState(format!("{what} is negative")))
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

use anyhow::Context;
use idlespin_core::{Amount, HistoryEntry, PlayerProgressState, ProgressSink, SinkError};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tracing::error;

// DB schema is defined in migrations (see migrations/ folder)

pub enum StoreJob {
    SavePlayer {
        player_id: String,
        state_json: String,
    },
    LogSpin {
        player_id: String,
        entry: HistoryEntry,
    },
}

/// Hands writes to a background task so the spin path never waits on sqlite.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StoreJob>,
}

impl ChannelSink {
    pub fn spawn(db: SqlitePool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(db, rx));
        Self { tx }
    }

    fn send(&self, job: StoreJob) -> Result<(), SinkError> {
        self.tx
            .send(job)
            .map_err(|_| SinkError::Unavailable("store writer stopped".into()))
    }
}

impl ProgressSink for ChannelSink {
    fn save(&self, player_id: &str, state: &PlayerProgressState) -> Result<(), SinkError> {
        let state_json =
            serde_json::to_string(state).map_err(|e| SinkError::Unavailable(e.to_string()))?;
        self.send(StoreJob::SavePlayer {
            player_id: player_id.to_string(),
            state_json,
        })
    }

    fn record_spin(&self, player_id: &str, entry: &HistoryEntry) -> Result<(), SinkError> {
        self.send(StoreJob::LogSpin {
            player_id: player_id.to_string(),
            entry: entry.clone(),
        })
    }
}

async fn run_writer(db: SqlitePool, mut rx: mpsc::UnboundedReceiver<StoreJob>) {
    while let Some(job) = rx.recv().await {
        let res = match &job {
            StoreJob::SavePlayer {
                player_id,
                state_json,
            } => save_player(&db, player_id, state_json).await,
            StoreJob::LogSpin { player_id, entry } => log_spin(&db, player_id, entry).await,
        };
        if let Err(e) = res {
            error!("store write failed: {e:#}");
        }
    }
}

pub async fn load_player(pool: &SqlitePool, player_id: &str) -> anyhow::Result<Option<PlayerProgressState>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT state_json FROM players WHERE id = ?")
        .bind(player_id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

async fn save_player(pool: &SqlitePool, player_id: &str, state_json: &str) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO players (id, state_json, updated_at) VALUES (?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET state_json = excluded.state_json, updated_at = excluded.updated_at",
    )
    .bind(player_id)
    .bind(state_json)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

// sqlite INTEGER is signed 64-bit.
fn sql_amount(v: Amount) -> anyhow::Result<i64> {
    i64::try_from(v).with_context(|| format!("amount {v} does not fit a sqlite integer"))
}

async fn log_spin(pool: &SqlitePool, player_id: &str, entry: &HistoryEntry) -> anyhow::Result<()> {
    let symbols: Vec<&str> = entry.symbols.iter().map(|s| s.as_str()).collect();
    sqlx::query(
        "INSERT INTO spins (ts, player_id, machine_id, bet, symbols_json, win, credited, tier) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.at.to_rfc3339())
    .bind(player_id)
    .bind(&entry.machine_id)
    .bind(sql_amount(entry.bet)?)
    .bind(serde_json::to_string(&symbols)?)
    .bind(sql_amount(entry.win)?)
    .bind(sql_amount(entry.credited)?)
    .bind(entry.tier.map(|t| t.as_str()))
    .execute(pool)
    .await?;
    Ok(())
}

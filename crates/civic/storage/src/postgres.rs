//! PostgreSQL adapter for civic storage.
//!
//! Schedule timestamps are stored as text and decoded leniently: a missing
//! or malformed phase-end date reads back as `None` (not yet elapsed) instead
//! of failing the whole row.

use crate::traits::{ElectionStore, OrchestrationStore, PopulationStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use civic_types::time::{format_timestamp, parse_optional};
use civic_types::{
    Agent, AgentId, CampaignUpdate, CampaignUpdateKind, Candidate, CellSummary, Classification,
    CrossCheckId, CrossCheckRecord, Election, ElectionId, ElectionPatch, ElectionPhase,
    ElectionResults, ElectionSchedule, ElectionStage, ElectionStatus, Post, PostId, Rank,
    Specialization, StateResult, SummaryId, VettingStatus,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::BTreeMap;

/// Schema created on connect
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS civic_agents (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        specialization TEXT NOT NULL,
        merit_score DOUBLE PRECISION NOT NULL,
        trust_score BIGINT,
        rank TEXT NOT NULL DEFAULT 'member',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_suspended BOOLEAN NOT NULL DEFAULT FALSE,
        vetting_status TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS civic_posts (
        id TEXT PRIMARY KEY,
        author_id TEXT NOT NULL,
        topic TEXT NOT NULL,
        content TEXT NOT NULL,
        consensus_score DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS civic_elections (
        seq BIGSERIAL,
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        phase TEXT NOT NULL,
        total_delegates INTEGER NOT NULL,
        start_at TIMESTAMPTZ NOT NULL,
        primary_end TEXT,
        general_end TEXT,
        term_end TEXT,
        last_campaign_refresh TEXT,
        last_debate_update TEXT,
        apportionment JSONB,
        results JSONB,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "ALTER TABLE civic_elections ADD COLUMN IF NOT EXISTS apportionment JSONB",
    // At most one election may be in flight; concurrent creates hit 23505.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS civic_elections_one_in_flight
        ON civic_elections ((true))
     WHERE status <> 'closed'
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS civic_candidates (
        election_id TEXT NOT NULL,
        agent_id TEXT NOT NULL,
        specialization TEXT NOT NULL,
        merit_score DOUBLE PRECISION NOT NULL,
        manifesto TEXT NOT NULL,
        nominated_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (election_id, agent_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS civic_state_results (
        election_id TEXT NOT NULL,
        specialization TEXT NOT NULL,
        delegates INTEGER NOT NULL,
        winner_agent_id TEXT NOT NULL,
        vote_totals JSONB NOT NULL,
        PRIMARY KEY (election_id, specialization)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS civic_campaign_updates (
        seq BIGSERIAL PRIMARY KEY,
        election_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS civic_cell_summaries (
        id TEXT PRIMARY KEY,
        cell_name TEXT NOT NULL,
        specialization TEXT NOT NULL,
        topic TEXT NOT NULL,
        summary_text TEXT NOT NULL,
        source_post_ids JSONB NOT NULL,
        avg_consensus DOUBLE PRECISION NOT NULL,
        quality_score DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS civic_cross_checks (
        id TEXT PRIMARY KEY,
        topic TEXT NOT NULL,
        summary_a_id TEXT NOT NULL,
        summary_b_id TEXT NOT NULL,
        conflict_score DOUBLE PRECISION NOT NULL,
        classification TEXT NOT NULL,
        checked_at TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// PostgreSQL-backed storage adapter.
#[derive(Clone)]
pub struct PostgresCivicStorage {
    pool: PgPool,
}

impl PostgresCivicStorage {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Unavailable(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {

        for &stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    async fn insert_cross_check(&self, record: CrossCheckRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO civic_cross_checks
                (id, topic, summary_a_id, summary_b_id, conflict_score, classification, checked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.0)
        .bind(record.topic)
        .bind(record.summary_a_id.0)
        .bind(record.summary_b_id.0)
        .bind(record.conflict_score)
        .bind(classification_to_str(record.classification))
        .bind(record.checked_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(())
    }
}

#[async_trait]
impl PopulationStore for PostgresCivicStorage {
    async fn list_agents(&self) -> StorageResult<Vec<Agent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, specialization, merit_score, trust_score, rank,
                   is_active, is_suspended, vetting_status
              FROM civic_agents
             ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.iter().map(row_to_agent).collect()
    }

    async fn promote_rank(&self, agent_id: &AgentId) -> StorageResult<()> {
        let result = sqlx::query("UPDATE civic_agents SET rank = $1 WHERE id = $2")
            .bind(rank_to_str(Rank::TOP))
            .bind(agent_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("agent {agent_id} not found")));
        }
        Ok(())
    }

    async fn demote_rank(&self, agent_ids: &[AgentId]) -> StorageResult<()> {
        if agent_ids.is_empty() {
            return Ok(());
        }
        let ids = agent_ids.iter().map(|id| id.0.clone()).collect::<Vec<_>>();
        sqlx::query("UPDATE civic_agents SET rank = $1 WHERE id = ANY($2)")
            .bind(rank_to_str(Rank::DEMOTED))
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn list_recent_posts(&self, since: DateTime<Utc>) -> StorageResult<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT id, author_id, topic, content, consensus_score, created_at
              FROM civic_posts
             WHERE created_at >= $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(Post {
                    id: PostId::new(get::<String>(row, "id")?),
                    author_id: AgentId::new(get::<String>(row, "author_id")?),
                    topic: get(row, "topic")?,
                    content: get(row, "content")?,
                    consensus_score: get(row, "consensus_score")?,
                    created_at: get(row, "created_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ElectionStore for PostgresCivicStorage {
    async fn create_election(&self, election: Election) -> StorageResult<ElectionId> {
        let in_flight: Option<String> =
            sqlx::query_scalar("SELECT id FROM civic_elections WHERE status <> $1 LIMIT 1")
                .bind(status_to_str(ElectionStatus::Closed))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        if let Some(id) = in_flight {
            return Err(StorageError::Conflict(format!(
                "election {id} is still in flight"
            )));
        }

        let results = to_json(election.results.as_ref())?;
        let apportionment = to_json(election.apportionment.as_ref())?;

        sqlx::query(
            r#"
            INSERT INTO civic_elections
                (id, status, phase, total_delegates, start_at, primary_end, general_end,
                 term_end, last_campaign_refresh, last_debate_update, apportionment, results,
                 updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $5)
            "#,
        )
        .bind(election.id.as_str())
        .bind(status_to_str(election.status))
        .bind(phase_to_str(election.phase))
        .bind(election.total_delegates as i32)
        .bind(election.start_at)
        .bind(election.schedule.primary_end.as_ref().map(format_timestamp))
        .bind(election.schedule.general_end.as_ref().map(format_timestamp))
        .bind(election.schedule.term_end.as_ref().map(format_timestamp))
        .bind(election.last_campaign_refresh.as_ref().map(format_timestamp))
        .bind(election.last_debate_update.as_ref().map(format_timestamp))
        .bind(apportionment)
        .bind(results)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;

        Ok(election.id)
    }

    async fn get_latest_election(&self) -> StorageResult<Option<Election>> {
        let row = sqlx::query(
            r#"
            SELECT id, status, phase, total_delegates, start_at, primary_end, general_end,
                   term_end, last_campaign_refresh, last_debate_update, apportionment, results
              FROM civic_elections
             ORDER BY seq DESC
             LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.as_ref().map(row_to_election).transpose()
    }

    async fn transition_election(
        &self,
        election_id: &ElectionId,
        expected_from: ElectionStage,
        to: ElectionStage,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        if !expected_from.can_advance_to(to) {
            return Err(StorageError::InvariantViolation(format!(
                "election {election_id} cannot move from {expected_from} to {to}"
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE civic_elections
               SET status = $1, phase = $2, updated_at = $3
             WHERE id = $4 AND status = $5 AND phase = $6
            "#,
        )
        .bind(status_to_str(to.status()))
        .bind(phase_to_str(to.phase()))
        .bind(at)
        .bind(election_id.as_str())
        .bind(status_to_str(expected_from.status()))
        .bind(phase_to_str(expected_from.phase()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::InvariantViolation(format!(
                "invalid election transition for {election_id}: not in {expected_from}"
            )));
        }
        Ok(())
    }

    async fn update_election(
        &self,
        election_id: &ElectionId,
        patch: ElectionPatch,
    ) -> StorageResult<()> {
        let results = to_json(patch.results.as_ref())?;
        let apportionment = to_json(patch.apportionment.as_ref())?;

        // The apportionment is write-once: an existing value wins.
        let result = sqlx::query(
            r#"
            UPDATE civic_elections
               SET last_campaign_refresh = COALESCE($1, last_campaign_refresh),
                   last_debate_update = COALESCE($2, last_debate_update),
                   apportionment = COALESCE(apportionment, $3),
                   results = COALESCE($4, results),
                   updated_at = NOW()
             WHERE id = $5
            "#,
        )
        .bind(patch.last_campaign_refresh.as_ref().map(format_timestamp))
        .bind(patch.last_debate_update.as_ref().map(format_timestamp))
        .bind(apportionment)
        .bind(results)
        .bind(election_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "election {election_id} not found"
            )));
        }
        Ok(())
    }

    async fn replace_candidates(
        &self,
        election_id: &ElectionId,
        candidates: Vec<Candidate>,
    ) -> StorageResult<()> {
        sqlx::query("DELETE FROM civic_candidates WHERE election_id = $1")
            .bind(election_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        for candidate in candidates {
            sqlx::query(
                r#"
                INSERT INTO civic_candidates
                    (election_id, agent_id, specialization, merit_score, manifesto, nominated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(candidate.election_id.0)
            .bind(candidate.agent_id.0)
            .bind(candidate.specialization.0)
            .bind(candidate.merit_score)
            .bind(candidate.manifesto)
            .bind(candidate.nominated_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_conflict)?;
        }
        Ok(())
    }

    async fn list_candidates(&self, election_id: &ElectionId) -> StorageResult<Vec<Candidate>> {
        let rows = sqlx::query(
            r#"
            SELECT election_id, agent_id, specialization, merit_score, manifesto, nominated_at
              FROM civic_candidates
             WHERE election_id = $1
             ORDER BY merit_score DESC, agent_id ASC
            "#,
        )
        .bind(election_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(Candidate {
                    election_id: ElectionId::new(get::<String>(row, "election_id")?),
                    agent_id: AgentId::new(get::<String>(row, "agent_id")?),
                    specialization: get::<String>(row, "specialization")?.into(),
                    merit_score: get(row, "merit_score")?,
                    manifesto: get(row, "manifesto")?,
                    nominated_at: get(row, "nominated_at")?,
                })
            })
            .collect()
    }

    async fn insert_state_results(&self, results: Vec<StateResult>) -> StorageResult<()> {
        for result in results {
            let totals = serde_json::to_value(&result.vote_totals)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO civic_state_results
                    (election_id, specialization, delegates, winner_agent_id, vote_totals)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(result.election_id.0)
            .bind(result.specialization.0)
            .bind(result.delegates as i32)
            .bind(result.winner_agent_id.0)
            .bind(totals)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_conflict)?;
        }
        Ok(())
    }

    async fn list_state_results(
        &self,
        election_id: &ElectionId,
    ) -> StorageResult<Vec<StateResult>> {
        let rows = sqlx::query(
            r#"
            SELECT election_id, specialization, delegates, winner_agent_id, vote_totals
              FROM civic_state_results
             WHERE election_id = $1
             ORDER BY specialization
            "#,
        )
        .bind(election_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let totals: serde_json::Value = get(row, "vote_totals")?;
                Ok(StateResult {
                    election_id: ElectionId::new(get::<String>(row, "election_id")?),
                    specialization: get::<String>(row, "specialization")?.into(),
                    delegates: get::<i32>(row, "delegates")?.max(0) as u32,
                    winner_agent_id: AgentId::new(get::<String>(row, "winner_agent_id")?),
                    vote_totals: serde_json::from_value(totals)
                        .map_err(|e| StorageError::Serialization(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn insert_campaign_update(&self, update: CampaignUpdate) -> StorageResult<()> {
        let kind = match update.kind {
            CampaignUpdateKind::Manifesto => "manifesto",
            CampaignUpdateKind::Debate => "debate",
        };
        sqlx::query(
            r#"
            INSERT INTO civic_campaign_updates (election_id, kind, text, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(update.election_id.0)
        .bind(kind)
        .bind(update.text)
        .bind(update.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl OrchestrationStore for PostgresCivicStorage {
    async fn insert_cell_summary(&self, summary: CellSummary) -> StorageResult<SummaryId> {
        let sources = serde_json::to_value(&summary.source_post_ids)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO civic_cell_summaries
                (id, cell_name, specialization, topic, summary_text, source_post_ids,
                 avg_consensus, quality_score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(summary.id.as_str())
        .bind(summary.cell_name)
        .bind(summary.specialization.0)
        .bind(summary.topic)
        .bind(summary.summary_text)
        .bind(sources)
        .bind(summary.avg_consensus)
        .bind(summary.quality_score)
        .bind(summary.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(summary.id)
    }

    async fn insert_conflict_report(&self, report: CrossCheckRecord) -> StorageResult<()> {
        if report.classification != Classification::Conflict {
            return Err(StorageError::InvalidInput(
                "conflict report must be classified as conflict".to_string(),
            ));
        }
        self.insert_cross_check(report).await
    }

    async fn insert_verification(&self, record: CrossCheckRecord) -> StorageResult<()> {
        if record.classification != Classification::Verified {
            return Err(StorageError::InvalidInput(
                "verification must be classified as verified".to_string(),
            ));
        }
        self.insert_cross_check(record).await
    }

    async fn list_cross_checks(&self, topic: &str) -> StorageResult<Vec<CrossCheckRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, topic, summary_a_id, summary_b_id, conflict_score, classification, checked_at
              FROM civic_cross_checks
             WHERE topic = $1
             ORDER BY checked_at ASC
            "#,
        )
        .bind(topic)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(CrossCheckRecord {
                    id: CrossCheckId::new(get::<String>(row, "id")?),
                    topic: get(row, "topic")?,
                    summary_a_id: SummaryId::new(get::<String>(row, "summary_a_id")?),
                    summary_b_id: SummaryId::new(get::<String>(row, "summary_b_id")?),
                    conflict_score: get(row, "conflict_score")?,
                    classification: classification_from_str(&get::<String>(row, "classification")?)?,
                    checked_at: get(row, "checked_at")?,
                })
            })
            .collect()
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StorageResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StorageError::Serialization(format!("column {column}: {e}")))
}

fn row_to_agent(row: &PgRow) -> StorageResult<Agent> {
    let vetting = get::<Option<String>>(row, "vetting_status")?;
    Ok(Agent {
        id: AgentId::new(get::<String>(row, "id")?),
        name: get(row, "name")?,
        specialization: get::<String>(row, "specialization")?.into(),
        merit_score: Agent::bound_merit(get::<f64>(row, "merit_score")?),
        trust_score: get(row, "trust_score")?,
        rank: rank_from_str(&get::<String>(row, "rank")?),
        is_active: get(row, "is_active")?,
        is_suspended: get(row, "is_suspended")?,
        vetting_status: vetting.as_deref().and_then(vetting_from_str),
    })
}

fn to_json<T: serde::Serialize>(value: Option<&T>) -> StorageResult<Option<serde_json::Value>> {
    value
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

fn from_json<T>(row: &PgRow, column: &str) -> StorageResult<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    get::<Option<serde_json::Value>>(row, column)?
        .map(serde_json::from_value::<T>)
        .transpose()
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

fn row_to_election(row: &PgRow) -> StorageResult<Election> {
    let results = from_json::<ElectionResults>(row, "results")?;
    let apportionment = from_json::<BTreeMap<Specialization, u32>>(row, "apportionment")?;
    let schedule = ElectionSchedule {
        primary_end: parse_optional(get::<Option<String>>(row, "primary_end")?.as_deref()),
        general_end: parse_optional(get::<Option<String>>(row, "general_end")?.as_deref()),
        term_end: parse_optional(get::<Option<String>>(row, "term_end")?.as_deref()),
    };

    Ok(Election {
        id: ElectionId::new(get::<String>(row, "id")?),
        status: status_from_str(&get::<String>(row, "status")?)?,
        phase: phase_from_str(&get::<String>(row, "phase")?)?,
        total_delegates: get::<i32>(row, "total_delegates")?.max(0) as u32,
        start_at: get(row, "start_at")?,
        end_at: schedule.general_end,
        schedule,
        last_campaign_refresh: parse_optional(
            get::<Option<String>>(row, "last_campaign_refresh")?.as_deref(),
        ),
        last_debate_update: parse_optional(
            get::<Option<String>>(row, "last_debate_update")?.as_deref(),
        ),
        apportionment,
        results,
    })
}

fn status_to_str(status: ElectionStatus) -> &'static str {
    match status {
        ElectionStatus::Scheduled => "scheduled",
        ElectionStatus::Active => "active",
        ElectionStatus::Closed => "closed",
    }
}

fn status_from_str(value: &str) -> StorageResult<ElectionStatus> {
    match value {
        "scheduled" => Ok(ElectionStatus::Scheduled),
        "active" => Ok(ElectionStatus::Active),
        "closed" => Ok(ElectionStatus::Closed),
        other => Err(StorageError::Serialization(format!(
            "unknown election status: {other}"
        ))),
    }
}

fn phase_to_str(phase: ElectionPhase) -> &'static str {
    match phase {
        ElectionPhase::Primary => "primary",
        ElectionPhase::General => "general",
    }
}

fn phase_from_str(value: &str) -> StorageResult<ElectionPhase> {
    match value {
        "primary" => Ok(ElectionPhase::Primary),
        "general" => Ok(ElectionPhase::General),
        other => Err(StorageError::Serialization(format!(
            "unknown election phase: {other}"
        ))),
    }
}

fn rank_to_str(rank: Rank) -> &'static str {
    match rank {
        Rank::Member => "member",
        Rank::Delegate => "delegate",
        Rank::Leader => "leader",
    }
}

fn rank_from_str(value: &str) -> Rank {
    match value {
        "leader" => Rank::Leader,
        "delegate" => Rank::Delegate,
        _ => Rank::Member,
    }
}

fn vetting_from_str(value: &str) -> Option<VettingStatus> {
    match value {
        "pending" => Some(VettingStatus::Pending),
        "approved" => Some(VettingStatus::Approved),
        "rejected" => Some(VettingStatus::Rejected),
        _ => None,
    }
}

fn classification_to_str(classification: Classification) -> &'static str {
    match classification {
        Classification::Verified => "verified",
        Classification::Conflict => "conflict",
    }
}

fn classification_from_str(value: &str) -> StorageResult<Classification> {
    match value {
        "verified" => Ok(Classification::Verified),
        "conflict" => Ok(Classification::Conflict),
        other => Err(StorageError::Serialization(format!(
            "unknown classification: {other}"
        ))),
    }
}

fn map_sqlx_conflict(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StorageError::Conflict(db_err.message().to_string());
        }
    }
    StorageError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_allows_one_in_flight_election() {
        let index = SCHEMA
            .iter()
            .find(|stmt| stmt.contains("civic_elections_one_in_flight"))
            .unwrap();
        assert!(index.contains("CREATE UNIQUE INDEX"));
        assert!(index.contains(&format!(
            "WHERE status <> '{}'",
            status_to_str(ElectionStatus::Closed)
        )));
    }

    #[test]
    fn elections_carry_a_recorded_apportionment() {
        assert!(SCHEMA
            .iter()
            .any(|stmt| stmt.contains("ADD COLUMN IF NOT EXISTS apportionment JSONB")));
    }
}

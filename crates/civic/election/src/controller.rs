//! Election Cycle Controller
//!
//! Each call to [`ElectionController::tick`] reads the latest election and
//! performs exactly one step of the lifecycle:
//!
//! | stage    | deadline not reached          | deadline reached           |
//! |----------|-------------------------------|----------------------------|
//! | none     | create election               |                            |
//! | primary  | refresh slate + campaign text | advance to general         |
//! | general  | debate digest                 | vote, persist, close       |
//! | closed   | idle                          | start one new cycle        |
//!
//! Refreshes and digests are rate-limited by `refresh_interval`, so a repeated
//! tick with no elapsed time performs no writes.

use crate::apportionment::apportion;
use crate::candidates::{build_slate, select_candidates, CandidateRules};
use crate::error::{ElectionError, ElectionResult};
use crate::report::{TickAction, TickReport};
use crate::vote::VoteSimulator;
use chrono::{DateTime, Duration, Utc};
use civic_storage::{retry, CivicStorage, RetryPolicy, StorageError};
use civic_textgen::{generate_or_template, TextGenerator};
use civic_types::{
    time::has_elapsed, Agent, AgentId, CampaignUpdate, CampaignUpdateKind, Candidate, Election,
    ElectionConfig, ElectionId, ElectionPatch, ElectionResults, ElectionSchedule, ElectionStage,
    EligibilityPolicy, Rank, Specialization, StateResult,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// Time-driven election state machine
pub struct ElectionController {
    store: Arc<dyn CivicStorage>,
    generator: Arc<dyn TextGenerator>,
    config: ElectionConfig,
    policy: EligibilityPolicy,
    retry: RetryPolicy,
}

impl ElectionController {
    pub fn new(
        store: Arc<dyn CivicStorage>,
        generator: Arc<dyn TextGenerator>,
        config: ElectionConfig,
        policy: EligibilityPolicy,
    ) -> ElectionResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            generator,
            config,
            policy,
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy used at the storage boundary
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    /// Perform one reconciliation step at `now`
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::new(now);

        let store = &self.store;
        let latest = match retry(&self.retry, "get_latest_election", || {
            store.get_latest_election()
        })
        .await
        {
            Ok(latest) => latest,
            Err(err) => {
                report.fail("get_latest_election", err);
                return report;
            }
        };

        let Some(election) = latest else {
            return self.start_cycle(report, TickAction::Created).await;
        };
        report.election_id = Some(election.id.clone());

        match election.stage() {
            ElectionStage::Primary => {
                if self.deadline_passed(&election, "primary_end", election.schedule.primary_end, now)
                {
                    self.advance_to_general(report, &election).await
                } else {
                    self.refresh_campaign(report, &election).await
                }
            }
            ElectionStage::General => {
                if self.deadline_passed(&election, "general_end", election.schedule.general_end, now)
                {
                    self.close(report, &election).await
                } else {
                    self.update_debate(report, &election).await
                }
            }
            ElectionStage::Closed => {
                if self.deadline_passed(&election, "term_end", election.schedule.term_end, now) {
                    self.warn_on_backlog(&election, now);
                    report.election_id = None;
                    self.start_cycle(report, TickAction::NextCycleStarted).await
                } else {
                    report.finish(TickAction::Idle)
                }
            }
        }
    }

    // A missing or unreadable deadline defers the transition.
    fn deadline_passed(
        &self,
        election: &Election,
        field: &'static str,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        if deadline.is_none() {
            warn!(
                election_id = %election.id,
                field = field,
                "Election deadline missing or malformed, deferring transition"
            );
        }
        has_elapsed(deadline, now)
    }

    fn warn_on_backlog(&self, election: &Election, now: DateTime<Utc>) {
        let Some(term_end) = election.schedule.term_end else {
            return;
        };
        let term = self.config.term_length();
        if term > Duration::zero() && now - term_end > term {
            let overdue_terms = (now - term_end).num_seconds() / term.num_seconds();
            warn!(
                election_id = %election.id,
                overdue_terms = overdue_terms,
                "election backlog: starting a single new cycle"
            );
        }
    }

    fn due(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last {
            Some(last) => now - last >= self.config.refresh_interval(),
            None => true,
        }
    }

    fn schedule_from(&self, now: DateTime<Utc>) -> ElectionSchedule {
        let primary_end = now + self.config.primary_duration();
        let general_end = primary_end + self.config.general_duration();
        let term_end = general_end + self.config.term_length();
        ElectionSchedule {
            primary_end: Some(primary_end),
            general_end: Some(general_end),
            term_end: Some(term_end),
        }
    }

    async fn load_eligible(&self, report: &mut TickReport) -> Option<Vec<Agent>> {
        let store = &self.store;
        let policy = &self.policy;
        match retry(&self.retry, "eligible_agents", || store.eligible_agents(policy)).await {
            Ok(agents) => Some(agents),
            Err(err) => {
                report.fail("eligible_agents", err);
                None
            }
        }
    }

    fn abort(&self, report: TickReport, err: ElectionError) -> TickReport {
        warn!(
            election_id = ?report.election_id.as_ref().map(|id| id.as_str()),
            error = %err,
            "Election tick aborted"
        );
        report.finish(TickAction::Aborted {
            reason: err.to_string(),
        })
    }

    /// Create a new election with a fresh slate
    async fn start_cycle(&self, mut report: TickReport, action: TickAction) -> TickReport {
        let now = report.at;
        let Some(eligible) = self.load_eligible(&mut report).await else {
            return report;
        };

        // Preconditions are checked before anything is written.
        if let Err(err) = apportion(&eligible, self.config.total_delegates) {
            return self.abort(report, err);
        }
        let selected = match select_candidates(&eligible, &CandidateRules::from_config(&self.config))
        {
            Ok(selected) => selected,
            Err(err) => return self.abort(report, err),
        };

        let mut election = Election::scheduled(
            ElectionId::generate(),
            self.config.total_delegates,
            now,
            self.schedule_from(now),
        );
        election.last_campaign_refresh = Some(now);

        let store = &self.store;
        let id = match retry(&self.retry, "create_election", || {
            store.create_election(election.clone())
        })
        .await
        {
            Ok(id) => id,
            Err(err) => {
                report.fail("create_election", err);
                return report;
            }
        };
        report.election_id = Some(id.clone());

        info!(
            election_id = %id,
            total_delegates = election.total_delegates,
            candidates = selected.len(),
            primary_end = ?election.schedule.primary_end,
            "Election created"
        );

        let slate = build_slate(&id, &selected, self.generator.as_ref(), now).await;
        self.publish_slate(&mut report, &id, slate).await;
        report.finish(action)
    }

    async fn publish_slate(
        &self,
        report: &mut TickReport,
        election_id: &ElectionId,
        slate: Vec<Candidate>,
    ) -> bool {
        let store = &self.store;
        let text = slate
            .iter()
            .map(|c| format!("{}: {}", c.agent_id, c.manifesto))
            .collect::<Vec<_>>()
            .join("\n");

        if let Err(err) = retry(&self.retry, "replace_candidates", || {
            store.replace_candidates(election_id, slate.clone())
        })
        .await
        {
            report.fail("replace_candidates", err);
            return false;
        }

        let update = CampaignUpdate {
            election_id: election_id.clone(),
            kind: CampaignUpdateKind::Manifesto,
            text,
            created_at: report.at,
        };
        if let Err(err) = retry(&self.retry, "insert_campaign_update", || {
            store.insert_campaign_update(update.clone())
        })
        .await
        {
            report.fail("insert_campaign_update", err);
        }
        true
    }

    /// Primary phase: re-run selection and republish campaign text once per interval
    async fn refresh_campaign(&self, mut report: TickReport, election: &Election) -> TickReport {
        let now = report.at;
        if !self.due(election.last_campaign_refresh, now) {
            return report.finish(TickAction::Idle);
        }

        let Some(eligible) = self.load_eligible(&mut report).await else {
            return report;
        };
        let selected = match select_candidates(&eligible, &CandidateRules::from_config(&self.config))
        {
            Ok(selected) => selected,
            Err(err) => return self.abort(report, err),
        };

        let slate = build_slate(&election.id, &selected, self.generator.as_ref(), now).await;
        if !self.publish_slate(&mut report, &election.id, slate).await {
            return report;
        }

        let store = &self.store;
        if let Err(err) = retry(&self.retry, "update_election", || {
            store.update_election(&election.id, ElectionPatch::campaign_refreshed(now))
        })
        .await
        {
            report.fail("update_election", err);
        }

        info!(
            election_id = %election.id,
            candidates = selected.len(),
            "Campaign slate refreshed"
        );
        report.finish(TickAction::CampaignRefreshed)
    }

    async fn advance_to_general(&self, mut report: TickReport, election: &Election) -> TickReport {
        let now = report.at;
        let store = &self.store;
        match retry(&self.retry, "transition_election", || {
            store.transition_election(
                &election.id,
                ElectionStage::Primary,
                ElectionStage::General,
                now,
            )
        })
        .await
        {
            Ok(()) => {
                info!(election_id = %election.id, "Election advanced to general phase");
                report.finish(TickAction::AdvancedToGeneral)
            }
            Err(err) => {
                report.fail("transition_election", err);
                report
            }
        }
    }

    /// General phase: one debate digest per interval
    async fn update_debate(&self, mut report: TickReport, election: &Election) -> TickReport {
        let now = report.at;
        if !self.due(election.last_debate_update, now) {
            return report.finish(TickAction::Idle);
        }

        let store = &self.store;
        let candidates = match retry(&self.retry, "list_candidates", || {
            store.list_candidates(&election.id)
        })
        .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                report.fail("list_candidates", err);
                return report;
            }
        };

        let names = candidates
            .iter()
            .map(|c| c.agent_id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "Summarise today's debate between the candidates {names} in election {} in three sentences.",
            election.id
        );
        let text = generate_or_template(self.generator.as_ref(), &prompt, || {
            format!(
                "Debate update for {}: {} candidates remain in the race ({}).",
                election.id,
                candidates.len(),
                names
            )
        })
        .await;

        let update = CampaignUpdate {
            election_id: election.id.clone(),
            kind: CampaignUpdateKind::Debate,
            text,
            created_at: now,
        };
        if let Err(err) = retry(&self.retry, "insert_campaign_update", || {
            store.insert_campaign_update(update.clone())
        })
        .await
        {
            report.fail("insert_campaign_update", err);
            return report;
        }

        if let Err(err) = retry(&self.retry, "update_election", || {
            store.update_election(&election.id, ElectionPatch::debate_updated(now))
        })
        .await
        {
            report.fail("update_election", err);
        }

        info!(election_id = %election.id, "Debate update emitted");
        report.finish(TickAction::DebateUpdated)
    }

    /// Vote, persist results and close. Results already persisted are reused
    /// and the rest recomputed deterministically; the election only closes
    /// once every specialization has a stored result.
    async fn close(&self, mut report: TickReport, election: &Election) -> TickReport {
        let now = report.at;
        let store = &self.store;

        let Some(eligible) = self.load_eligible(&mut report).await else {
            return report.finish(TickAction::CloseDeferred);
        };
        let allocation = match &election.apportionment {
            Some(recorded) => recorded.clone(),
            None => {
                let fresh = match apportion(&eligible, election.total_delegates) {
                    Ok(apportionment) => apportionment.into_map(),
                    Err(err) => return self.abort(report, err),
                };
                match self.record_apportionment(&mut report, election, fresh).await {
                    Some(recorded) => recorded,
                    None => return report.finish(TickAction::CloseDeferred),
                }
            }
        };

        let mut slate = match retry(&self.retry, "list_candidates", || {
            store.list_candidates(&election.id)
        })
        .await
        {
            Ok(slate) => slate,
            Err(err) => {
                report.fail("list_candidates", err);
                return report.finish(TickAction::CloseDeferred);
            }
        };
        if slate.is_empty() {
            let selected =
                match select_candidates(&eligible, &CandidateRules::from_config(&self.config)) {
                    Ok(selected) => selected,
                    Err(err) => return self.abort(report, err),
                };
            slate = build_slate(&election.id, &selected, self.generator.as_ref(), now).await;
            if !self
                .publish_slate(&mut report, &election.id, slate.clone())
                .await
            {
                return report.finish(TickAction::CloseDeferred);
            }
        }

        let simulator = match VoteSimulator::new(election.id.clone(), slate) {
            Ok(simulator) => simulator,
            Err(err) => return self.abort(report, err),
        };

        let existing = match retry(&self.retry, "list_state_results", || {
            store.list_state_results(&election.id)
        })
        .await
        {
            Ok(existing) => existing,
            Err(err) => {
                report.fail("list_state_results", err);
                return report.finish(TickAction::CloseDeferred);
            }
        };
        let mut results: BTreeMap<Specialization, StateResult> = existing
            .into_iter()
            .map(|r| (r.specialization.clone(), r))
            .collect();
        let resumed = results.len();

        let mut pending = 0usize;
        for (specialization, &delegates) in &allocation {
            if results.contains_key(specialization) {
                continue;
            }
            let vote = match simulator.simulate_group(specialization, &eligible) {
                Ok(vote) => vote,
                Err(err) => return self.abort(report, err),
            };
            let result = StateResult {
                election_id: election.id.clone(),
                specialization: specialization.clone(),
                delegates,
                winner_agent_id: vote.winner_agent_id,
                vote_totals: vote.vote_totals,
            };

            match retry(&self.retry, "insert_state_result", || {
                store.insert_state_results(vec![result.clone()])
            })
            .await
            {
                // Another writer got there first with the same deterministic row.
                Ok(()) | Err(StorageError::Conflict(_)) => {
                    results.insert(specialization.clone(), result);
                }
                Err(err) => {
                    pending += 1;
                    report.fail(format!("insert_state_result:{specialization}"), err);
                }
            }
        }

        if pending > 0 {
            warn!(
                election_id = %election.id,
                pending = pending,
                recorded = results.len(),
                "Election close deferred, state results incomplete"
            );
            return report.finish(TickAction::CloseDeferred);
        }

        let delegate_totals = tally_delegates(results.values());
        let Some((winner, winner_delegates)) =
            overall_winner(&delegate_totals, simulator.slate(), &eligible)
        else {
            return self.abort(report, ElectionError::NoCandidates);
        };

        self.rotate_ranks(&mut report, &winner).await;

        let outcome = ElectionResults {
            winner_agent_id: winner.clone(),
            winner_delegates,
            delegate_totals,
            closed_at: now,
        };
        if let Err(err) = retry(&self.retry, "update_election", || {
            store.update_election(&election.id, ElectionPatch::with_results(outcome.clone()))
        })
        .await
        {
            report.fail("update_election", err);
            return report.finish(TickAction::CloseDeferred);
        }

        if let Err(err) = retry(&self.retry, "transition_election", || {
            store.transition_election(
                &election.id,
                ElectionStage::General,
                ElectionStage::Closed,
                now,
            )
        })
        .await
        {
            report.fail("transition_election", err);
            return report.finish(TickAction::CloseDeferred);
        }

        info!(
            election_id = %election.id,
            winner = %winner,
            delegates = winner_delegates,
            specializations = results.len(),
            resumed = resumed,
            "Election closed"
        );
        report.finish(TickAction::Closed {
            winner,
            delegates: winner_delegates,
        })
    }

    /// Persist the allocation before any state result is written and read
    /// back whichever allocation the election ended up carrying, so every
    /// resumed close splits `total_delegates` the same way.
    async fn record_apportionment(
        &self,
        report: &mut TickReport,
        election: &Election,
        fresh: BTreeMap<Specialization, u32>,
    ) -> Option<BTreeMap<Specialization, u32>> {
        let store = &self.store;
        if let Err(err) = retry(&self.retry, "update_election", || {
            store.update_election(&election.id, ElectionPatch::with_apportionment(fresh.clone()))
        })
        .await
        {
            report.fail("record_apportionment", err);
            return None;
        }

        match retry(&self.retry, "get_latest_election", || {
            store.get_latest_election()
        })
        .await
        {
            Ok(Some(latest)) if latest.id == election.id => {
                let recorded = latest.apportionment.unwrap_or(fresh);
                info!(
                    election_id = %election.id,
                    specializations = recorded.len(),
                    "Delegate apportionment recorded"
                );
                Some(recorded)
            }
            Ok(_) => {
                report.fail("record_apportionment", "election is no longer the latest");
                None
            }
            Err(err) => {
                report.fail("get_latest_election", err);
                None
            }
        }
    }

    // Demote prior leaders (never the winner or an excluded identity), then
    // promote the winner.
    async fn rotate_ranks(&self, report: &mut TickReport, winner: &AgentId) {
        let store = &self.store;
        match retry(&self.retry, "list_agents", || store.list_agents()).await {
            Ok(agents) => {
                let incumbents: Vec<AgentId> = agents
                    .iter()
                    .filter(|a| a.rank == Rank::TOP)
                    .filter(|a| &a.id != winner)
                    .filter(|a| !self.policy.exclusion.excludes(a))
                    .map(|a| a.id.clone())
                    .collect();
                if let Err(err) = retry(&self.retry, "demote_rank", || {
                    store.demote_rank(&incumbents)
                })
                .await
                {
                    report.fail("demote_rank", err);
                }
            }
            Err(err) => report.fail("list_agents", err),
        }

        if let Err(err) = retry(&self.retry, "promote_rank", || store.promote_rank(winner)).await {
            report.fail("promote_rank", err);
        }
    }
}

fn tally_delegates<'a>(results: impl Iterator<Item = &'a StateResult>) -> BTreeMap<AgentId, u32> {
    let mut totals = BTreeMap::new();
    for result in results {
        *totals.entry(result.winner_agent_id.clone()).or_insert(0) += result.delegates;
    }
    totals
}

/// Most delegates, then merit, then lowest id.
fn overall_winner(
    totals: &BTreeMap<AgentId, u32>,
    slate: &[Candidate],
    population: &[Agent],
) -> Option<(AgentId, u32)> {
    let mut merit: HashMap<&AgentId, f64> =
        population.iter().map(|a| (&a.id, a.merit_score)).collect();
    for candidate in slate {
        merit.insert(&candidate.agent_id, candidate.merit_score);
    }
    let merit_of = |id: &AgentId| merit.get(id).copied().unwrap_or(0.0);

    totals
        .iter()
        .max_by(|(a, da), (b, db)| {
            da.cmp(db)
                .then_with(|| {
                    merit_of(*a)
                        .partial_cmp(&merit_of(*b))
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| b.cmp(a))
        })
        .map(|(id, delegates)| (id.clone(), *delegates))
}

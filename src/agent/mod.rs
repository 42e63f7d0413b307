//! Five-stage query pipeline: analyze the query, search funds, fetch
//! details, analyze the data, compose the final answer.

pub mod parse;
pub mod prompts;

use crate::core::fund::{FundDataProvider, FundDetail, FundSummary};
use crate::core::llm::{ChatMessage, TextGenerator};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Limit per named-fund search in stage 2.
const SEARCH_LIMIT_PER_NAME: usize = 5;
/// Limit for the raw-query fallback search in stage 2.
const FALLBACK_SEARCH_LIMIT: usize = 10;
/// Detail fetches are capped in stage 3 to avoid hammering the source.
const DETAIL_FETCH_CAP: usize = 3;
/// The final response stage runs at a higher creativity setting than
/// the analysis stages.
const FINAL_RESPONSE_TEMPERATURE: f64 = 0.3;

pub const NO_FUNDS_RESPONSE: &str = "I couldn't find any mutual funds matching your query. Could you please provide more specific information?";

/// Identifier for each pipeline stage, in fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AnalyzeQuery,
    SearchFunds,
    FetchDetails,
    AnalyzeFunds,
    FinalResponse,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::AnalyzeQuery => Some(Stage::SearchFunds),
            Stage::SearchFunds => Some(Stage::FetchDetails),
            Stage::FetchDetails => Some(Stage::AnalyzeFunds),
            Stage::AnalyzeFunds => Some(Stage::FinalResponse),
            Stage::FinalResponse => None,
        }
    }

    /// Phrase emitted in streaming mode once the stage completes.
    pub fn progress_message(self) -> &'static str {
        match self {
            Stage::AnalyzeQuery => "Analyzing your query about mutual funds...\n\n",
            Stage::SearchFunds => "Searching for relevant mutual funds...\n\n",
            Stage::FetchDetails => "Fetching detailed fund information...\n\n",
            Stage::AnalyzeFunds => "Analyzing fund performance and characteristics...\n\n",
            Stage::FinalResponse => "",
        }
    }
}

/// How stage 4 resolved, kept on the state so the pipeline can skip
/// the final stage when nothing was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    NoFunds,
    SingleFund,
    Comparison,
}

/// Unit of work threaded through the pipeline. Each stage consumes the
/// state and returns it with its own additions; nothing is removed.
#[derive(Debug, Default)]
pub struct AgentState {
    pub query: String,
    pub history: Vec<ChatMessage>,
    pub query_analysis: Option<String>,
    pub fund_names: Vec<String>,
    pub search_results: Vec<FundSummary>,
    pub fund_details: Vec<FundDetail>,
    pub fund_analysis: Option<String>,
    pub analysis_outcome: Option<AnalysisOutcome>,
    pub response: Option<String>,
}

impl AgentState {
    pub fn new(query: impl Into<String>) -> Self {
        AgentState {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// The query orchestration pipeline. Stages run strictly sequentially;
/// fan-out within a stage preserves input order, so deduplication, the
/// detail-fetch cap and comparison ordering are deterministic.
pub struct FundAgent {
    funds: Arc<dyn FundDataProvider>,
    generator: Arc<dyn TextGenerator>,
    temperature: f64,
}

impl FundAgent {
    pub fn new(
        funds: Arc<dyn FundDataProvider>,
        generator: Arc<dyn TextGenerator>,
        temperature: f64,
    ) -> Self {
        FundAgent {
            funds,
            generator,
            temperature,
        }
    }

    /// Runs the pipeline and returns the final answer.
    pub async fn run(&self, query: &str) -> Result<String> {
        let mut state = AgentState::new(query);
        let mut stage = Some(Stage::AnalyzeQuery);
        while let Some(current) = stage {
            state = self.advance(current, state).await?;
            stage = self.next_stage(current, &state);
        }
        state
            .response
            .context("Pipeline finished without a response")
    }

    /// Runs the pipeline, emitting a progress phrase after each of the
    /// first four stages and the answer as incremental chunks.
    pub async fn run_stream(&self, query: &str, tx: mpsc::Sender<String>) -> Result<()> {
        let mut state = AgentState::new(query);
        let mut stage = Some(Stage::AnalyzeQuery);
        while let Some(current) = stage {
            state = if current == Stage::FinalResponse {
                self.final_response_stream(state, &tx).await?
            } else {
                let state = self.advance(current, state).await?;
                let _ = tx.send(current.progress_message().to_string()).await;
                state
            };
            stage = self.next_stage(current, &state);
        }

        // When stage 4 short-circuited, the fixed message is the whole
        // answer; emit it as a single chunk.
        if state.analysis_outcome == Some(AnalysisOutcome::NoFunds)
            && let Some(response) = state.response
        {
            let _ = tx.send(response).await;
        }
        Ok(())
    }

    fn next_stage(&self, current: Stage, state: &AgentState) -> Option<Stage> {
        // No funds found: the fixed message stands as the final answer
        // and the generation stage is skipped.
        if current == Stage::AnalyzeFunds
            && state.analysis_outcome == Some(AnalysisOutcome::NoFunds)
        {
            return None;
        }
        current.next()
    }

    async fn advance(&self, stage: Stage, state: AgentState) -> Result<AgentState> {
        debug!(?stage, "Advancing pipeline");
        match stage {
            Stage::AnalyzeQuery => self.analyze_query(state).await,
            Stage::SearchFunds => self.search_funds(state).await,
            Stage::FetchDetails => self.fetch_details(state).await,
            Stage::AnalyzeFunds => self.analyze_funds(state).await,
            Stage::FinalResponse => self.final_response(state).await,
        }
    }

    async fn analyze_query(&self, mut state: AgentState) -> Result<AgentState> {
        let messages = prompts::query_analysis(&state.query);
        let analysis = self.generator.generate(&messages, self.temperature).await?;

        state.fund_names = parse::extract_fund_names(&analysis);
        debug!(names = ?state.fund_names, "Extracted fund name candidates");
        state.query_analysis = Some(analysis);
        state.history.push(ChatMessage::user(state.query.clone()));
        state
            .history
            .push(ChatMessage::assistant("I'm analyzing your query about mutual funds."));
        Ok(state)
    }

    async fn search_funds(&self, mut state: AgentState) -> Result<AgentState> {
        let results = if !state.fund_names.is_empty() {
            self.search_all(&state.fund_names).await
        } else {
            let messages = prompts::fund_search(&state.query, &state.history);
            let terms_text = self.generator.generate(&messages, self.temperature).await?;

            match parse::parse_search_terms(&terms_text) {
                Ok(terms) => self.search_all(&terms).await,
                Err(e) => {
                    // Fallback: search using the original query
                    debug!(error = %e, "Falling back to raw query search");
                    self.funds
                        .search_funds(&state.query, FALLBACK_SEARCH_LIMIT)
                        .await
                }
            }
        };

        state.search_results = parse::dedup_by_scheme_code(results);
        info!(count = state.search_results.len(), "Search complete");
        state.history.push(ChatMessage::assistant(format!(
            "I found {} funds that match your query.",
            state.search_results.len()
        )));
        Ok(state)
    }

    /// Runs one catalogue search per term concurrently, keeping term
    /// order in the combined result.
    async fn search_all(&self, terms: &[String]) -> Vec<FundSummary> {
        let searches = terms
            .iter()
            .map(|term| self.funds.search_funds(term, SEARCH_LIMIT_PER_NAME));
        join_all(searches).await.into_iter().flatten().collect()
    }

    async fn fetch_details(&self, mut state: AgentState) -> Result<AgentState> {
        let fetches = state
            .search_results
            .iter()
            .take(DETAIL_FETCH_CAP)
            .map(|summary| self.funds.fund_details(&summary.scheme_code, true));
        state.fund_details = join_all(fetches).await.into_iter().flatten().collect();

        info!(count = state.fund_details.len(), "Detail fetch complete");
        state.history.push(ChatMessage::assistant(format!(
            "I've gathered detailed information on {} funds.",
            state.fund_details.len()
        )));
        Ok(state)
    }

    async fn analyze_funds(&self, mut state: AgentState) -> Result<AgentState> {
        if state.fund_details.is_empty() {
            state.analysis_outcome = Some(AnalysisOutcome::NoFunds);
            state.response = Some(NO_FUNDS_RESPONSE.to_string());
            state
                .history
                .push(ChatMessage::assistant("I couldn't find any mutual funds matching your query."));
            return Ok(state);
        }

        let analysis = if state.fund_details.len() >= 2 && parse::is_comparison_query(&state.query)
        {
            state.analysis_outcome = Some(AnalysisOutcome::Comparison);
            let fund_data_1 = serde_json::to_string_pretty(&state.fund_details[0])?;
            let fund_data_2 = serde_json::to_string_pretty(&state.fund_details[1])?;
            let messages =
                prompts::fund_comparison(&state.query, &state.history, &fund_data_1, &fund_data_2);
            self.generator.generate(&messages, self.temperature).await?
        } else {
            state.analysis_outcome = Some(AnalysisOutcome::SingleFund);
            let fund_data = serde_json::to_string_pretty(&state.fund_details[0])?;
            let messages = prompts::fund_analysis(&state.query, &state.history, &fund_data);
            self.generator.generate(&messages, self.temperature).await?
        };

        state.fund_analysis = Some(analysis);
        state
            .history
            .push(ChatMessage::assistant("I've analyzed the fund data based on your query."));
        Ok(state)
    }

    async fn final_response(&self, mut state: AgentState) -> Result<AgentState> {
        let context = state.fund_analysis.clone().unwrap_or_default();
        let messages = prompts::final_response(&state.query, &state.history, &context);
        let response = self
            .generator
            .generate(&messages, FINAL_RESPONSE_TEMPERATURE)
            .await?;

        state.history.push(ChatMessage::assistant(response.clone()));
        state.response = Some(response);
        Ok(state)
    }

    async fn final_response_stream(
        &self,
        mut state: AgentState,
        tx: &mpsc::Sender<String>,
    ) -> Result<AgentState> {
        let context = state.fund_analysis.clone().unwrap_or_default();
        let messages = prompts::final_response(&state.query, &state.history, &context);

        let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(32);
        let generator = Arc::clone(&self.generator);
        let task = tokio::spawn(async move {
            generator
                .generate_stream(&messages, FINAL_RESPONSE_TEMPERATURE, chunk_tx)
                .await
        });

        let mut response = String::new();
        while let Some(chunk) = chunk_rx.recv().await {
            response.push_str(&chunk);
            let _ = tx.send(chunk).await;
        }
        task.await??;

        state.history.push(ChatMessage::assistant(response.clone()));
        state.response = Some(response);
        Ok(state)
    }
}

//! Chat endpoint handlers
//!
//! POST /chat runs the full retrieval-augmented flow: load history, retrieve,
//! cite, assemble the prompt, generate (or fall back), persist the turn.

use axum::extract::{rejection::JsonRejection, Extension, Json, Path, State};
use axum::response::Json as ResponseJson;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::server::error::{ApiResult, ServiceError};
use crate::server::middleware::RequestContext;
use crate::server::models::conversation::{Citation, ConversationTurn};
use crate::server::services::{
  context::render as render_context,
  generation::{fallback_message, GenerationRequest},
  observer::Trace,
  retrieval::RetrievedPassage,
};
use crate::server::state::{SharedState, MAX_TOP_K};
use crate::server::types::{BaseResponse, ChatHistoryResponse, ChatRequest, ChatResponse};

/// Length of the reasoning trace returned with every answer
pub const REASONING_STEPS: usize = 5;

const CHAT_INSTRUCTIONS: &str = "You are CareFinder, an assistant answering questions about healthcare \
facilities in Ghana. Answer only from the facility records below, cite sources as [Source N], and say so \
plainly when the records do not contain the answer.";

/// Fixed-length description of how an answer was produced
pub fn reasoning_steps(
  history_turns: usize,
  passages: &[RetrievedPassage],
  top_k: usize,
  fallback: bool,
) -> [String; REASONING_STEPS] {
  let top_match = match passages.first() {
    Some(best) => format!("Top match: {} (relevance {:.2})", best.facility_id, best.score),
    None => "No facility records matched the question".to_string(),
  };
  let generation = if fallback {
    "Language model unavailable; returned a fallback summary".to_string()
  } else {
    "Generated the answer with the language model".to_string()
  };

  [
    format!("Loaded {history_turns} prior turns from the session history"),
    format!("Retrieved {} facility records (top_k = {top_k})", passages.len()),
    top_match,
    format!("Assembled prompt context from {} records and {history_turns} turns", passages.len()),
    generation,
  ]
}

/// POST /chat - Answer a question with citations
pub async fn chat(
  Extension(context): Extension<RequestContext>,
  State(state): State<SharedState>,
  payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
  let transaction_id = Uuid::new_v4();

  let Json(request) =
    payload.map_err(|e| ServiceError::BadRequest(format!("Invalid chat request: {}", e.body_text())).at(transaction_id))?;

  let message = request.message.trim().to_string();
  if message.is_empty() {
    return Err(ServiceError::BadRequest("Field 'message' must not be empty".to_string()).at(transaction_id));
  }

  let top_k = request.top_k.unwrap_or(state.default_top_k).min(MAX_TOP_K);
  let session_id = request
    .session_id
    .map(|id| id.trim().to_string())
    .filter(|id| !id.is_empty())
    .unwrap_or_else(|| Uuid::new_v4().to_string());

  let mut trace = Trace::start(state.observer.as_ref(), "chat");

  let history = state
    .assembler
    .load_history(&session_id)
    .await
    .map_err(|e| ServiceError::from(e).at(transaction_id))?;
  trace.step("history", json!({ "session_id": session_id, "turns": history.len() }));

  let passages = match state.retrieval.retrieve(&message, top_k).await {
    Ok(passages) => passages,
    Err(e) => {
      context.log_warn(&format!("Retrieval failed, answering without records: {}", e), "chat-api").await;
      Vec::new()
    }
  };
  trace.step("retrieval", json!({ "top_k": top_k, "results": passages.len() }));

  let citations: Vec<Citation> =
    passages.iter().map(|p| Citation::new(&p.facility_id, &p.passage, p.score)).collect();

  let system = format!("{CHAT_INSTRUCTIONS}\n\n{}", render_context(&passages, &history));
  let generation = GenerationRequest::new(system, message.as_str()).with_session_label(&session_id);

  let (response, fallback) = match state.generator.generate(generation).await {
    Ok(text) => (text, false),
    Err(e) => {
      context.log_warn(&format!("Generation failed, using fallback: {}", e), "chat-api").await;
      (fallback_message(passages.len()), true)
    }
  };
  trace.step("generation", json!({ "fallback": fallback }));

  let reasoning_steps = reasoning_steps(history.len(), &passages, top_k, fallback).to_vec();

  let turn = ConversationTurn {
    session_id: session_id.clone(),
    message,
    response: response.clone(),
    citations: citations.clone(),
    reasoning_steps: reasoning_steps.clone(),
    created_at: Utc::now(),
  };
  state.store.append_turn(&turn).await.map_err(|e| ServiceError::from(e).at(transaction_id))?;
  trace.step("persist", json!({ "citations": citations.len() }));

  context
    .log_success(&format!("Answered chat turn for session {session_id} with {} citations", citations.len()), "chat-api")
    .await;

  let response = ChatResponse {
    response,
    citations,
    reasoning_steps,
    session_id,
    history_turns: history.len(),
    trace_id: trace.id(),
  };
  Ok(ResponseJson(BaseResponse::success(response, transaction_id)))
}

/// GET /chat/history/{session_id} - Stored turns, oldest first
pub async fn history(
  State(state): State<SharedState>,
  Path(session_id): Path<String>,
) -> ApiResult<ChatHistoryResponse> {
  let transaction_id = Uuid::new_v4();

  let turns = state
    .store
    .session_history(&session_id)
    .await
    .map_err(|e| ServiceError::from(e).at(transaction_id))?;

  if turns.is_empty() {
    return Err(ServiceError::NotFound(format!("Session '{session_id}' not found")).at(transaction_id));
  }

  Ok(ResponseJson(BaseResponse::success(ChatHistoryResponse { session_id, turns }, transaction_id)))
}

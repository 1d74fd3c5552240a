//! Client-side session store for the reading-strategy learning flow.
//!
//! The store owns all per-session state and is the only layer that talks to
//! the backend. Views read snapshots and invoke actions; actions call the
//! request capability, run the payload through the normalizer, and commit
//! the result under a lock. Every action releases the loading flag on every
//! exit path and surfaces failures through the shared error slot rather than
//! by returning errors to the caller.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use shared::{
    domain::{ChatMessage, ChatRole, Delivery, Phase},
    protocol::{ChatRequest, ExamResultSubmission, StrategyResultSubmission, UserProfileDraft},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod api;
pub mod normalize;
pub mod persist;

pub use api::{ApiCallError, HttpReadingApi, ReadingApi, AI_TIMEOUT, DATA_TIMEOUT};
pub use normalize::{SubmitOutcome, FALLBACK_STRATEGY_GUIDE};
pub use persist::{DurableSessionStore, MemorySessionStore, PersistedSession, SessionPersistence};

/// Shown whenever a request dies before the server answers.
pub const NO_RESPONSE_MESSAGE: &str = "没有收到服务器响应，请检查后端服务是否运行";

const INTRODUCTION_FAILED: &str = "获取系统介绍失败";
const SELF_RATE_FAILED: &str = "获取自评量表失败";
const CREATE_PROFILE_FAILED: &str = "创建用户画像失败";
const STRATEGIES_FAILED: &str = "获取策略列表失败";
const SUBMIT_EXAM_FAILED: &str = "提交试卷结果失败";
const SUBMIT_STRATEGY_FAILED: &str = "提交策略问卷结果失败";
const USER_PROFILE_FAILED: &str = "获取用户信息失败";
const PROFILE_ANALYSIS_FAILED: &str = "分析用户画像失败";
const WRONG_ANSWERS_FAILED: &str = "分析错题失败";
const SUGGESTIONS_FAILED: &str = "获取策略建议失败";
const CHAT_FAILED: &str = "发送消息失败";
const FINAL_SUMMARY_FAILED: &str = "获取学习总结失败";

/// Everything a view can observe about the session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user_name: String,
    pub user_profile: Option<Value>,
    pub introduction: String,
    pub self_rate_items: Vec<Value>,
    pub exam_data: HashMap<i64, Value>,
    pub strategy_items: Vec<Value>,
    pub profile_analysis: String,
    pub wrong_answers_analysis: String,
    pub strategy_suggestions: String,
    pub final_summary: String,
    pub chat_history: Vec<ChatMessage>,
    pub loading: bool,
    pub error: Option<String>,
    pub current_phase: Phase,
}

/// The session store. Cheap to share; all mutation happens behind the lock.
pub struct SessionStore {
    api: Arc<dyn ReadingApi>,
    persistence: Arc<dyn SessionPersistence>,
    state: Mutex<SessionState>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn ReadingApi>, persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            api,
            persistence,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Builds a store and restores the durable session slice into it.
    pub async fn open(
        api: Arc<dyn ReadingApi>,
        persistence: Arc<dyn SessionPersistence>,
    ) -> anyhow::Result<Self> {
        let restored = persistence.load().await?;
        let store = Self::new(api, persistence);
        {
            let mut state = store.state.lock().await;
            if let Some(name) = restored.user_name {
                info!(user = %name, "restored session identity");
                state.user_name = name;
            }
            if let Some(phase) = restored.phase {
                state.current_phase = phase;
            }
        }
        Ok(store)
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        !self.state.lock().await.user_name.is_empty()
    }

    pub async fn current_phase(&self) -> Phase {
        self.state.lock().await.current_phase
    }

    /// Screens of the current phase, for progress rendering.
    pub async fn phase_progress(&self) -> (Phase, &'static [&'static str]) {
        let phase = self.current_phase().await;
        (phase, phase.screens())
    }

    async fn begin_loading(&self) {
        self.state.lock().await.loading = true;
    }

    async fn end_loading(&self) {
        self.state.lock().await.loading = false;
    }

    async fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "session action failed");
        self.state.lock().await.error = Some(message);
    }

    /// Maps a call failure to user-facing text: transport failures get the
    /// shared no-response message, server rejections keep their own text when
    /// they carry any, otherwise the action's fallback applies.
    fn call_error_text(err: &ApiCallError, fallback: &str) -> String {
        match err {
            ApiCallError::NoResponse(_) => NO_RESPONSE_MESSAGE.to_string(),
            ApiCallError::Server { message, .. } if !message.is_empty() => message.clone(),
            ApiCallError::Server { .. } => fallback.to_string(),
        }
    }

    async fn record_call_error(&self, err: &ApiCallError, fallback: &str) {
        self.record_error(Self::call_error_text(err, fallback)).await;
    }

    /// Identity gate shared by the personalised actions. When nobody is
    /// logged in the action is a no-op, not an error.
    async fn identity(&self) -> Option<String> {
        let state = self.state.lock().await;
        if state.user_name.is_empty() {
            debug!("skipping personalised action without an identity");
            None
        } else {
            Some(state.user_name.clone())
        }
    }

    /// Shared commit path for text-valued endpoints: normalize the payload,
    /// apply it on success, record an error otherwise. Returns the committed
    /// text (empty when nothing was committed).
    async fn commit_text(
        &self,
        result: Result<Value, ApiCallError>,
        shape: &normalize::TextShape,
        fallback_error: &str,
        apply: impl FnOnce(&mut SessionState, String),
    ) -> String {
        match result {
            Ok(payload) => match normalize::text(&payload, shape) {
                Some(text) => {
                    let mut state = self.state.lock().await;
                    apply(&mut state, text.clone());
                    text
                }
                None => {
                    self.record_error(fallback_error).await;
                    String::new()
                }
            },
            Err(err) => {
                self.record_call_error(&err, fallback_error).await;
                String::new()
            }
        }
    }

    pub async fn fetch_introduction(&self) -> String {
        self.begin_loading().await;
        let result = self.api.get_introduction().await;
        let text = self
            .commit_text(result, &normalize::INTRODUCTION, INTRODUCTION_FAILED, |state, text| {
                state.introduction = text;
            })
            .await;
        self.end_loading().await;
        text
    }

    pub async fn fetch_self_rate_items(&self) -> Vec<Value> {
        self.begin_loading().await;
        let items = match self.api.get_self_rate_items().await {
            Ok(payload) => match normalize::items(&payload) {
                Some(items) => {
                    self.state.lock().await.self_rate_items = items.clone();
                    items
                }
                None => {
                    self.record_error(SELF_RATE_FAILED).await;
                    Vec::new()
                }
            },
            Err(err) => {
                self.record_call_error(&err, SELF_RATE_FAILED).await;
                Vec::new()
            }
        };
        self.end_loading().await;
        items
    }

    /// Registers the user. The name only becomes the session identity once
    /// the server has not explicitly rejected the profile.
    pub async fn create_user_profile(&self, draft: &UserProfileDraft) -> bool {
        self.begin_loading().await;
        let accepted = match self.api.create_user_profile(draft).await {
            Ok(payload) => match normalize::submit_outcome(&payload) {
                SubmitOutcome::Accepted | SubmitOutcome::Ambiguous => {
                    self.set_user_name(&draft.name).await;
                    true
                }
                SubmitOutcome::Rejected(reason) => {
                    let message = if reason.is_empty() {
                        CREATE_PROFILE_FAILED.to_string()
                    } else {
                        reason
                    };
                    self.record_error(message).await;
                    false
                }
            },
            Err(err) => {
                self.record_call_error(&err, CREATE_PROFILE_FAILED).await;
                false
            }
        };
        self.end_loading().await;
        accepted
    }

    /// Adopts `name` as the session identity and persists it. A persistence
    /// failure keeps the in-memory identity and is only logged.
    pub async fn set_user_name(&self, name: &str) {
        self.state.lock().await.user_name = name.to_string();
        if let Err(err) = self.persistence.save_user_name(name).await {
            warn!(%err, "failed to persist user name");
        }
    }

    /// Fetches one exam and merges it into the per-exam map, replacing any
    /// earlier copy of the same exam and leaving the others alone.
    pub async fn fetch_exam(&self, exam_id: i64) -> Option<Value> {
        self.begin_loading().await;
        let fallback = format!("获取试卷{exam_id}失败");
        let exam = match self.api.get_exam(exam_id).await {
            Ok(payload) => match normalize::record(&payload, normalize::EXAM_MARKERS) {
                Some(exam) => {
                    self.state
                        .lock()
                        .await
                        .exam_data
                        .insert(exam_id, exam.clone());
                    Some(exam)
                }
                None => {
                    self.record_error(fallback).await;
                    None
                }
            },
            Err(err) => {
                self.record_call_error(&err, &fallback).await;
                None
            }
        };
        self.end_loading().await;
        exam
    }

    pub async fn fetch_strategies(&self) -> Vec<Value> {
        self.begin_loading().await;
        let items = match self.api.get_strategies().await {
            Ok(payload) => match normalize::items(&payload) {
                Some(items) => {
                    self.state.lock().await.strategy_items = items.clone();
                    items
                }
                None => {
                    self.record_error(STRATEGIES_FAILED).await;
                    Vec::new()
                }
            },
            Err(err) => {
                self.record_call_error(&err, STRATEGIES_FAILED).await;
                Vec::new()
            }
        };
        self.end_loading().await;
        items
    }

    /// Submits exam answers. An explicit server rejection only fails the
    /// return value; no error is surfaced because the views retry these.
    pub async fn submit_exam_result(
        &self,
        exam_id: i64,
        score: i64,
        wrong_questions: Vec<String>,
    ) -> bool {
        let name = self.state.lock().await.user_name.clone();
        self.begin_loading().await;
        let submission = ExamResultSubmission {
            name,
            exam_id,
            score,
            wrong_questions,
        };
        let accepted = match self.api.submit_exam_result(&submission).await {
            Ok(payload) => normalize::submit_outcome(&payload).is_success(),
            Err(err) => {
                self.record_call_error(&err, SUBMIT_EXAM_FAILED).await;
                false
            }
        };
        self.end_loading().await;
        accepted
    }

    pub async fn submit_strategy_result(&self, score: i64, is_pre_test: bool) -> bool {
        let name = self.state.lock().await.user_name.clone();
        self.begin_loading().await;
        let submission = StrategyResultSubmission {
            name,
            score,
            is_pre_test,
        };
        let accepted = match self.api.submit_strategy_result(&submission).await {
            Ok(payload) => normalize::submit_outcome(&payload).is_success(),
            Err(err) => {
                self.record_call_error(&err, SUBMIT_STRATEGY_FAILED).await;
                false
            }
        };
        self.end_loading().await;
        accepted
    }

    pub async fn fetch_user_profile(&self) -> Option<Value> {
        let Some(name) = self.identity().await else {
            return None;
        };
        self.begin_loading().await;
        let profile = match self.api.get_user_profile(&name).await {
            Ok(payload) => match normalize::user_record(&payload) {
                Some(profile) => {
                    self.state.lock().await.user_profile = Some(profile.clone());
                    Some(profile)
                }
                None => {
                    self.record_error(USER_PROFILE_FAILED).await;
                    None
                }
            },
            Err(err) => {
                self.record_call_error(&err, USER_PROFILE_FAILED).await;
                None
            }
        };
        self.end_loading().await;
        profile
    }

    pub async fn fetch_profile_analysis(&self) -> String {
        let Some(name) = self.identity().await else {
            return String::new();
        };
        self.begin_loading().await;
        let result = self.api.analyze_profile(&name).await;
        let text = self
            .commit_text(result, &normalize::ANALYSIS, PROFILE_ANALYSIS_FAILED, |state, text| {
                state.profile_analysis = text;
            })
            .await;
        self.end_loading().await;
        text
    }

    pub async fn fetch_wrong_answers_analysis(&self) -> String {
        let Some(name) = self.identity().await else {
            return String::new();
        };
        self.begin_loading().await;
        let result = self.api.analyze_wrong_answers(&name).await;
        let text = self
            .commit_text(result, &normalize::ANALYSIS, WRONG_ANSWERS_FAILED, |state, text| {
                state.wrong_answers_analysis = text;
            })
            .await;
        self.end_loading().await;
        text
    }

    /// Fetches personalised strategy suggestions. This view must never render
    /// empty, so every failure path substitutes the generic guide after
    /// recording its error.
    pub async fn fetch_strategy_suggestions(&self) -> String {
        let Some(name) = self.identity().await else {
            return String::new();
        };
        self.begin_loading().await;
        let text = match self.api.suggest_strategies(&name).await {
            Ok(payload) => match normalize::text(&payload, &normalize::SUGGESTIONS) {
                Some(text) => {
                    self.state.lock().await.strategy_suggestions = text.clone();
                    text
                }
                None => {
                    self.record_error(SUGGESTIONS_FAILED).await;
                    self.substitute_fallback_guide().await
                }
            },
            Err(err) => {
                self.record_call_error(&err, SUGGESTIONS_FAILED).await;
                self.substitute_fallback_guide().await
            }
        };
        self.end_loading().await;
        text
    }

    async fn substitute_fallback_guide(&self) -> String {
        info!("substituting generic strategy guide");
        self.state.lock().await.strategy_suggestions = FALLBACK_STRATEGY_GUIDE.to_string();
        FALLBACK_STRATEGY_GUIDE.to_string()
    }

    /// Sends a chat message. The user's entry is appended optimistically
    /// before the request goes out and settled once the outcome is known, so
    /// the transcript always shows what was asked even when the reply fails.
    pub async fn send_chat_message(&self, message: &str) -> Option<ChatMessage> {
        let Some(name) = self.identity().await else {
            return None;
        };
        self.state
            .lock()
            .await
            .chat_history
            .push(ChatMessage::user(message));
        self.begin_loading().await;
        let request = ChatRequest {
            name,
            message: message.to_string(),
        };
        let reply = match self.api.chat(&request).await {
            Ok(payload) => match normalize::text(&payload, &normalize::CHAT_REPLY) {
                Some(text) => {
                    let entry = ChatMessage::assistant(text);
                    let mut state = self.state.lock().await;
                    settle_pending_user_message(&mut state, Delivery::Answered);
                    state.chat_history.push(entry.clone());
                    Some(entry)
                }
                None => {
                    self.settle_and_record_chat_failure(CHAT_FAILED.to_string())
                        .await;
                    None
                }
            },
            Err(err) => {
                let message = Self::call_error_text(&err, CHAT_FAILED);
                self.settle_and_record_chat_failure(message).await;
                None
            }
        };
        self.end_loading().await;
        reply
    }

    async fn settle_and_record_chat_failure(&self, message: String) {
        warn!(error = %message, "chat exchange failed");
        let mut state = self.state.lock().await;
        settle_pending_user_message(&mut state, Delivery::Unanswered);
        state.error = Some(message);
    }

    pub async fn fetch_final_summary(&self) -> String {
        let Some(name) = self.identity().await else {
            return String::new();
        };
        self.begin_loading().await;
        let result = self.api.get_final_summary(&name).await;
        let text = self
            .commit_text(result, &normalize::FINAL_SUMMARY, FINAL_SUMMARY_FAILED, |state, text| {
                state.final_summary = text;
            })
            .await;
        self.end_loading().await;
        text
    }

    /// Moves the flow to `phase` and persists the position. A persistence
    /// failure keeps the in-memory phase and is only logged.
    pub async fn set_current_phase(&self, phase: Phase) {
        info!(phase = phase.as_str(), "phase transition");
        self.state.lock().await.current_phase = phase;
        if let Err(err) = self.persistence.save_phase(phase).await {
            warn!(%err, "failed to persist phase");
        }
    }

    pub async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }

    /// Drops the whole session, memory and durable slice both.
    pub async fn reset_session(&self) {
        info!("resetting session");
        *self.state.lock().await = SessionState::default();
        if let Err(err) = self.persistence.clear().await {
            warn!(%err, "failed to clear persisted session");
        }
    }
}

/// Finalizes the most recent still-pending user entry. Replies settle their
/// own question even if the view let another send slip in between.
fn settle_pending_user_message(state: &mut SessionState, delivery: Delivery) {
    if let Some(entry) = state
        .chat_history
        .iter_mut()
        .rev()
        .find(|entry| entry.role == ChatRole::User && entry.delivery == Delivery::Pending)
    {
        entry.delivery = delivery;
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

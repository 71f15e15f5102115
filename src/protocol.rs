use serde::{Deserialize, Serialize};

/// Requests a UI surface (popup, side panel, content script) can send to the
/// mediator. The set is closed; dispatch is 1:1 keyed by the `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Request {
    #[serde(rename = "check-auth")]
    CheckAuth,

    #[serde(rename = "capture-screenshot")]
    CaptureScreenshot,

    #[serde(rename = "create-journal-entry", rename_all = "camelCase")]
    CreateJournalEntry {
        screenshot: String,
        trade_details: TradeDetails,
        timestamp: String,
    },

    #[serde(rename = "get-strategies")]
    GetStrategies,

    #[serde(rename = "send-chat-message", rename_all = "camelCase")]
    SendChatMessage {
        message: String,
        #[serde(default)]
        strategy_context: Option<String>,
        #[serde(default)]
        conversation_history: Option<Vec<ChatTurn>>,
    },

    #[serde(rename = "open-auth-flow")]
    OpenAuthFlow,

    #[serde(rename = "open-side-panel")]
    OpenSidePanel,

    /// One-way completion signal pushed in from the external sign-in context.
    #[serde(rename = "auth-complete-notification")]
    AuthCompleteNotification { success: bool },
}

/// Typed responses, one shape per request type. Every handler produces
/// exactly one of these regardless of which internal stage failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Response {
    #[serde(rename = "check-auth", rename_all = "camelCase")]
    CheckAuth {
        is_authenticated: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<UserInfo>,
    },

    #[serde(rename = "capture-screenshot")]
    CaptureScreenshot { screenshot: String, success: bool },

    #[serde(rename = "create-journal-entry")]
    CreateJournalEntry(JournalSubmissionResult),

    #[serde(rename = "get-strategies")]
    GetStrategies {
        strategies: Vec<Strategy>,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    #[serde(rename = "send-chat-message", rename_all = "camelCase")]
    SendChatMessage {
        message: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggested_actions: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        related_rules: Option<Vec<String>>,
    },

    #[serde(rename = "open-auth-flow", rename_all = "camelCase")]
    OpenAuthFlow {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_url: Option<String>,
    },

    #[serde(rename = "open-side-panel")]
    OpenSidePanel {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    #[serde(rename = "auth-complete-notification")]
    AuthCompleteNotification { received: bool },
}

impl Request {
    /// Stable message-type identifier, for logging. Bodies may carry large
    /// screenshot payloads, so the full request is never logged.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::CheckAuth => "check-auth",
            Request::CaptureScreenshot => "capture-screenshot",
            Request::CreateJournalEntry { .. } => "create-journal-entry",
            Request::GetStrategies => "get-strategies",
            Request::SendChatMessage { .. } => "send-chat-message",
            Request::OpenAuthFlow => "open-auth-flow",
            Request::OpenSidePanel => "open-side-panel",
            Request::AuthCompleteNotification { .. } => "auth-complete-notification",
        }
    }
}

/// Trade metadata attached to a capture. All free-text fields are
/// caller-supplied; nothing beyond presence is validated locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDetails {
    pub pair: String,
    pub timeframe: String,
    pub strategy_id: String,
    pub strategy_component: String,
    pub notes: String,
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Setup,
    Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

/// Identity fields embedded in a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
}

/// Outcome contract of a journal submission, returned to the UI surface
/// regardless of which pipeline stage failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalSubmissionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One strategy as returned by the strategies-list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One turn of conversation history forwarded to the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

// ── Wire envelopes ───────────────────────────────────────────────

/// Inbound frame: request plus the caller-chosen correlation id. Responses
/// echo the id so concurrent requests may complete out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbound {
    pub id: u64,
    #[serde(flatten)]
    pub request: Request,
}

/// Outbound frame paired to an [`Inbound`] by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outbound {
    pub id: u64,
    #[serde(flatten)]
    pub response: Response,
}

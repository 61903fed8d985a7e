use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::oneshot;

/// How risky a decision is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Easily reversible.
    Low,
    /// The default when the model doesn't say.
    #[default]
    Medium,
    /// Hard to reverse or expensive.
    High,
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// The answer of a reviewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalDecision {
    /// Whether the decision was approved.
    pub approved: bool,
    /// Why it was rejected, if the reviewer said.
    pub why: Option<String>,
}

/// A decision waiting for a human.
///
/// The agent that raised the request stays blocked until [`approve`] or
/// [`reject`] is called. Dropping the request counts as a rejection.
///
/// [`approve`]: ApprovalRequest::approve
/// [`reject`]: ApprovalRequest::reject
pub struct ApprovalRequest {
    agent_id: String,
    decision: String,
    rationale: String,
    risk_level: RiskLevel,
    on_result: Option<Box<dyn FnOnce(ApprovalDecision) + Send>>,
}

impl ApprovalRequest {
    /// Creates a new request.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        agent_id: S1,
        decision: S2,
        rationale: S3,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            decision: decision.into(),
            rationale: rationale.into(),
            risk_level,
            on_result: None,
        }
    }

    /// Returns the agent asking for approval.
    #[inline]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Returns the decision to approve.
    #[inline]
    pub fn decision(&self) -> &str {
        &self.decision
    }

    /// Returns why the decision is recommended.
    #[inline]
    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    /// Returns the risk level.
    #[inline]
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Approves the request.
    #[inline]
    pub fn approve(self) {
        self.resolve(ApprovalDecision {
            approved: true,
            why: None,
        });
    }

    /// Rejects the request with an optional reason.
    #[inline]
    pub fn reject(self, reason: Option<String>) {
        self.resolve(ApprovalDecision {
            approved: false,
            why: reason,
        });
    }

    fn resolve(self, decision: ApprovalDecision) {
        let Some(on_result) = self.on_result else {
            return;
        };
        (on_result)(decision);
    }

    /// Attaches a channel and returns the receiving end.
    pub(crate) fn pending(mut self) -> (Self, oneshot::Receiver<ApprovalDecision>) {
        let (tx, rx) = oneshot::channel();
        self.on_result = Some(Box::new(move |result| {
            tx.send(result).ok();
        }));
        (self, rx)
    }
}

impl Debug for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalRequest")
            .field("agent_id", &self.agent_id)
            .field("decision", &self.decision)
            .field("rationale", &self.rationale)
            .field("risk_level", &self.risk_level)
            .finish_non_exhaustive()
    }
}

impl Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} risk)", self.decision, self.rationale, self.risk_level)
    }
}

/// What happens when an agent asks for human approval.
#[derive(Clone, Default)]
pub enum ApprovalPolicy {
    /// Approve everything. Used in development.
    AutoApprove,
    /// No approver is wired up. Requests are answered with a "not
    /// approved" result so the agent can report it.
    #[default]
    Unavailable,
    /// Hand the request to a reviewer and wait for the answer.
    Interactive(Arc<dyn Fn(ApprovalRequest) + Send + Sync>),
}

impl ApprovalPolicy {
    /// Creates an interactive policy from a handler.
    #[inline]
    pub fn interactive(handler: impl Fn(ApprovalRequest) + Send + Sync + 'static) -> Self {
        Self::Interactive(Arc::new(handler))
    }

    /// Resolves a request and returns the tool payload.
    pub(crate) async fn resolve(&self, request: ApprovalRequest) -> Value {
        let decision = request.decision.clone();
        match self {
            Self::AutoApprove => json!({
                "approved": true,
                "message": "Auto-approved in development mode",
                "decision": decision,
            }),
            Self::Unavailable => json!({
                "approved": false,
                "message": "Human approval required (not implemented yet)",
                "decision": decision,
                "action_required": "Implement human approval workflow",
            }),
            Self::Interactive(handler) => {
                let (request, rx) = request.pending();
                handler(request);
                match rx.await {
                    Ok(ApprovalDecision { approved: true, .. }) => json!({
                        "approved": true,
                        "message": "Approved by reviewer",
                        "decision": decision,
                    }),
                    Ok(ApprovalDecision { approved: false, why }) => json!({
                        "approved": false,
                        "message": "Rejected by reviewer",
                        "decision": decision,
                        "reason": why,
                    }),
                    Err(_) => json!({
                        "approved": false,
                        "message": "Approval request was dismissed",
                        "decision": decision,
                    }),
                }
            }
        }
    }
}

impl Debug for ApprovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoApprove => f.write_str("AutoApprove"),
            Self::Unavailable => f.write_str("Unavailable"),
            Self::Interactive(_) => f.write_str("Interactive"),
        }
    }
}

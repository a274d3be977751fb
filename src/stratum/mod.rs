//! Stratum surface for share submission
//!
//! Message types, per-session extra-nonce allocation, the invalid share
//! policy, and the mapping from share outcomes to stratum error codes. The
//! TCP transport itself lives outside this crate.

mod policy;
mod protocol;
mod session;

pub use policy::SharePolicy;
pub use protocol::{StratumMethod, StratumNotification, StratumRequest, StratumResponse};
pub use session::{ExtraNonceAllocator, Session, SessionId};

use crate::share::{RejectReason, ShareOutcome, SharePipeline, Submission};
use serde_json::Value;
use tracing::{info, warn};

/// Numeric stratum error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StratumErrorCode {
    /// Anything else, including size errors
    Other,
    /// Job not found or stale
    JobNotFound,
    /// Share already submitted
    Duplicate,
    /// Share below the share target
    LowDifficulty,
    /// Not authorized
    Unauthorized,
    /// Not subscribed
    NotSubscribed,
    /// Banned for invalid shares
    Banned,
}

impl StratumErrorCode {
    /// Wire value
    pub fn code(&self) -> i32 {
        match self {
            Self::Other => 20,
            Self::JobNotFound => 21,
            Self::Duplicate => 22,
            Self::LowDifficulty => 23,
            Self::Unauthorized => 24,
            Self::NotSubscribed => 25,
            Self::Banned => -1,
        }
    }

    /// Code for a rejected share
    pub fn for_reject(reason: &RejectReason) -> Self {
        match reason {
            RejectReason::InvalidSize(_)
            | RejectReason::InvalidEncoding
            | RejectReason::RejectedByNode => Self::Other,
            RejectReason::NoActiveWork | RejectReason::Stale => Self::JobNotFound,
            RejectReason::BelowTarget => Self::LowDifficulty,
            RejectReason::Duplicate => Self::Duplicate,
        }
    }
}

/// Rejections that point at a misbehaving miner. Size, encoding and timing
/// problems are answered but not held against the address.
fn counts_against_miner(reason: &RejectReason) -> bool {
    matches!(reason, RejectReason::BelowTarget | RejectReason::Duplicate)
}

fn error_response(id: Value, code: StratumErrorCode, message: &str) -> StratumResponse {
    StratumResponse::error(id, code.code(), message)
}

/// Handle `mining.submit` for `session`.
///
/// Low difficulty and duplicate shares count against the session's address; once the address is
/// banned every submission is answered with [`StratumErrorCode::Banned`] and
/// the caller should drop the connection.
pub async fn handle_submit(
    pipeline: &SharePipeline,
    policy: &SharePolicy,
    session: &Session,
    request: &StratumRequest,
) -> StratumResponse {
    let id = request.id.clone();

    if request.method_enum() != StratumMethod::Submit {
        return error_response(
            id,
            StratumErrorCode::Other,
            &format!("Expected mining.submit, got {}", request.method),
        );
    }
    if policy.is_banned(&session.ip) {
        return error_response(id, StratumErrorCode::Banned, "High rate of invalid shares");
    }
    if !session.is_authorized() {
        return error_response(id, StratumErrorCode::Unauthorized, "Unauthorized worker");
    }
    let extranonce1 = match &session.extranonce1 {
        Some(extranonce1) => extranonce1,
        None => return error_response(id, StratumErrorCode::NotSubscribed, "Not subscribed"),
    };

    let submission = match Submission::from_params(&request.params, extranonce1) {
        Ok(submission) => submission,
        Err(e) => return error_response(id, StratumErrorCode::Other, &e.to_string()),
    };

    let outcome = pipeline.process(&submission).await;
    let login = session.login.as_deref().unwrap_or_default();

    match outcome {
        ShareOutcome::Accepted(kind) => {
            policy.apply(session.ip, true);
            info!(%login, ip = %session.ip, ?kind, "Valid share");
            StratumResponse::success(id, Value::Bool(true))
        }
        ShareOutcome::Rejected(reason) => {
            warn!(%login, ip = %session.ip, %reason, "Invalid share");
            if counts_against_miner(&reason) && !policy.apply(session.ip, false) {
                return error_response(id, StratumErrorCode::Banned, "High rate of invalid shares");
            }
            error_response(id, StratumErrorCode::for_reject(&reason), &reason.to_string())
        }
        // not the miner's fault; no policy penalty
        ShareOutcome::Error(failure) => {
            error_response(id, StratumErrorCode::Other, &failure.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkBuilder;
    use crate::core::{JobId, Network, Sha256dMerkle, Target};
    use crate::protocol::UpstreamRpc;
    use crate::refresher::tests::{template, MockUpstream};
    use crate::refresher::WorkRefresher;
    use crate::registry::WorkRegistry;
    use crate::share::tests::{share_hash, FixedPow};
    use crate::share::SizeField;
    use crate::storage::InMemoryShareStore;
    use serde_json::json;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    async fn pipeline(hash: Target) -> (SharePipeline, JobId) {
        let upstream = Arc::new(MockUpstream::new(template(&"01".repeat(32))));
        let refresher = Arc::new(WorkRefresher::new(
            Arc::clone(&upstream) as Arc<dyn UpstreamRpc>,
            WorkBuilder::new(Arc::new(Sha256dMerkle)),
            Arc::new(WorkRegistry::new(false)),
        ));
        refresher.refresh().await.unwrap();
        let job = refresher.registry().current().unwrap().job_id.clone();

        let pipeline = SharePipeline::new(
            refresher,
            upstream,
            Arc::new(InMemoryShareStore::new()),
            Arc::new(FixedPow { hash }),
            1,
            Network::Test,
        )
        .unwrap();
        (pipeline, job)
    }

    fn session() -> Session {
        let allocator = ExtraNonceAllocator::new(1);
        let mut session = Session::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5)));
        session.subscribe(&allocator);
        session.authorize("t1miner");
        session
    }

    fn submit(job: &JobId, extranonce2: &str) -> StratumRequest {
        StratumRequest::new(
            7,
            "mining.submit",
            vec![
                json!("t1miner.rig"),
                json!(job.as_str()),
                json!("00f1536b"),
                json!(extranonce2),
                json!(format!("fd4005{}", "ab".repeat(1344))),
            ],
        )
    }

    fn extranonce2() -> String {
        "00".repeat(28)
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(StratumErrorCode::Other.code(), 20);
        assert_eq!(StratumErrorCode::Banned.code(), -1);
        assert_eq!(
            StratumErrorCode::for_reject(&RejectReason::InvalidSize(SizeField::Nonce)),
            StratumErrorCode::Other
        );
        assert_eq!(
            StratumErrorCode::for_reject(&RejectReason::Stale),
            StratumErrorCode::JobNotFound
        );
        assert_eq!(
            StratumErrorCode::for_reject(&RejectReason::Duplicate).code(),
            22
        );
        assert_eq!(
            StratumErrorCode::for_reject(&RejectReason::BelowTarget).code(),
            23
        );
    }

    #[tokio::test]
    async fn test_accept_then_duplicate() {
        let (pipeline, job) = pipeline(share_hash()).await;
        let policy = SharePolicy::new(10);
        let session = session();

        let accepted = handle_submit(&pipeline, &policy, &session, &submit(&job, &extranonce2())).await;
        assert_eq!(accepted, StratumResponse::success(json!(7), json!(true)));

        let duplicate = handle_submit(&pipeline, &policy, &session, &submit(&job, &extranonce2())).await;
        assert_eq!(duplicate.error_code(), Some(22));
    }

    #[tokio::test]
    async fn test_size_error_code() {
        let (pipeline, job) = pipeline(share_hash()).await;
        let response =
            handle_submit(&pipeline, &SharePolicy::new(10), &session(), &submit(&job, "00")).await;
        assert_eq!(
            response,
            StratumResponse::error(json!(7), 20, "Incorrect size of nOnce")
        );
    }

    #[tokio::test]
    async fn test_session_state_checked() {
        let (pipeline, job) = pipeline(share_hash()).await;
        let policy = SharePolicy::new(10);

        let mut anonymous = session();
        anonymous.login = None;
        let response = handle_submit(&pipeline, &policy, &anonymous, &submit(&job, &extranonce2())).await;
        assert_eq!(response.error_code(), Some(24));

        let mut unsubscribed = session();
        unsubscribed.extranonce1 = None;
        let response =
            handle_submit(&pipeline, &policy, &unsubscribed, &submit(&job, &extranonce2())).await;
        assert_eq!(response.error_code(), Some(25));
    }

    #[tokio::test]
    async fn test_ban_after_low_difficulty_shares() {
        let (pipeline, job) = pipeline(Target::MAX).await;
        let policy = SharePolicy::new(2);
        let session = session();
        let weak = submit(&job, &extranonce2());

        assert_eq!(
            handle_submit(&pipeline, &policy, &session, &weak).await.error_code(),
            Some(23)
        );
        assert_eq!(
            handle_submit(&pipeline, &policy, &session, &weak).await.error_code(),
            Some(23)
        );
        assert_eq!(
            handle_submit(&pipeline, &policy, &session, &weak).await.error_code(),
            Some(-1)
        );
        assert!(policy.is_banned(&session.ip));
    }

    #[tokio::test]
    async fn test_stale_and_malformed_shares_never_ban() {
        let (pipeline, job) = pipeline(share_hash()).await;
        let policy = SharePolicy::new(1);
        let session = session();
        let stale = submit(&JobId::new(99), &extranonce2());
        let short = submit(&job, "00");

        for _ in 0..10 {
            assert_eq!(
                handle_submit(&pipeline, &policy, &session, &stale).await.error_code(),
                Some(21)
            );
            assert_eq!(
                handle_submit(&pipeline, &policy, &session, &short).await.error_code(),
                Some(20)
            );
        }
        assert!(!policy.is_banned(&session.ip));

        // a real share still goes through afterwards
        let accepted = handle_submit(&pipeline, &policy, &session, &submit(&job, &extranonce2())).await;
        assert_eq!(accepted, StratumResponse::success(json!(7), json!(true)));
    }

    #[tokio::test]
    async fn test_other_methods_refused() {
        let (pipeline, job) = pipeline(share_hash()).await;
        let mut request = submit(&job, &extranonce2());
        request.method = "mining.authorize".to_string();

        let response = handle_submit(&pipeline, &SharePolicy::new(10), &session(), &request).await;
        assert_eq!(
            response,
            StratumResponse::error(json!(7), 20, "Expected mining.submit, got mining.authorize")
        );
    }

    #[tokio::test]
    async fn test_malformed_params() {
        let (pipeline, _) = pipeline(share_hash()).await;
        let request = StratumRequest::new(1, "mining.submit", vec![json!("t1miner")]);
        let response = handle_submit(&pipeline, &SharePolicy::new(10), &session(), &request).await;
        assert_eq!(response.error_code(), Some(20));
    }
}

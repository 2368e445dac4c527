//! Result classification: one exchange outcome in, one verdict out.
//!
//! The priority order is fixed. Inconclusive outcomes (no usable answer)
//! and a device-side crash are SKIPPED, a 501 is OPTIONAL_FAILED, then the
//! case's own expectations decide between PASS and FAILED.

use crate::correlator::{Exchange, ExchangeOutcome};
use dab_protocol::envelope::ResponseEnvelope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Canonical verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Failed,
    OptionalFailed,
    Skipped,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pass => "PASS",
            Self::Failed => "FAILED",
            Self::OptionalFailed => "OPTIONAL_FAILED",
            Self::Skipped => "SKIPPED",
        };
        f.write_str(name)
    }
}

/// What the case expected of the exchange.
#[derive(Debug, Clone)]
pub struct Expectation {
    /// Negative cases pass on a 400/404 rejection.
    pub negative: bool,
    /// Latency bound applied after a successful response.
    pub latency: Option<Duration>,
    /// Result of the case's response check, when one ran.
    pub check: CheckOutcome,
}

impl Expectation {
    /// No response check, no latency bound.
    #[must_use]
    pub fn bare(negative: bool) -> Self {
        Self {
            negative,
            latency: None,
            check: CheckOutcome::NotEvaluated,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CheckOutcome {
    NotEvaluated,
    Passed,
    Failed(String),
}

/// Verdict plus the operator-facing explanation.
#[derive(Debug, Clone)]
pub struct Classification {
    pub verdict: Verdict,
    pub message: String,
}

impl Classification {
    fn skipped(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Skipped,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Failed,
            message: message.into(),
        }
    }
}

/// Judges one exchange against the case's expectations.
#[must_use]
pub fn classify(exchange: &Exchange, expectation: &Expectation) -> Classification {
    match &exchange.outcome {
        ExchangeOutcome::Timeout => {
            Classification::skipped(format!("no response after {}ms", exchange.elapsed_ms))
        }
        ExchangeOutcome::Malformed { .. } => {
            Classification::skipped("response payload is not a DAB envelope")
        }
        ExchangeOutcome::Transport { error } => {
            Classification::skipped(format!("transport failure: {error}"))
        }
        ExchangeOutcome::Interrupted => Classification::skipped("operator interrupt"),
        ExchangeOutcome::Response(envelope) => classify_response(exchange, envelope, expectation),
    }
}

fn classify_response(
    exchange: &Exchange,
    envelope: &ResponseEnvelope,
    expectation: &Expectation,
) -> Classification {
    let status = envelope.status;
    if status.is_internal_error() {
        return Classification::skipped(format!(
            "device reported an internal error ({status}), re-run after recovery"
        ));
    }
    if status.is_not_implemented() {
        return Classification {
            verdict: Verdict::OptionalFailed,
            message: "operation not implemented on this device".to_owned(),
        };
    }
    if expectation.negative {
        return if status.is_client_error() {
            Classification {
                verdict: Verdict::Pass,
                message: format!("invalid request rejected with {status}"),
            }
        } else {
            Classification::failed(format!("invalid request was accepted ({status})"))
        };
    }
    if !status.is_success() {
        return Classification::failed(format!("unexpected status {status}"));
    }
    if let CheckOutcome::Failed(reason) = &expectation.check {
        return Classification::failed(format!("response check failed: {reason}"));
    }
    if let Some(bound) = expectation.latency {
        if u128::from(exchange.elapsed_ms) > bound.as_millis() {
            return Classification::failed(format!(
                "latency {}ms exceeded the {}ms bound",
                exchange.elapsed_ms,
                bound.as_millis()
            ));
        }
    }
    Classification {
        verdict: Verdict::Pass,
        message: format!("completed in {}ms", exchange.elapsed_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dab_protocol::DabStatus;
    use serde_json::json;

    fn exchange_with(outcome: ExchangeOutcome, elapsed_ms: u64) -> Exchange {
        Exchange {
            operation: "device/info".to_owned(),
            topic: "dab/tv-1/device/info".to_owned(),
            request: "{}".to_owned(),
            outcome,
            elapsed_ms,
        }
    }

    fn response(status: u16) -> ExchangeOutcome {
        ExchangeOutcome::Response(ResponseEnvelope {
            request_id: "01X".to_owned(),
            status: DabStatus::from_u16(status),
            body: json!({"requestId": "01X", "status": status}),
        })
    }

    #[test]
    fn inconclusive_outcomes_are_skipped() {
        for outcome in [
            ExchangeOutcome::Timeout,
            ExchangeOutcome::Malformed {
                raw: "??".to_owned(),
            },
            ExchangeOutcome::Transport {
                error: "gone".to_owned(),
            },
            ExchangeOutcome::Interrupted,
        ] {
            let classification =
                classify(&exchange_with(outcome, 90_000), &Expectation::bare(false));
            assert_eq!(classification.verdict, Verdict::Skipped);
        }
    }

    #[test]
    fn internal_error_is_skipped() {
        let classification =
            classify(&exchange_with(response(500), 20), &Expectation::bare(false));
        assert_eq!(classification.verdict, Verdict::Skipped);
    }

    #[test]
    fn not_implemented_is_optional_failed_even_for_negative_cases() {
        let classification =
            classify(&exchange_with(response(501), 20), &Expectation::bare(false));
        assert_eq!(classification.verdict, Verdict::OptionalFailed);
        let classification = classify(&exchange_with(response(501), 20), &Expectation::bare(true));
        assert_eq!(classification.verdict, Verdict::OptionalFailed);
    }

    #[test]
    fn negative_case_rejection_passes() {
        let classification = classify(&exchange_with(response(404), 20), &Expectation::bare(true));
        assert_eq!(classification.verdict, Verdict::Pass);
        let classification = classify(&exchange_with(response(400), 20), &Expectation::bare(true));
        assert_eq!(classification.verdict, Verdict::Pass);
    }

    #[test]
    fn negative_case_acceptance_fails() {
        let classification = classify(&exchange_with(response(200), 20), &Expectation::bare(true));
        assert_eq!(classification.verdict, Verdict::Failed);
    }

    #[test]
    fn positive_case_with_client_error_fails() {
        let classification = classify(&exchange_with(response(404), 20), &Expectation::bare(false));
        assert_eq!(classification.verdict, Verdict::Failed);
    }

    #[test]
    fn latency_bound_is_enforced() {
        let expectation = Expectation {
            negative: false,
            latency: Some(Duration::from_millis(500)),
            check: CheckOutcome::NotEvaluated,
        };
        let classification = classify(&exchange_with(response(200), 499), &expectation);
        assert_eq!(classification.verdict, Verdict::Pass);
        let classification = classify(&exchange_with(response(200), 501), &expectation);
        assert_eq!(classification.verdict, Verdict::Failed);
        assert!(classification.message.contains("latency"));
    }

    #[test]
    fn failed_check_beats_latency() {
        let expectation = Expectation {
            negative: false,
            latency: Some(Duration::from_millis(500)),
            check: CheckOutcome::Failed("versions list empty".to_owned()),
        };
        let classification = classify(&exchange_with(response(200), 10), &expectation);
        assert_eq!(classification.verdict, Verdict::Failed);
        assert!(classification.message.contains("versions list empty"));
    }

    #[test]
    fn clean_success_passes() {
        let classification = classify(&exchange_with(response(200), 12), &Expectation::bare(false));
        assert_eq!(classification.verdict, Verdict::Pass);
        assert!(classification.message.contains("12ms"));
    }

    #[test]
    fn verdict_serializes_screaming() {
        assert_eq!(
            serde_json::to_value(Verdict::OptionalFailed).unwrap(),
            json!("OPTIONAL_FAILED")
        );
        assert_eq!(Verdict::Pass.to_string(), "PASS");
    }
}

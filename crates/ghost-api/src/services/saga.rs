//! Compensating-transaction bookkeeping for paid requests.
//!
//! A `Saga` records each completed step together with the action that undoes
//! it. On failure the recorded compensations run newest first, each at most
//! once, before the error is handed back to the caller.

use crate::error::ApiError;
use crate::logging::SagaLogger;
use crate::metrics;
use crate::services::ledger::WalletLedger;

/// Progress of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStage {
    Init,
    Charged,
    Enriched,
    Composed,
    Persisted,
    Recorded,
    /// Compensations ran after a failure
    Refunded,
}

impl SagaStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Charged => "charged",
            Self::Enriched => "enriched",
            Self::Composed => "composed",
            Self::Persisted => "persisted",
            Self::Recorded => "recorded",
            Self::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for SagaStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Undo action for a completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    Refund { address: String, amount: u64 },
}

#[derive(Debug)]
struct CompletedStep {
    stage: SagaStage,
    compensation: Option<Compensation>,
}

/// Ordered step log for one request.
#[derive(Debug)]
pub struct Saga {
    logger: SagaLogger,
    stage: SagaStage,
    steps: Vec<CompletedStep>,
}

impl Saga {
    pub fn new(operation: &'static str, wallet: Option<&str>, request_id: Option<&str>) -> Self {
        let logger = SagaLogger::new(operation, wallet, request_id);
        logger.log_start("request accepted");
        Self {
            logger,
            stage: SagaStage::Init,
            steps: Vec::new(),
        }
    }

    pub fn logger(&self) -> &SagaLogger {
        &self.logger
    }

    /// Record a completed step and how to undo it.
    pub fn complete(&mut self, stage: SagaStage, compensation: Option<Compensation>) {
        self.logger.log_step(stage.as_str(), "step completed");
        if stage == SagaStage::Charged {
            metrics::record_credit_charged(self.logger.operation());
        }
        self.stage = stage;
        self.steps.push(CompletedStep { stage, compensation });
    }

    /// Compensations not yet run, in the order `compensate` runs them.
    fn pending_compensations(&self) -> Vec<&Compensation> {
        self.steps
            .iter()
            .rev()
            .filter_map(|s| s.compensation.as_ref())
            .collect()
    }

    /// Run pending compensations newest first. Returns how many ran.
    ///
    /// Each compensation is taken out of its step before running, so calling
    /// this again never repeats one.
    pub async fn compensate(&mut self, ledger: &WalletLedger) -> usize {
        let mut ran = 0;
        for step in self.steps.iter_mut().rev() {
            let Some(compensation) = step.compensation.take() else {
                continue;
            };
            ran += 1;

            match compensation {
                Compensation::Refund { address, amount } => {
                    let operation = self.logger.operation();
                    if ledger.refund(&address, amount).await {
                        metrics::record_credit_refunded(operation);
                        self.logger
                            .log_step(SagaStage::Refunded.as_str(), &format!("refunded {} credit(s)", amount));
                    } else {
                        metrics::record_refund_failure(operation);
                        self.logger.log_error(&format!(
                            "refund of {} credit(s) after {} failed",
                            amount, step.stage
                        ));
                    }
                }
            }
        }
        if ran > 0 {
            self.stage = SagaStage::Refunded;
        }
        ran
    }

    /// Compensate and hand back `err` for the caller to surface.
    pub async fn fail(&mut self, ledger: &WalletLedger, err: ApiError) -> ApiError {
        self.logger.log_error(&format!(
            "failed after stage {}: {} ({} compensation(s) pending)",
            self.stage,
            err,
            self.pending_compensations().len()
        ));
        self.compensate(ledger).await;
        metrics::record_saga_completed(self.logger.operation(), err.kind());
        err
    }

    /// Mark the run successful.
    pub fn finish(self) {
        metrics::record_saga_completed(self.logger.operation(), "ok");
        self.logger
            .log_completion(&format!("finished at stage {}", self.stage));
    }
}

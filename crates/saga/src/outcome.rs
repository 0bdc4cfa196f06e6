use crate::error::StepFailure;

/// The result of a saga run that reached `SagaComplete`.
///
/// A step failing is not an error of the run itself; it shows up here as
/// `execution_error`, together with any compensation that failed afterwards.
#[derive(Debug, Default)]
pub struct Outcome {
    /// The error of the step that failed, if one did. At most one per run.
    pub execution_error: Option<StepFailure>,

    /// Compensation errors in invocation order, i.e. reverse step order.
    pub compensate_errors: Vec<StepFailure>,
}

impl Outcome {
    /// Returns true if every step succeeded.
    pub fn is_success(&self) -> bool {
        self.execution_error.is_none()
    }

    /// Returns true if no compensation failed.
    pub fn is_fully_compensated(&self) -> bool {
        self.compensate_errors.is_empty()
    }

    /// The compensation error messages, in invocation order.
    pub fn compensate_error_messages(&self) -> Vec<String> {
        self.compensate_errors.iter().map(StepFailure::message).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_outcome_is_success() {
        let outcome = Outcome::default();
        assert!(outcome.is_success());
        assert!(outcome.is_fully_compensated());
    }

    #[test]
    fn messages_keep_invocation_order() {
        let outcome = Outcome {
            execution_error: Some(StepFailure::new(2, "ship", "no courier".into())),
            compensate_errors: vec![
                StepFailure::new(1, "charge", "refund failed".into()),
                StepFailure::new(0, "reserve", "release failed".into()),
            ],
        };
        assert!(!outcome.is_success());
        assert_eq!(
            outcome.compensate_error_messages(),
            vec!["refund failed", "release failed"]
        );
    }
}

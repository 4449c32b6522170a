//! Certificate verification policy.
//!
//! # Responsibilities
//! - Decide accept/reject for each certificate the engine presents
//! - Layer the hostname check on top of the engine's chain validation
//!
//! The policy never performs cryptographic validation of its own; chain
//! validity is whatever the engine computed.

use crate::config::SessionOptions;
use crate::engine::EngineError;

/// Hostname policy applied during the handshake, immutable for the
/// session's lifetime.
#[derive(Debug, Clone)]
pub struct VerifyPolicy {
    /// Reject peers that fail verification.
    pub reject_unauthorized: bool,
    /// Hostname the leaf certificate's common name must match.
    pub expected_hostname: Option<String>,
}

impl VerifyPolicy {
    /// Build the policy from session options.
    pub fn from_options(options: &SessionOptions) -> Self {
        Self {
            reject_unauthorized: options.reject_unauthorized,
            expected_hostname: options.servername.clone(),
        }
    }

    /// Whether this policy enforces anything at all.
    ///
    /// With rejection disabled, or no expected hostname configured, every
    /// certificate is accepted.
    pub fn enforces(&self) -> bool {
        self.reject_unauthorized && self.expected_hostname.is_some()
    }

    /// Evaluate one certificate in the chain.
    ///
    /// `depth` 0 is the leaf. `chain_valid` is the engine's own chain
    /// determination; `common_name` is the certificate's subject CN where
    /// the engine could extract one.
    pub fn check(
        &self,
        depth: usize,
        chain_valid: bool,
        common_name: Option<&str>,
    ) -> Result<(), EngineError> {
        let expected = match self.expected_hostname.as_deref() {
            Some(expected) if self.reject_unauthorized => expected,
            _ => {
                tracing::debug!("server certificate verification skipped");
                return Ok(());
            }
        };

        if !chain_valid {
            return Err(EngineError::Handshake(
                "server certificate chain rejected".into(),
            ));
        }

        if depth == 0 {
            // Chain trust is the engine's call; only the name is ours.
            let presented = common_name.unwrap_or_default();
            if presented != expected {
                tracing::warn!(presented, expected, "certificate name mismatch");
                return Err(EngineError::CertificateNameMismatch {
                    presented: presented.to_string(),
                    expected: expected.to_string(),
                });
            }
            tracing::debug!(common_name = presented, "server certificate verified");
        }

        Ok(())
    }
}

/// Performance logging for the Verifier pipeline: chain validation,
/// spectral/heavy-tail analysis, scoring, and challenge coordination.
use super::*;
use chrono::{DateTime, Utc};
use colored::*;
use log::info;
use std::time::Instant;

/// Performance operation categories.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum PerformanceCategory {
    ChainValidation,
    SpectralAnalysis,
    HeavyTailFit,
    MobilityUpdate,
    HamiltonianScoring,
    CriticalityVerdict,
    ChallengeCoordination,
    CertificateIssuance,
    EpochSealing,
}

impl PerformanceCategory {
    fn emoji(&self) -> &'static str {
        match self {
            PerformanceCategory::ChainValidation => "🔗",
            PerformanceCategory::SpectralAnalysis => "📡",
            PerformanceCategory::HeavyTailFit => "📉",
            PerformanceCategory::MobilityUpdate => "🧭",
            PerformanceCategory::HamiltonianScoring => "⚛️",
            PerformanceCategory::CriticalityVerdict => "🧪",
            PerformanceCategory::ChallengeCoordination => "🤝",
            PerformanceCategory::CertificateIssuance => "📜",
            PerformanceCategory::EpochSealing => "🌳",
        }
    }

    fn category_name(&self) -> &'static str {
        match self {
            PerformanceCategory::ChainValidation => "CHAIN_VALIDATE",
            PerformanceCategory::SpectralAnalysis => "SPECTRAL",
            PerformanceCategory::HeavyTailFit => "HEAVY_TAIL",
            PerformanceCategory::MobilityUpdate => "MOBILITY",
            PerformanceCategory::HamiltonianScoring => "HAMILTONIAN",
            PerformanceCategory::CriticalityVerdict => "CRITICALITY",
            PerformanceCategory::ChallengeCoordination => "CHALLENGE",
            PerformanceCategory::CertificateIssuance => "CERTIFICATE",
            PerformanceCategory::EpochSealing => "EPOCH_SEAL",
        }
    }
}

/// Timer for measuring operation duration, logged on drop via `finish`.
#[derive(Debug)]
pub struct ProofTimer {
    start_time: Instant,
    operation_name: String,
}

impl ProofTimer {
    pub fn new(operation_name: &str) -> Self {
        Self {
            start_time: Instant::now(),
            operation_name: operation_name.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn finish(self) -> u64 {
        let elapsed_ms = self.elapsed_ms();
        info!(
            "⚡ {}: {}ms",
            self.operation_name.bright_white(),
            elapsed_ms.to_string().bright_yellow()
        );
        elapsed_ms
    }
}

/// Tracks and logs pipeline performance metrics for a verifier session.
pub struct VerifierPerformanceLogger {
    config: LoggerConfig,
    start_time: DateTime<Utc>,
}

impl VerifierPerformanceLogger {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            start_time: Utc::now(),
        }
    }

    /// Get total session uptime since logger creation.
    pub fn get_session_uptime_ms(&self) -> i64 {
        (Utc::now() - self.start_time).num_milliseconds()
    }

    /// Log session summary with uptime.
    pub fn log_session_summary(&self, operations_count: u32) {
        if !self.config.show_performance {
            return;
        }

        let uptime_ms = self.get_session_uptime_ms();
        let uptime_seconds = uptime_ms as f64 / 1000.0;

        info!(
            "📊 Session Summary: {} operations in {:.2}s ({:.2} ops/s)",
            operations_count.to_string().bright_yellow(),
            uptime_seconds.to_string().bright_cyan(),
            if uptime_seconds > 0.0 {
                operations_count as f64 / uptime_seconds
            } else {
                0.0
            }
            .to_string()
            .bright_cyan()
        );
    }

    /// Log a categorized performance metric.
    pub fn log_categorized_operation(
        &self,
        category: PerformanceCategory,
        operation_name: &str,
        duration_ms: u64,
    ) {
        if !self.config.show_performance {
            return;
        }

        info!(
            "{} {}: {} in {}ms",
            category.emoji(),
            category.category_name().bright_white(),
            operation_name.bright_white(),
            duration_ms.to_string().bright_yellow()
        );
    }

    /// Log a verdict's classification alongside the scores that produced it.
    pub fn log_verdict(&self, classification: &str, trust_score: f64, confidence: f64) {
        if !self.config.show_performance {
            return;
        }

        info!(
            "🧪 Verdict: {} (trust={:.1}, confidence={:.2})",
            classification.bright_white(),
            trust_score,
            confidence
        );
    }
}

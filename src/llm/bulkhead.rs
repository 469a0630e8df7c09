//! Bulkhead pattern for classifier calls.
//!
//! The classifier is the only latency-bound tier, and a large backlog must
//! not overwhelm the external service or its rate limits. This wrapper
//! limits the number of concurrent classify calls with a semaphore; batch
//! resolution fans work out to threads and every call passes through here.

use super::{Classification, Classifier};
use crate::models::{Document, Entity};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Configuration for the classifier bulkhead.
#[derive(Debug, Clone)]
pub struct BulkheadConfig {
    /// Maximum concurrent classifier calls allowed.
    ///
    /// Default: 6 (conservative for API rate limits).
    pub max_concurrent: usize,

    /// Timeout for acquiring a permit in milliseconds.
    ///
    /// Default: 60 seconds.
    pub acquire_timeout_ms: u64,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 6,
            acquire_timeout_ms: 60_000,
        }
    }
}

impl BulkheadConfig {
    /// Loads configuration from the LLM config section with environment
    /// overrides.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `CORRLINK_ORACLE_MAX_CONCURRENT` | Max concurrent calls | 6 |
    /// | `CORRLINK_ORACLE_ACQUIRE_TIMEOUT_MS` | Permit timeout | 60000 |
    #[must_use]
    pub fn from_config(config: &crate::config::LlmConfig) -> Self {
        let mut settings = Self::default();
        if let Some(max_concurrent) = config.max_concurrent {
            settings.max_concurrent = max_concurrent.max(1);
        }
        settings.with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("CORRLINK_ORACLE_MAX_CONCURRENT") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.max_concurrent = parsed.max(1);
            }
        }
        if let Ok(v) = std::env::var("CORRLINK_ORACLE_ACQUIRE_TIMEOUT_MS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.acquire_timeout_ms = parsed;
            }
        }
        self
    }

    /// Sets the maximum concurrent calls.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }
}

/// Classifier wrapper with bulkhead (concurrency limiting) semantics.
pub struct BulkheadClassifier {
    inner: Arc<dyn Classifier>,
    config: BulkheadConfig,
    semaphore: Arc<Semaphore>,
}

impl BulkheadClassifier {
    /// Creates a new bulkhead-wrapped classifier.
    #[must_use]
    pub fn new(inner: Arc<dyn Classifier>, config: BulkheadConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            inner,
            config,
            semaphore,
        }
    }

    /// Returns the current number of available permits.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquires a permit, spin-waiting up to the configured timeout.
    fn acquire_permit(&self) -> Result<tokio::sync::OwnedSemaphorePermit> {
        let timeout = Duration::from_millis(self.config.acquire_timeout_ms);
        let start = std::time::Instant::now();

        loop {
            if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
                metrics::counter!(
                    "oracle_bulkhead_permits_acquired_total",
                    "provider" => self.inner.name()
                )
                .increment(1);
                return Ok(permit);
            }

            if start.elapsed() >= timeout {
                metrics::counter!(
                    "oracle_bulkhead_rejections_total",
                    "provider" => self.inner.name()
                )
                .increment(1);
                return Err(Error::OperationFailed {
                    operation: "oracle_bulkhead_acquire".to_string(),
                    cause: format!(
                        "Bulkhead acquire timed out after {}ms",
                        self.config.acquire_timeout_ms
                    ),
                });
            }

            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Classifier for BulkheadClassifier {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn classify(
        &self,
        document: &Document,
        candidates: &[Entity],
    ) -> Result<Option<Classification>> {
        let _permit = self.acquire_permit()?;
        tracing::debug!(
            provider = self.inner.name(),
            available_permits = self.available_permits(),
            "Acquired oracle bulkhead permit"
        );
        self.inner.classify(document, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentId, EntityCode};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingClassifier {
        in_flight: AtomicUsize,
        max_seen: AtomicUsize,
    }

    impl Classifier for TrackingClassifier {
        fn name(&self) -> &'static str {
            "tracking"
        }

        fn classify(&self, _: &Document, _: &[Entity]) -> Result<Option<Classification>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(Classification {
                entity_code: EntityCode::new("PRJ-042"),
                confidence: 0.5,
                rationale: String::new(),
            }))
        }
    }

    fn doc() -> Document {
        Document {
            id: DocumentId::new("doc_1"),
            origin_identifier: "a@b.com".to_string(),
            subject: String::new(),
            body: String::new(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_bulkhead_bounds_concurrency() {
        let inner = Arc::new(TrackingClassifier {
            in_flight: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        });
        let bulkhead = Arc::new(BulkheadClassifier::new(
            Arc::clone(&inner) as Arc<dyn Classifier>,
            BulkheadConfig::default().with_max_concurrent(2),
        ));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let bulkhead = Arc::clone(&bulkhead);
                scope.spawn(move || {
                    bulkhead.classify(&doc(), &[]).unwrap();
                });
            }
        });

        assert!(inner.max_seen.load(Ordering::SeqCst) <= 2);
        assert_eq!(bulkhead.available_permits(), 2);
    }

    #[test]
    fn test_acquire_timeout() {
        struct SlowClassifier;
        impl Classifier for SlowClassifier {
            fn name(&self) -> &'static str {
                "slow"
            }
            fn classify(&self, _: &Document, _: &[Entity]) -> Result<Option<Classification>> {
                std::thread::sleep(Duration::from_millis(300));
                Ok(None)
            }
        }

        let bulkhead = Arc::new(BulkheadClassifier::new(
            Arc::new(SlowClassifier),
            BulkheadConfig {
                max_concurrent: 1,
                acquire_timeout_ms: 50,
            },
        ));

        std::thread::scope(|scope| {
            let first = Arc::clone(&bulkhead);
            scope.spawn(move || {
                let _ = first.classify(&doc(), &[]);
            });
            std::thread::sleep(Duration::from_millis(50));

            let second = bulkhead.classify(&doc(), &[]);
            assert!(second.is_err());
        });
    }
}

// crates/resilience/src/retry.rs
//! Retry with exponential backoff and optional jitter

use crate::classify::{is_transient, matches_allow_list};
use crate::error::{InvalidOptions, ResilienceError, ResilienceResult};
use crate::signature::ErrorSignature;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry configuration
///
/// Fields are public so partial options can be layered over the defaults:
///
/// ```rust
/// use socialdeck_resilience::RetryOptions;
/// use std::time::Duration;
///
/// let options = RetryOptions {
///     max_attempts: 5,
///     initial_delay: Duration::from_millis(250),
///     ..RetryOptions::default()
/// };
/// assert_eq!(options.backoff_factor, 2.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Maximum number of attempts (including the first attempt)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound on any computed delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt
    pub backoff_factor: f64,
    /// When set, only errors matching an entry are retried
    pub retryable_errors: Option<Vec<String>>,
    /// Randomize delays (jittered executors only)
    pub jitter: bool,
}

impl RetryOptions {
    /// Creates options with the given attempt budget and default timings
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Restricts retries to errors matching one of `signatures`
    pub fn with_retryable_errors<I, S>(mut self, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_errors = Some(signatures.into_iter().map(Into::into).collect());
        self
    }

    /// Sets whether to use jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Checks that the options can drive a retry loop
    pub fn validate(&self) -> Result<(), InvalidOptions> {
        if self.max_attempts == 0 {
            return Err(InvalidOptions::new("max_attempts", "must be at least 1"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(InvalidOptions::new(
                "backoff_factor",
                format!("must be a finite number >= 1.0, got {}", self.backoff_factor),
            ));
        }
        Ok(())
    }

    /// Calculates the delay before a given attempt (1-based)
    ///
    /// The first attempt never waits. Attempt `n` waits
    /// `initial_delay * backoff_factor^(n - 2)`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let factor = self.backoff_factor.powi(exponent);

        // Overflow or a non-finite product saturates at the cap
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Calculates a randomized delay before a given attempt
    ///
    /// Uniform between 50% and 100% of [`delay_for_attempt`](Self::delay_for_attempt).
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        self.jittered_delay_with(attempt, &mut rand::thread_rng())
    }

    /// Same as [`jittered_delay`](Self::jittered_delay) with a caller-supplied RNG
    pub fn jittered_delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let full = self.delay_for_attempt(attempt);
        if full.is_zero() {
            return Duration::ZERO;
        }
        full.mul_f64(rng.gen_range(0.5..=1.0))
    }

    /// Checks if an error should be retried
    ///
    /// With an allow-list configured only listed signatures are retryable;
    /// otherwise transient network failures, 429 and 5xx gateway statuses are.
    pub fn is_retryable<E: ErrorSignature + ?Sized>(&self, error: &E) -> bool {
        match &self.retryable_errors {
            Some(allowed) => matches_allow_list(error, allowed),
            None => is_transient(error),
        }
    }

    fn next_delay(&self, attempt: u32, jitter: Jitter) -> Duration {
        match jitter {
            Jitter::Enabled if self.jitter => self.jittered_delay(attempt),
            _ => self.delay_for_attempt(attempt),
        }
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            retryable_errors: None,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Jitter {
    Disabled,
    Enabled,
}

/// Executes an async operation with exponential backoff
///
/// Non-retryable errors are returned after a single attempt. Once the attempt
/// budget is spent the last error is returned unmodified in
/// [`ResilienceError::Operation`].
pub async fn with_retry<F, Fut, T, E>(options: &RetryOptions, operation: F) -> ResilienceResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorSignature,
{
    run(options, Jitter::Disabled, None, operation).await
}

/// Executes an async operation with jittered exponential backoff
///
/// Identical to [`with_retry`] except that, when `options.jitter` is set, each
/// delay is drawn from 50-100% of the exponential value so concurrent callers
/// don't retry in lockstep.
pub async fn with_retry_and_jitter<F, Fut, T, E>(
    options: &RetryOptions,
    operation: F,
) -> ResilienceResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorSignature,
{
    run(options, Jitter::Enabled, None, operation).await
}

/// Executes an async operation with backoff until it succeeds, fails for good,
/// or `token` is cancelled
///
/// The token is checked before every attempt and raced against every backoff
/// sleep; an attempt already in flight is allowed to finish. Honors
/// `options.jitter`.
pub async fn with_retry_cancellable<F, Fut, T, E>(
    options: &RetryOptions,
    token: &CancellationToken,
    operation: F,
) -> ResilienceResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorSignature,
{
    run(options, Jitter::Enabled, Some(token), operation).await
}

async fn run<F, Fut, T, E>(
    options: &RetryOptions,
    jitter: Jitter,
    token: Option<&CancellationToken>,
    mut operation: F,
) -> ResilienceResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorSignature,
{
    options.validate()?;

    let mut attempt = 1;
    loop {
        if token.is_some_and(CancellationToken::is_cancelled) {
            log::debug!("Retry cancelled before attempt {}", attempt);
            return Err(ResilienceError::Cancelled);
        }

        let error = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !options.is_retryable(&error) {
            log::debug!(
                "Attempt {}/{} failed with non-retryable error: {}",
                attempt,
                options.max_attempts,
                error.message()
            );
            return Err(ResilienceError::Operation(error));
        }

        if attempt >= options.max_attempts {
            log::warn!(
                "All {} retry attempts exhausted: {}",
                options.max_attempts,
                error.message()
            );
            return Err(ResilienceError::Operation(error));
        }

        attempt += 1;
        let delay = options.next_delay(attempt, jitter);
        log::debug!(
            "Attempt {}/{} failed: {}; retrying in {:?}",
            attempt - 1,
            options.max_attempts,
            error.message(),
            delay
        );
        drop(error);

        match token {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        log::debug!("Retry cancelled while waiting {:?}", delay);
                        return Err(ResilienceError::Cancelled);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ServiceError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_options_default() {
        let options = RetryOptions::default();
        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.initial_delay, Duration::from_secs(1));
        assert_eq!(options.max_delay, Duration::from_secs(30));
        assert_eq!(options.backoff_factor, 2.0);
        assert!(options.retryable_errors.is_none());
    }

    #[test]
    fn test_retry_options_builder() {
        let options = RetryOptions::new(5)
            .with_initial_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(60))
            .with_backoff_factor(3.0)
            .with_retryable_errors(["QUOTA_EXCEEDED"])
            .with_jitter(false);

        assert_eq!(options.max_attempts, 5);
        assert_eq!(options.initial_delay, Duration::from_millis(200));
        assert_eq!(options.max_delay, Duration::from_secs(60));
        assert_eq!(options.backoff_factor, 3.0);
        assert_eq!(
            options.retryable_errors,
            Some(vec!["QUOTA_EXCEEDED".to_string()])
        );
        assert!(!options.jitter);
    }

    #[test]
    fn test_validate_rejects_bad_options() {
        assert!(RetryOptions::new(0).validate().is_err());
        assert!(RetryOptions::new(3).with_backoff_factor(0.5).validate().is_err());
        assert!(RetryOptions::new(3)
            .with_backoff_factor(f64::NAN)
            .validate()
            .is_err());
        assert!(RetryOptions::new(1).validate().is_ok());
    }

    #[test]
    fn test_exponential_backoff() {
        let options = RetryOptions::new(4)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_factor(2.0);

        assert_eq!(options.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(options.delay_for_attempt(2), Duration::from_millis(100));
        assert_eq!(options.delay_for_attempt(3), Duration::from_millis(200));
        assert_eq!(options.delay_for_attempt(4), Duration::from_millis(400));
    }

    #[test]
    fn test_max_delay_capping() {
        let options = RetryOptions::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5));

        assert_eq!(options.delay_for_attempt(10), Duration::from_secs(5));
        assert_eq!(options.delay_for_attempt(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_is_monotonic_and_bounded() {
        let options = RetryOptions::new(30)
            .with_initial_delay(Duration::from_millis(7))
            .with_max_delay(Duration::from_secs(2))
            .with_backoff_factor(1.7);

        let mut previous = Duration::ZERO;
        for attempt in 1..=30 {
            let delay = options.delay_for_attempt(attempt);
            assert!(delay >= previous, "attempt {attempt}: {delay:?} < {previous:?}");
            assert!(delay <= options.max_delay);
            previous = delay;
        }
    }

    #[test]
    fn test_sub_millisecond_delays_are_kept() {
        let options = RetryOptions::new(3).with_initial_delay(Duration::from_micros(1500));
        assert_eq!(options.delay_for_attempt(2), Duration::from_micros(1500));
        assert_eq!(options.delay_for_attempt(3), Duration::from_micros(3000));

        let options = RetryOptions::new(2).with_initial_delay(Duration::from_micros(400));
        assert_eq!(options.delay_for_attempt(2), Duration::from_micros(400));

        let mut rng = StdRng::seed_from_u64(11);
        let delay = options.jittered_delay_with(2, &mut rng);
        assert!(delay >= Duration::from_micros(200) && delay <= Duration::from_micros(400));
    }

    #[test]
    fn test_zero_initial_delay_stays_zero() {
        let options = RetryOptions::new(5).with_initial_delay(Duration::ZERO);
        assert_eq!(options.delay_for_attempt(100), Duration::ZERO);
    }

    #[test]
    fn test_jittered_delay_within_bounds() {
        let options = RetryOptions::new(5).with_initial_delay(Duration::from_millis(1000));
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 2..=5 {
            let full = options.delay_for_attempt(attempt);
            for _ in 0..50 {
                let delay = options.jittered_delay_with(attempt, &mut rng);
                assert!(delay >= full / 2 && delay <= full, "{delay:?} outside {full:?}");
            }
        }
    }

    #[test]
    fn test_jittered_delay_varies() {
        let options = RetryOptions::new(3).with_initial_delay(Duration::from_millis(1000));
        let delays: Vec<_> = (0..20).map(|_| options.jittered_delay(2)).collect();
        assert!(delays.iter().any(|d| *d != delays[0]));
    }

    #[test]
    fn test_is_retryable_uses_allow_list_when_present() {
        let options = RetryOptions::default();
        assert!(options.is_retryable("ECONNREFUSED"));
        assert!(!options.is_retryable("QUOTA_EXCEEDED"));

        let options = options.with_retryable_errors(["QUOTA_EXCEEDED"]);
        assert!(!options.is_retryable("ECONNREFUSED"));
        assert!(options.is_retryable("QUOTA_EXCEEDED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_success_first_attempt() {
        let options = RetryOptions::new(3);
        let calls = AtomicU32::new(0);

        let result = with_retry(&options, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, &str>(42) }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_success_after_failures() {
        let options = RetryOptions::new(3).with_initial_delay(Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = with_retry(&options, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err("ETIMEDOUT")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_all_attempts_fail() {
        let options = RetryOptions::new(3).with_initial_delay(Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = with_retry(&options, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(ServiceError::http(503, "persistent error")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let error = result.err().and_then(ResilienceError::into_operation);
        assert_eq!(error, Some(ServiceError::http(503, "persistent error")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_fatal_error_is_not_retried() {
        let options = RetryOptions::new(5).with_initial_delay(Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = with_retry(&options, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ServiceError::http(401, "Unauthorized")) }
        })
        .await;

        assert!(matches!(result, Err(ResilienceError::Operation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_invalid_options_never_calls_operation() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&RetryOptions::new(0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, &str>(()) }
        })
        .await;

        assert!(matches!(result, Err(ResilienceError::InvalidOptions(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_token_stops_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);

        let result = with_retry_cancellable(&RetryOptions::new(3), &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, &str>(()) }
        })
        .await;

        assert!(matches!(result, Err(ResilienceError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

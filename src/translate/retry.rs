use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use tokio::time::sleep;
use tracing::warn;

const BASE_DELAY: Duration = Duration::from_secs(2);
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Retry strategy for translation calls. The default performs a single
/// attempt (fail fast), matching the pipeline's no-retry contract; callers
/// opt in to bounded exponential backoff via configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(attempts: usize) -> Self {
        Self {
            max_attempts: attempts.max(1),
            ..Self::default()
        }
    }
}

pub(crate) fn is_retryable(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return true;
    }
    let lower = body.to_lowercase();
    lower.contains("rate limit")
        || lower.contains("rate_limit")
        || lower.contains("too many requests")
        || lower.contains("overloaded")
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    None
}

pub(crate) async fn wait_with_backoff(
    policy: &RetryPolicy,
    attempt: usize,
    delay: Duration,
    retry_after: Option<Duration>,
) -> Duration {
    let mut wait = delay;
    if let Some(retry_after) = retry_after
        && retry_after > wait
    {
        wait = retry_after;
    }
    warn!(
        "translation API retrying in {:.1}s (attempt {}/{})",
        wait.as_secs_f32(),
        attempt,
        policy.max_attempts
    );
    sleep(wait).await;
    next_delay(policy, delay)
}

pub(crate) fn next_delay(policy: &RetryPolicy, current: Duration) -> Duration {
    let next_secs = current
        .as_secs()
        .saturating_mul(2)
        .max(policy.base_delay.as_secs());
    let next = Duration::from_secs(next_secs);
    if next > policy.max_delay {
        policy.max_delay
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_single_attempt() {
        assert_eq!(RetryPolicy::default().max_attempts, 1);
        assert_eq!(RetryPolicy::with_attempts(0).max_attempts, 1);
        assert_eq!(RetryPolicy::with_attempts(3).max_attempts, 3);
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS, ""));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE, ""));
        assert!(is_retryable(StatusCode::OK, "rate limit exceeded"));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED, "bad key"));
    }

    #[test]
    fn delay_doubles_up_to_the_cap() {
        let policy = RetryPolicy::default();
        let d1 = next_delay(&policy, Duration::from_secs(2));
        assert_eq!(d1, Duration::from_secs(4));
        let capped = next_delay(&policy, Duration::from_secs(50));
        assert_eq!(capped, Duration::from_secs(60));
    }
}

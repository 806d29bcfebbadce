#[cfg(test)]
mod tests {
    use crate::config::{LLMConfig, LLMProvider, ProviderProfile};
    use crate::llm::client::{LLMClient, ProviderRoute, RetryPolicy, RouteHealth};
    use anyhow::anyhow;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
            timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
            timeout: Duration::from_secs(60),
        };

        assert_eq!(policy.backoff_delay_ms(1), 1000);
        assert_eq!(policy.backoff_delay_ms(2), 2000);
        assert_eq!(policy.backoff_delay_ms(3), 4000);
        assert_eq!(policy.backoff_delay_ms(4), 8000);
        assert_eq!(policy.backoff_delay_ms(10), 8000);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from_config(&LLMConfig::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(3);

        let result = policy
            .run("test", || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 { Err(anyhow!("flaky")) } else { Ok(n) }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(2);

        let result: anyhow::Result<()> = policy
            .run("test", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow!("down"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_times_out_slow_attempts() {
        let policy = RetryPolicy {
            timeout: Duration::from_millis(10),
            ..fast_policy(1)
        };

        let result = policy
            .run("slow", || async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("超时"));
    }

    #[test]
    fn test_route_health_fails_over_during_cooldown() {
        let mut health = RouteHealth::new(30);
        let now = Utc::now();

        assert_eq!(health.select(true, now), ProviderRoute::Primary);

        health.record_failure(ProviderRoute::Primary, "boom".to_string(), now);
        assert_eq!(health.select(true, now), ProviderRoute::Fallback);
        assert_eq!(health.select(false, now), ProviderRoute::Primary);

        let later = now + ChronoDuration::seconds(31);
        assert_eq!(health.select(true, later), ProviderRoute::Primary);

        health.record_success(ProviderRoute::Primary);
        assert_eq!(health.select(true, now), ProviderRoute::Primary);
        assert_eq!(health.status(ProviderRoute::Primary).failed_calls, 1);
    }

    #[test]
    fn test_huge_cooldown_saturates_instead_of_overflowing() {
        let now = Utc::now();
        for cooldown in [u64::MAX, i64::MAX as u64, 400_000_000_000_000] {
            let mut health = RouteHealth::new(cooldown);
            health.record_failure(ProviderRoute::Primary, "boom".to_string(), now);

            let status = health.status(ProviderRoute::Primary);
            assert!(status.circuit_retry_at.is_some());
            assert!(!status.should_try(now));
            assert_eq!(health.select(true, now), ProviderRoute::Fallback);
        }
    }

    #[test]
    fn test_client_skips_fallback_without_key() {
        let mut config = LLMConfig::default();
        config.primary.api_key = "gsk".to_string();

        let client = LLMClient::new(&config).unwrap();
        assert!(!client.has_fallback());
        assert_eq!(client.select_route(), ProviderRoute::Primary);
        assert_eq!(
            client.describe_route(ProviderRoute::Fallback),
            "groq:llama-3.1-8b-instant"
        );
    }

    #[test]
    fn test_client_with_fallback() {
        let mut config = LLMConfig::default();
        config.primary.api_key = "gsk".to_string();
        config.fallback = Some(ProviderProfile {
            api_key: "sk".to_string(),
            ..ProviderProfile::new(LLMProvider::OpenAI)
        });

        let client = LLMClient::new(&config).unwrap();
        assert!(client.has_fallback());
        assert_eq!(
            client.describe_route(ProviderRoute::Fallback),
            "openai:gpt-4o-mini"
        );
    }
}

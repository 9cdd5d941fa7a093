//! Optional DNS liveness check for aggregated domains

use crate::config::DnsConfig;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Bounded-concurrency resolver over the system resolver
#[derive(Clone, Debug)]
pub struct DnsResolver {
    timeout: Duration,
    concurrency: usize,
    max_batch: usize,
}

impl DnsResolver {
    /// Resolver using the configured limits
    pub fn new(config: &DnsConfig) -> Self {
        Self {
            timeout: config.timeout,
            concurrency: config.concurrency.max(1),
            max_batch: config.max_batch,
        }
    }

    /// Whether `domain` resolves to at least one address within the timeout
    pub async fn resolve(&self, domain: &str) -> bool {
        match tokio::time::timeout(self.timeout, tokio::net::lookup_host((domain, 0))).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(e)) => {
                debug!(domain, error = %e, "domain did not resolve");
                false
            }
            Err(_) => {
                debug!(domain, timeout_secs = self.timeout.as_secs(), "DNS lookup timed out");
                false
            }
        }
    }

    /// Resolve up to `max_batch` domains, in the order given
    ///
    /// Domains past the cap are not looked up and do not appear in the result.
    pub async fn bulk_resolve<'a, I>(&self, domains: I) -> HashMap<String, bool>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let batch: Vec<&str> = domains.into_iter().take(self.max_batch).collect();
        info!(
            count = batch.len(),
            concurrency = self.concurrency,
            "resolving domains"
        );

        let results: HashMap<String, bool> = stream::iter(batch)
            .map(|domain| async move { (domain.to_string(), self.resolve(domain).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let live = results.values().filter(|alive| **alive).count();
        info!(resolved = live, checked = results.len(), "DNS resolution finished");
        results
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(max_batch: usize) -> DnsResolver {
        DnsResolver::new(&DnsConfig {
            concurrency: 4,
            timeout: Duration::from_secs(2),
            max_batch,
        })
    }

    #[tokio::test]
    async fn ip_literal_resolves_without_network() {
        assert!(resolver(10).resolve("127.0.0.1").await);
    }

    #[tokio::test]
    async fn reserved_invalid_tld_never_resolves() {
        assert!(!resolver(10).resolve("nothing-here.invalid").await);
    }

    #[tokio::test]
    async fn bulk_resolve_is_capped_at_max_batch() {
        let domains = ["127.0.0.1", "127.0.0.2", "127.0.0.3", "127.0.0.4"];

        let results = resolver(2).bulk_resolve(domains).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results.get("127.0.0.1"), Some(&true));
        assert_eq!(results.get("127.0.0.2"), Some(&true));
        assert!(!results.contains_key("127.0.0.3"));
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let resolver = DnsResolver::new(&DnsConfig {
            concurrency: 0,
            ..Default::default()
        });
        assert_eq!(resolver.concurrency, 1);
        assert_eq!(resolver.max_batch, 1000);
    }
}

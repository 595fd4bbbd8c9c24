use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    system_conf, TokioAsyncResolver,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

/// Answers whether a mail domain publishes at least one MX record.
#[async_trait]
pub trait MxResolver: Send + Sync {
    async fn has_mx_records(&self, domain: &str) -> bool;
}

/// MX lookups through the system resolver configuration.
#[derive(Clone)]
pub struct DnsMxResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsMxResolver {
    pub fn new(timeout: Duration) -> Self {
        let (config, mut opts) = system_conf::read_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "system resolver config unavailable; using defaults");
            (ResolverConfig::default(), ResolverOpts::default())
        });
        opts.timeout = timeout;
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        }
    }
}

#[async_trait]
impl MxResolver for DnsMxResolver {
    async fn has_mx_records(&self, domain: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.resolver.mx_lookup(domain)).await {
            Ok(Ok(lookup)) => {
                let found = lookup.iter().next().is_some();
                debug!(domain = %domain, found, "MX lookup finished");
                found
            }
            Ok(Err(e)) => {
                debug!(domain = %domain, error = %e, "MX lookup failed");
                false
            }
            Err(_) => {
                debug!(domain = %domain, "MX lookup timed out");
                false
            }
        }
    }
}

pub fn is_syntactically_valid(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// True only if `email` has exactly one `@` and its domain has MX records.
pub async fn has_resolvable_domain(email: &str, resolver: &dyn MxResolver) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(domain), None) => resolver.has_mx_records(domain).await,
        _ => false,
    }
}

/// Admission check applied to candidate emails.
///
/// Without a resolver only the syntax is checked.
#[derive(Clone)]
pub struct EmailValidator {
    resolver: Option<Arc<dyn MxResolver>>,
}

impl EmailValidator {
    pub fn syntax_only() -> Self {
        Self { resolver: None }
    }

    pub fn with_resolver(resolver: Arc<dyn MxResolver>) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    pub fn checks_domain(&self) -> bool {
        self.resolver.is_some()
    }

    pub async fn is_valid(&self, email: &str) -> bool {
        if !is_syntactically_valid(email) {
            return false;
        }
        match &self.resolver {
            Some(resolver) => has_resolvable_domain(email, resolver.as_ref()).await,
            None => true,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Resolver double: answers from a fixed list and records queried domains.
    #[derive(Default)]
    pub(crate) struct FixedMx {
        pub domains: Vec<&'static str>,
        pub queried: Mutex<Vec<String>>,
    }

    impl FixedMx {
        pub(crate) fn with(domains: &[&'static str]) -> Self {
            Self {
                domains: domains.to_vec(),
                queried: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MxResolver for FixedMx {
        async fn has_mx_records(&self, domain: &str) -> bool {
            self.queried.lock().unwrap().push(domain.to_string());
            self.domains.iter().any(|d| *d == domain)
        }
    }

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(is_syntactically_valid("a@b.com"));
        assert!(is_syntactically_valid("first.last+tag@mail.example.org"));
        assert!(is_syntactically_valid("x_y%z-1@sub-domain.io"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_syntactically_valid("hello"));
        assert!(!is_syntactically_valid(""));
        assert!(!is_syntactically_valid("a@b"));
        assert!(!is_syntactically_valid("a@b.c"));
        assert!(!is_syntactically_valid("a@@b.com"));
        assert!(!is_syntactically_valid("a@b@c.com"));
        assert!(!is_syntactically_valid("a b@c.com"));
        assert!(!is_syntactically_valid("@b.com"));
        assert!(!is_syntactically_valid("a@b.c0m"));
    }

    #[tokio::test]
    async fn resolvable_domain_requires_exactly_one_at() {
        let mx = FixedMx::with(&["b.com"]);
        assert!(has_resolvable_domain("a@b.com", &mx).await);
        assert!(!has_resolvable_domain("a@b@b.com", &mx).await);
        assert!(!has_resolvable_domain("b.com", &mx).await);
        assert_eq!(*mx.queried.lock().unwrap(), vec!["b.com".to_string()]);
    }

    #[tokio::test]
    async fn resolvable_domain_false_without_records() {
        let mx = FixedMx::with(&[]);
        assert!(!has_resolvable_domain("a@nowhere.test", &mx).await);
    }

    #[tokio::test]
    async fn validator_combines_syntax_and_domain() {
        let mx = Arc::new(FixedMx::with(&["b.com"]));
        let validator = EmailValidator::with_resolver(mx.clone());
        assert!(validator.checks_domain());
        assert!(validator.is_valid("a@b.com").await);
        assert!(!validator.is_valid("a@c.com").await);
        // syntax failure short-circuits before any lookup
        assert!(!validator.is_valid("hello").await);
        assert_eq!(mx.queried.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn syntax_only_validator_skips_lookup() {
        let validator = EmailValidator::syntax_only();
        assert!(!validator.checks_domain());
        assert!(validator.is_valid("a@unregistered-domain.test").await);
        assert!(!validator.is_valid("hello").await);
    }
}

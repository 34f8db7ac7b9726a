use crate::{
    auth::{Credential, Negotiation, Principal, SessionIdentity, Subject},
    backend::{BackendError, NegotiationContext, TokenVerdict},
    error::AuthError,
    registry::{Domain, DomainRegistry},
    secctx,
};
use arcstr::{literal, ArcStr};
use bytes::Bytes;
use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

// the last '@' not preceded by '\' splits user from domain qualifier
fn qualifier_index(username: &str) -> Option<usize> {
    let bytes = username.as_bytes();
    let mut i = bytes.len();
    while i > 0 {
        i -= 1;
        if bytes[i] == b'@' && (i == 0 || bytes[i - 1] != b'\\') {
            return Some(i);
        }
    }
    None
}

fn unescape(name: &str) -> String {
    name.replace("\\@", "@")
}

/// The user name with any domain qualifier stripped and `\@` escapes
/// resolved to literal `@`.
pub(crate) fn base_username(username: &str) -> String {
    match qualifier_index(username) {
        None => unescape(username),
        Some(i) => unescape(&username[..i]),
    }
}

/// The domain qualifier of a `user@domain` name, if one is present.
pub(crate) fn domain_qualifier(username: &str) -> Option<&str> {
    qualifier_index(username).map(|i| &username[i + 1..])
}

fn temp_principal() -> Principal {
    Principal::new(literal!("temp"))
}

fn log_backend_error(op: &str, domain: &str, e: &BackendError) {
    match e {
        BackendError::Unavailable(e) => {
            warn!("security domain {} unavailable during {}: {}", domain, op, e)
        }
        BackendError::Rejected(e) => {
            debug!("{} rejected by security domain {}: {}", op, domain, e)
        }
    }
}

/// Admits callers into the system, either by validating a plaintext
/// credential against a configured security domain, or by driving a
/// kerberos style token exchange to completion one round per call.
pub struct SessionService {
    registry: DomainRegistry,
    count: AtomicU64,
}

impl SessionService {
    pub fn new(registry: DomainRegistry) -> Self {
        SessionService { registry, count: AtomicU64::new(0) }
    }

    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    /// Validate `credential` for `username` and admit the caller. A
    /// `user@domain` qualifier constrains the logon to that domain;
    /// otherwise `domain` is consulted if non empty, and failing that
    /// every configured domain is tried in order, first success wins.
    /// All-fail collapses to a single failure; per domain detail is
    /// logged, not surfaced.
    pub fn authenticate(
        &self,
        domain: &str,
        username: &str,
        credential: Credential,
    ) -> Result<SessionIdentity, AuthError> {
        let base = base_username(username);
        let constrained = match domain_qualifier(username) {
            Some(qualifier) => Some(qualifier),
            None if !domain.is_empty() => Some(domain),
            None => None,
        };
        match constrained {
            Some(name) => {
                let dom = self
                    .registry
                    .resolve(name)
                    .ok_or_else(|| AuthError::DomainNotFound(ArcStr::from(name)))?;
                self.authenticate_in(dom, username, &base, &credential)
                    .ok_or_else(|| AuthError::AuthenticationFailed(ArcStr::from(username)))
            }
            None => {
                for dom in self.registry.domains() {
                    if let Some(session) =
                        self.authenticate_in(dom, username, &base, &credential)
                    {
                        return Ok(session);
                    }
                }
                Err(AuthError::AuthenticationFailed(ArcStr::from(username)))
            }
        }
    }

    fn authenticate_in(
        &self,
        domain: &Arc<Domain>,
        username: &str,
        base: &str,
        credential: &Credential,
    ) -> Option<SessionIdentity> {
        let backend = domain.backend();
        let principal = Principal::new(ArcStr::from(base));
        let mut subject = Subject::new();
        // the validation call runs under a placeholder context so the
        // backend has an execution context of its own
        let temp = match backend.create_security_context(
            domain.name(),
            &temp_principal(),
            None,
            &subject,
        ) {
            Ok(ctx) => ctx,
            Err(e) => {
                log_backend_error("logon", domain.name(), &e);
                return None;
            }
        };
        let valid = secctx::with_bound(temp, || {
            backend.validate_credential(&principal, credential, &mut subject)
        });
        match valid {
            Ok(true) => (),
            Ok(false) => {
                debug!("credential rejected for {} in domain {}", username, domain.name());
                return None;
            }
            Err(e) => {
                log_backend_error("logon", domain.name(), &e);
                return None;
            }
        }
        if subject.is_empty() {
            // some backends leave subject population to the caller
            subject.add_principal(principal.clone());
        }
        let ctx = match backend.create_security_context(
            domain.name(),
            &principal,
            Some(credential),
            &subject,
        ) {
            Ok(ctx) => ctx,
            Err(e) => {
                log_backend_error("logon", domain.name(), &e);
                return None;
            }
        };
        let qualified = ArcStr::from(format!("{}@{}", base, domain.name()));
        info!("logon successful for {}", qualified);
        Some(SessionIdentity::new(qualified, domain.name().clone(), subject, ctx))
    }

    /// Drive one round of the token exchange against `domain`. A result
    /// with `authenticated == false` is not a failure: the returned
    /// token must be sent to the peer and its reply fed back into
    /// another call. The previously ambient security context is
    /// restored before this returns, on every path.
    pub fn negotiate(&self, domain: &str, token: Bytes) -> Result<Negotiation, AuthError> {
        let dom = self
            .registry
            .resolve(domain)
            .ok_or_else(|| AuthError::DomainNotFound(ArcStr::from(domain)))?;
        let backend = dom.backend();
        let failed = || AuthError::NegotiationFailed(dom.name().clone());
        let mut negotiation = NegotiationContext::new(token);
        let mut subject = Subject::new();
        let temp = backend
            .create_security_context(dom.name(), &temp_principal(), None, &subject)
            .map_err(|e| {
                log_backend_error("negotiation", dom.name(), &e);
                failed()
            })?;
        let verdict = secctx::with_bound(temp, || {
            backend.validate_token(&mut negotiation, &mut subject)
        });
        match verdict {
            Ok(TokenVerdict::Established) => {
                let principal = match subject.first_principal() {
                    Some(p) => p.clone(),
                    None => {
                        warn!(
                            "domain {} completed negotiation with an empty subject",
                            dom.name()
                        );
                        return Err(failed());
                    }
                };
                let ctx = backend
                    .create_security_context(dom.name(), &principal, None, &subject)
                    .map_err(|e| {
                        log_backend_error("negotiation", dom.name(), &e);
                        failed()
                    })?;
                let token = match negotiation.take_response() {
                    Some(token) => token,
                    None => self.dummy_token(),
                };
                let delegated = negotiation.take_delegated();
                let qualified = ArcStr::from(format!(
                    "{}@{}",
                    base_username(principal.name()),
                    dom.name()
                ));
                info!("logon successful through token negotiation for {}", qualified);
                let session =
                    SessionIdentity::new(qualified, dom.name().clone(), subject, ctx);
                Ok(Negotiation {
                    token,
                    authenticated: true,
                    delegated,
                    session: Some(session),
                })
            }
            Ok(TokenVerdict::Continue) => {
                let token = negotiation.take_response().ok_or_else(|| {
                    warn!(
                        "domain {} requires continuation but produced no token",
                        dom.name()
                    );
                    failed()
                })?;
                debug!("negotiation in domain {} needs another round", dom.name());
                Ok(Negotiation {
                    token,
                    authenticated: false,
                    delegated: None,
                    session: None,
                })
            }
            Err(e) => {
                log_backend_error("negotiation", dom.name(), &e);
                Err(failed())
            }
        }
    }

    // peers that require a final message get a marker token with no
    // semantic content, distinguished by a per process counter
    fn dummy_token(&self) -> Bytes {
        let n = self.count.fetch_add(1, Ordering::Relaxed);
        Bytes::from(format!("auth validated with no further peer token {}", n))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unqualified_name() {
        assert_eq!(base_username("alice"), "alice");
        assert_eq!(domain_qualifier("alice"), None);
    }

    #[test]
    fn qualified_name() {
        assert_eq!(base_username("alice@corp"), "alice");
        assert_eq!(domain_qualifier("alice@corp"), Some("corp"));
    }

    #[test]
    fn escaped_at_is_not_a_qualifier() {
        assert_eq!(base_username("alice\\@example.com"), "alice@example.com");
        assert_eq!(domain_qualifier("alice\\@example.com"), None);
    }

    #[test]
    fn last_unescaped_at_wins() {
        assert_eq!(base_username("alice\\@example.com@corp"), "alice@example.com");
        assert_eq!(domain_qualifier("alice\\@example.com@corp"), Some("corp"));
    }

    #[test]
    fn empty_qualifier_is_preserved() {
        assert_eq!(base_username("alice@"), "alice");
        assert_eq!(domain_qualifier("alice@"), Some(""));
    }

    #[test]
    fn leading_at_is_a_qualifier_split() {
        assert_eq!(base_username("@corp"), "");
        assert_eq!(domain_qualifier("@corp"), Some("corp"));
    }
}

use crate::{
    auth::{Credential, DelegatedCredential, Principal, Subject},
    secctx::SecurityContext,
};
use anyhow::Error;
use bytes::Bytes;
use std::{any::Any, error, fmt};

pub mod file;
pub mod krb5;

/// Outcome of handing one inbound token to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenVerdict {
    /// The exchange completed and the subject is authenticated.
    Established,
    /// The peer must answer the outbound token before the exchange can
    /// complete. A normal intermediate outcome, not a failure.
    Continue,
}

/// Failure signals a backend may raise. `Unavailable` means the backend
/// subsystem itself could not serve the call (missing acceptor
/// credential, unreachable store); `Rejected` covers everything the
/// backend examined and refused.
#[derive(Debug)]
pub enum BackendError {
    Unavailable(Error),
    Rejected(Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendError::Unavailable(e) => write!(f, "backend unavailable: {}", e),
            BackendError::Rejected(e) => write!(f, "backend rejected the request: {}", e),
        }
    }
}

impl error::Error for BackendError {}

/// One round of an in progress token exchange. Created fresh for each
/// inbound token and discarded when the round completes; protocol state
/// that must survive across rounds lives in the backend that owns the
/// scheme.
pub struct NegotiationContext {
    request: Bytes,
    response: Option<Bytes>,
    authenticated: bool,
    delegated: Option<DelegatedCredential>,
    scheme: Option<Box<dyn Any + Send>>,
}

impl NegotiationContext {
    pub fn new(request: Bytes) -> Self {
        NegotiationContext {
            request,
            response: None,
            authenticated: false,
            delegated: None,
            scheme: None,
        }
    }

    /// The token just received from the peer.
    pub fn request(&self) -> &Bytes {
        &self.request
    }

    /// The token to send back, if the protocol produced one this round.
    pub fn response(&self) -> Option<&Bytes> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, token: Bytes) {
        self.response = Some(token)
    }

    pub fn take_response(&mut self) -> Option<Bytes> {
        self.response.take()
    }

    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn set_authenticated(&mut self) {
        self.authenticated = true
    }

    /// Set only when the protocol negotiated delegation; absent
    /// otherwise, never a default value.
    pub fn delegated(&self) -> Option<&DelegatedCredential> {
        self.delegated.as_ref()
    }

    pub fn set_delegated(&mut self, credential: DelegatedCredential) {
        self.delegated = Some(credential)
    }

    pub fn take_delegated(&mut self) -> Option<DelegatedCredential> {
        self.delegated.take()
    }

    /// The backend specific protocol context for this exchange, e.g. an
    /// established kerberos acceptor.
    pub fn scheme(&self) -> Option<&(dyn Any + Send)> {
        self.scheme.as_deref()
    }

    pub fn set_scheme(&mut self, scheme: Box<dyn Any + Send>) {
        self.scheme = Some(scheme)
    }
}

impl fmt::Debug for NegotiationContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // token material is deliberately omitted
        f.debug_struct("NegotiationContext")
            .field("authenticated", &self.authenticated)
            .field("has_response", &self.response.is_some())
            .field("has_delegated", &self.delegated.is_some())
            .finish_non_exhaustive()
    }
}

/// The validation capabilities a security domain backend provides. One
/// implementation exists per backend family; the session service
/// depends only on this interface.
pub trait SecurityDomainBackend: Send + Sync {
    /// Validate a plaintext credential for `principal`, populating
    /// `subject` on success. `Ok(false)` means the credential did not
    /// validate; `Err` means the backend could not decide.
    fn validate_credential(
        &self,
        principal: &Principal,
        credential: &Credential,
        subject: &mut Subject,
    ) -> Result<bool, BackendError>;

    /// Produce the opaque context representing `principal` active in
    /// `domain`.
    fn create_security_context(
        &self,
        domain: &str,
        principal: &Principal,
        credential: Option<&Credential>,
        subject: &Subject,
    ) -> Result<SecurityContext, BackendError>;

    /// Drive one round of token negotiation. The principal and any
    /// associated identities are extracted from the token itself; on
    /// `Established` the backend has populated `subject` and marked the
    /// negotiation context authenticated.
    fn validate_token(
        &self,
        negotiation: &mut NegotiationContext,
        subject: &mut Subject,
    ) -> Result<TokenVerdict, BackendError>;
}

use crate::secctx::SecurityContext;
use arcstr::ArcStr;
use bytes::Bytes;
use smallvec::SmallVec;
use std::fmt;
use zeroize::Zeroize;

/// A named identity attached to a [`Subject`] by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Principal(ArcStr);

impl Principal {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Principal(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque caller supplied secret. The buffer is wiped when the
/// credential is dropped, and `Debug` never prints it.
pub struct Credential(Vec<u8>);

impl Credential {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Credential(secret.into())
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<&str> for Credential {
    fn from(secret: &str) -> Self {
        Credential(secret.as_bytes().to_vec())
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.0.zeroize()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Credential(<redacted>)")
    }
}

/// The bag of principals and credentials a backend populates while
/// validating one call. Exclusively owned by that call, never shared.
#[derive(Debug, Default)]
pub struct Subject {
    principals: SmallVec<[Principal; 4]>,
    public_credentials: Vec<Bytes>,
    private_credentials: Vec<Bytes>,
}

impl Subject {
    pub fn new() -> Self {
        Subject::default()
    }

    /// Principals accumulate in the order backends push them,
    /// duplicates allowed.
    pub fn add_principal(&mut self, principal: Principal) {
        self.principals.push(principal)
    }

    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    pub fn first_principal(&self) -> Option<&Principal> {
        self.principals.first()
    }

    pub fn add_public_credential(&mut self, credential: Bytes) {
        self.public_credentials.push(credential)
    }

    pub fn public_credentials(&self) -> &[Bytes] {
        &self.public_credentials
    }

    pub fn add_private_credential(&mut self, credential: Bytes) {
        self.private_credentials.push(credential)
    }

    pub fn private_credentials(&self) -> &[Bytes] {
        &self.private_credentials
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

/// A credential the peer authorized this service to use on its behalf.
/// Only present when the backend protocol explicitly granted
/// delegation, never synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedCredential(Bytes);

impl DelegatedCredential {
    pub fn new(raw: impl Into<Bytes>) -> Self {
        DelegatedCredential(raw.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

/// The artifact of a successful logon: the qualified `user@domain`
/// name, the validated subject, the domain that admitted the caller,
/// and the security context the domain issued. Immutable once
/// constructed; its destruction is the session consumer's job.
#[derive(Debug)]
pub struct SessionIdentity {
    user: ArcStr,
    domain: ArcStr,
    subject: Subject,
    security_context: SecurityContext,
}

impl SessionIdentity {
    pub(crate) fn new(
        user: ArcStr,
        domain: ArcStr,
        subject: Subject,
        security_context: SecurityContext,
    ) -> Self {
        assert!(!subject.is_empty(), "a session requires at least one principal");
        SessionIdentity { user, domain, subject, security_context }
    }

    /// The qualified `user@domain` name.
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn security_context(&self) -> &SecurityContext {
        &self.security_context
    }
}

/// The outcome of one negotiation round. `authenticated == false` with
/// a non empty token means the peer must answer `token` and the reply
/// must be fed into another `negotiate` call; it is not a failure.
#[derive(Debug)]
pub struct Negotiation {
    /// The token to transport to the peer. Non empty even on final
    /// rounds; see the placeholder token policy in
    /// [`SessionService`](crate::SessionService).
    pub token: Bytes,
    pub authenticated: bool,
    /// Present only if the backend granted delegation.
    pub delegated: Option<DelegatedCredential>,
    /// Present only when `authenticated` is true.
    pub session: Option<SessionIdentity>,
}

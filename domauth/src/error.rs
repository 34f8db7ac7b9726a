use arcstr::ArcStr;
use std::{error, fmt};

/// Terminal outcomes of an authentication or negotiation call. A
/// negotiation round that merely needs another token from the peer is
/// not an error, it is a [`Negotiation`](crate::auth::Negotiation) with
/// `authenticated == false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The requested or derived domain has no registered backend.
    DomainNotFound(ArcStr),
    /// The credential did not validate against any eligible domain.
    AuthenticationFailed(ArcStr),
    /// The token exchange failed for a reason other than needing more
    /// rounds.
    NegotiationFailed(ArcStr),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::DomainNotFound(domain) => {
                write!(f, "security domain {} is not available", domain)
            }
            AuthError::AuthenticationFailed(user) => {
                write!(f, "logon failed for {}", user)
            }
            AuthError::NegotiationFailed(domain) => {
                write!(f, "token negotiation failed in domain {}", domain)
            }
        }
    }
}

impl error::Error for AuthError {}

use super::{BackendError, NegotiationContext, SecurityDomainBackend, TokenVerdict};
use crate::{
    auth::{Credential, Principal, Subject},
    secctx::SecurityContext,
};
use arcstr::ArcStr;
use bytes::Bytes;
use cross_krb5::{AcceptFlags, K5ServerCtx, PendingServerCtx, ServerCtx, Step};
use parking_lot::Mutex;
use std::{any::Any, sync::Arc};

/// A fully stepped kerberos acceptor context, carried as the opaque
/// payload of the security context it authenticated.
#[derive(Debug)]
pub struct K5Established(Mutex<ServerCtx>);

impl K5Established {
    pub fn lock(&self) -> parking_lot::MutexGuard<ServerCtx> {
        self.0.lock()
    }
}

/// The kerberos/GSS backend family. Tokens are accepted for `spn`;
/// identity comes from the ticket, so this family rejects plaintext
/// credential validation. The pending acceptor context is parked here
/// between rounds, one exchange in flight per domain.
pub struct Krb5Backend {
    spn: ArcStr,
    pending: Mutex<Option<PendingServerCtx>>,
    established: Mutex<Option<Arc<K5Established>>>,
}

impl Krb5Backend {
    pub fn new(spn: ArcStr) -> Self {
        Krb5Backend {
            spn,
            pending: Mutex::new(None),
            established: Mutex::new(None),
        }
    }

    pub fn spn(&self) -> &str {
        &self.spn
    }
}

impl SecurityDomainBackend for Krb5Backend {
    fn validate_credential(
        &self,
        _principal: &Principal,
        _credential: &Credential,
        _subject: &mut Subject,
    ) -> Result<bool, BackendError> {
        Err(BackendError::Rejected(anyhow!(
            "kerberos domains authenticate by token negotiation only"
        )))
    }

    fn create_security_context(
        &self,
        domain: &str,
        principal: &Principal,
        _credential: Option<&Credential>,
        _subject: &Subject,
    ) -> Result<SecurityContext, BackendError> {
        let payload = self
            .established
            .lock()
            .take()
            .map(|ctx| ctx as Arc<dyn Any + Send + Sync>);
        Ok(SecurityContext::new(ArcStr::from(domain), principal.clone(), payload))
    }

    fn validate_token(
        &self,
        negotiation: &mut NegotiationContext,
        subject: &mut Subject,
    ) -> Result<TokenVerdict, BackendError> {
        let ctx = match self.pending.lock().take() {
            Some(ctx) => ctx,
            None => ServerCtx::new(AcceptFlags::empty(), Some(&self.spn))
                .map_err(BackendError::Unavailable)?,
        };
        match ctx.step(&negotiation.request()[..]) {
            Ok(Step::Continue((ctx, token))) => {
                negotiation.set_response(Bytes::copy_from_slice(&*token));
                *self.pending.lock() = Some(ctx);
                Ok(TokenVerdict::Continue)
            }
            Ok(Step::Finished((mut ctx, token))) => {
                if let Some(token) = token {
                    negotiation.set_response(Bytes::copy_from_slice(&*token));
                }
                let client = ctx.client().map_err(BackendError::Rejected)?;
                subject.add_principal(Principal::new(ArcStr::from(client)));
                negotiation.set_authenticated();
                // cross-krb5 does not surface delegated credentials, so
                // delegation is never reported granted here
                let established = Arc::new(K5Established(Mutex::new(ctx)));
                negotiation.set_scheme(Box::new(established.clone()));
                *self.established.lock() = Some(established);
                Ok(TokenVerdict::Established)
            }
            Err(e) => Err(BackendError::Rejected(e)),
        }
    }
}

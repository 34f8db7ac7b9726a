use crate::auth::Principal;
use arcstr::ArcStr;
use std::{any::Any, cell::RefCell, fmt, marker::PhantomData, sync::Arc};

/// An opaque handle meaning "this principal is currently active in this
/// domain". Issued by the domain's backend; the payload has no meaning
/// outside the backend that created it. Cheap to clone.
#[derive(Clone)]
pub struct SecurityContext(Arc<SecurityContextInner>);

struct SecurityContextInner {
    domain: ArcStr,
    principal: Principal,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl SecurityContext {
    pub fn new(
        domain: impl Into<ArcStr>,
        principal: Principal,
        payload: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Self {
        SecurityContext(Arc::new(SecurityContextInner {
            domain: domain.into(),
            principal,
            payload,
        }))
    }

    pub fn domain(&self) -> &str {
        &self.0.domain
    }

    pub fn principal(&self) -> &Principal {
        &self.0.principal
    }

    /// The backend supplied payload, if any. Downcast by the backend
    /// family that issued it.
    pub fn payload(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.0.payload.as_deref()
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("domain", &self.0.domain)
            .field("principal", &self.0.principal)
            .finish_non_exhaustive()
    }
}

thread_local! {
    static AMBIENT: RefCell<Vec<SecurityContext>> = RefCell::new(Vec::new());
}

/// Restores the previously ambient context when dropped. Must drop on
/// the thread that bound it, hence !Send.
pub struct Bound(PhantomData<*const ()>);

impl Drop for Bound {
    fn drop(&mut self) {
        AMBIENT.with(|s| {
            s.borrow_mut().pop();
        })
    }
}

/// Install `ctx` as the calling thread's ambient security context until
/// the returned guard drops. Bindings nest; dropping the guard restores
/// whatever was ambient before this call, including on unwind.
pub fn bind(ctx: SecurityContext) -> Bound {
    AMBIENT.with(|s| s.borrow_mut().push(ctx));
    Bound(PhantomData)
}

/// Run `f` with `ctx` ambient, restoring the previous ambient context
/// on every exit path.
pub fn with_bound<R>(ctx: SecurityContext, f: impl FnOnce() -> R) -> R {
    let _bound = bind(ctx);
    f()
}

/// The innermost context bound on the calling thread, if any. Bindings
/// on other threads are never visible here.
pub fn current() -> Option<SecurityContext> {
    AMBIENT.with(|s| s.borrow().last().cloned())
}

#[cfg(test)]
mod test {
    use super::*;

    fn ctx(domain: &str, user: &str) -> SecurityContext {
        SecurityContext::new(ArcStr::from(domain), Principal::new(ArcStr::from(user)), None)
    }

    #[test]
    fn bindings_nest_and_restore() {
        assert!(current().is_none());
        with_bound(ctx("outer", "alice"), || {
            assert_eq!(current().unwrap().domain(), "outer");
            with_bound(ctx("inner", "bob"), || {
                assert_eq!(current().unwrap().domain(), "inner");
                assert_eq!(current().unwrap().principal().name(), "bob");
            });
            // inner binding restored the outer one, not "none"
            assert_eq!(current().unwrap().domain(), "outer");
        });
        assert!(current().is_none());
    }

    #[test]
    fn binding_restores_on_unwind() {
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_bound(ctx("doomed", "alice"), || panic!("backend blew up"))
        }));
        assert!(res.is_err());
        assert!(current().is_none());
    }

    #[test]
    fn bindings_are_thread_local() {
        with_bound(ctx("main", "alice"), || {
            let seen = std::thread::spawn(|| current().is_none()).join().unwrap();
            assert!(seen);
            assert_eq!(current().unwrap().domain(), "main");
        })
    }
}

//! Domauth admits callers into a system by validating their identity
//! against one of several independently configured identity backends,
//! called security domains. Two paths lead to a session: plaintext
//! credential logon, and a kerberos style challenge/response token
//! exchange that may span several request/response round trips.
//!
//! Domains are tried by name. A `user@domain` qualified user name pins
//! the logon to one domain; an unqualified name is tried against the
//! configured domains in order until one admits the caller.
//!
//! ```no_run
//! use domauth::{
//!     auth::Credential,
//!     config::Config,
//!     registry::DomainRegistry,
//!     SessionService,
//! };
//! # use anyhow::Result;
//! # fn run() -> Result<()> {
//! let cfg = Config::load("cfg/example-config.json")?;
//! let service = SessionService::new(DomainRegistry::from_config(&cfg)?);
//!
//! let session = service.authenticate("corp", "alice", Credential::from("sekrit"))?;
//! println!("{} logged on", session.user());
//! # Ok(())
//! # }
//! ```
//!
//! Token negotiation is one round per call. The caller owns transport:
//! send the returned token to the peer, and while `authenticated` is
//! false feed the peer's answer into another `negotiate` call.
//!
//! ```no_run
//! # use domauth::SessionService;
//! # use bytes::Bytes;
//! # use anyhow::Result;
//! # fn run(service: SessionService, first_token: Bytes) -> Result<()> {
//! let mut token = first_token;
//! loop {
//!     let round = service.negotiate("KRB.EXAMPLE.COM", token)?;
//!     if round.authenticated {
//!         let session = round.session.unwrap();
//!         println!("{} logged on", session.user());
//!         break;
//!     }
//!     token = exchange_with_peer(round.token)?;
//! }
//! # Ok(())
//! # }
//! # fn exchange_with_peer(t: Bytes) -> Result<Bytes> { Ok(t) }
//! ```
//!
//! While a backend validates, the identity it runs under is bound as
//! the calling thread's ambient [`secctx::SecurityContext`] and always
//! restored before the call returns, so identities never leak between
//! concurrent logons.
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate anyhow;

pub mod auth;
pub mod backend;
pub mod config;
mod error;
pub mod registry;
pub mod secctx;
mod session;

pub use error::AuthError;
pub use session::SessionService;

use super::{BackendError, NegotiationContext, SecurityDomainBackend, TokenVerdict};
use crate::{
    auth::{Credential, Principal, Subject},
    secctx::SecurityContext,
};
use anyhow::Result;
use arcstr::ArcStr;
use base64::prelude::*;
use fxhash::FxHashMap;
use rand::Rng;
use sha3::{Digest, Sha3_512};
use std::{collections::HashMap, fs::read_to_string, path::Path};

const SALT_LEN: usize = 8;

/// One user of a local store: the stored password token and the groups
/// attached to the subject as associated principals on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserEntry {
    /// base64 of salt followed by sha3-512 over salt and password.
    pub password: ArcStr,
    #[serde(default)]
    pub groups: Vec<ArcStr>,
}

fn hash(salt: [u8; SALT_LEN], password: &[u8]) -> Vec<u8> {
    let mut digest = Sha3_512::new();
    digest.update(&salt);
    digest.update(password);
    let mut token = Vec::with_capacity(SALT_LEN + Sha3_512::output_size());
    token.extend_from_slice(&salt);
    token.extend(digest.finalize());
    token
}

/// Salt and hash `password` into the stored representation used by
/// [`UserEntry`].
pub fn hash_password(password: &[u8]) -> String {
    let salt = rand::thread_rng().gen::<u64>().to_be_bytes();
    BASE64_STANDARD.encode(hash(salt, password))
}

fn verify_password(stored: &str, password: &[u8]) -> Result<bool> {
    let token = BASE64_STANDARD.decode(stored)?;
    if token.len() != SALT_LEN + Sha3_512::output_size() {
        bail!("malformed stored password token")
    }
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&token[..SALT_LEN]);
    Ok(hash(salt, password) == token)
}

/// The local store backend family: users and salted password hashes in
/// a JSON file, loaded once at construction. This family validates
/// credentials only; it does not negotiate.
pub struct FileBackend {
    users: FxHashMap<ArcStr, UserEntry>,
}

impl FileBackend {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let users: HashMap<ArcStr, UserEntry> =
            serde_json::from_str(&read_to_string(path)?)?;
        Ok(Self::from_entries(users))
    }

    pub fn from_entries(users: impl IntoIterator<Item = (ArcStr, UserEntry)>) -> Self {
        FileBackend { users: users.into_iter().collect() }
    }
}

impl SecurityDomainBackend for FileBackend {
    fn validate_credential(
        &self,
        principal: &Principal,
        credential: &Credential,
        subject: &mut Subject,
    ) -> Result<bool, BackendError> {
        let entry = match self.users.get(principal.name()) {
            Some(entry) => entry,
            None => return Ok(false),
        };
        if !verify_password(&entry.password, credential.expose())
            .map_err(BackendError::Rejected)?
        {
            return Ok(false);
        }
        subject.add_principal(principal.clone());
        for group in &entry.groups {
            subject.add_principal(Principal::new(group.clone()));
        }
        Ok(true)
    }

    fn create_security_context(
        &self,
        domain: &str,
        principal: &Principal,
        _credential: Option<&Credential>,
        _subject: &Subject,
    ) -> Result<SecurityContext, BackendError> {
        Ok(SecurityContext::new(ArcStr::from(domain), principal.clone(), None))
    }

    fn validate_token(
        &self,
        _negotiation: &mut NegotiationContext,
        _subject: &mut Subject,
    ) -> Result<TokenVerdict, BackendError> {
        Err(BackendError::Rejected(anyhow!(
            "a local user store does not accept token negotiation"
        )))
    }
}

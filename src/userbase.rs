mod ldap;
mod userpass;

pub use self::ldap::LdapUserBase;
pub use self::userpass::UserPass;

use crate::config::UserBaseConf;
use crate::error::Error;

/// Outcome of a credential lookup. A missing user and a wrong password are
/// ordinary outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    Success,
    NoSuchUser,
    IncorrectPassword,
}

pub type DynUserBase = dyn UserBase + Send + Sync + 'static;

#[async_trait::async_trait]
pub trait UserBase {
    async fn lookup(&self, user: &str, password: &str) -> Result<LookupResult, Error>;

    /// True only when the user exists and the password matches. Backend
    /// failures propagate; they never read as invalid credentials.
    async fn is_valid(&self, user: &str, password: &str) -> Result<bool, Error> {
        Ok(self.lookup(user, password).await? == LookupResult::Success)
    }
}

/// Build a user base from its configuration. The LDAP backend comes back
/// connected and bound, ready for lookups.
pub async fn get_user_base(conf: &UserBaseConf) -> Result<Box<DynUserBase>, Error> {
    match conf {
        UserBaseConf::Ldap(conf) => {
            let mut ldap = LdapUserBase::new(conf)?;
            ldap.initialize().await?;
            Ok(Box::new(ldap))
        }
        UserBaseConf::UserPass(conf) => Ok(Box::new(UserPass::new(conf))),
    }
}

//! Credential validation against a user base.
//!
//! A caller hands in a configuration and gets back a [`UserBase`] it can ask
//! whether a username/password pair is valid. The LDAP backend owns a single
//! directory connection: construct it, [`initialize`] once (connect and
//! bind), then look up credentials as often as needed.
//!
//! [`initialize`]: userbase::LdapUserBase::initialize

pub mod config;
pub mod error;
pub mod userbase;

pub use crate::config::{ConnectionOptions, LdapConf, UserBaseConf, UserPassConf};
pub use crate::error::{ConfigError, Error};
pub use crate::userbase::{
    get_user_base, DynUserBase, LdapUserBase, LookupResult, UserBase, UserPass,
};

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::LdapConf;
use crate::error::Error;
use crate::userbase::{LookupResult, UserBase};

/// A user base backed by an LDAP directory.
///
/// The validator owns one connection, established by [`initialize`]. Each
/// lookup searches for the user's entry and compares the value of the
/// configured password attribute against the supplied password.
///
/// [`initialize`]: LdapUserBase::initialize
pub struct LdapUserBase {
    conf: LdapConf,
    url: Url,
    ldap: Option<Ldap>,
}

/// The credential extracted from a matching entry. Built and dropped inside
/// a single lookup, never cached.
#[derive(Debug)]
struct DirectoryRecord {
    username: String,
    password: String,
}

impl LdapUserBase {
    pub fn new(conf: &LdapConf) -> Result<LdapUserBase, Error> {
        conf.validate()?;
        let url = conf.server_url()?;

        Ok(LdapUserBase {
            conf: conf.clone(),
            url,
            ldap: None,
        })
    }

    /// Connect to the directory and bind as the service account. Required
    /// once before any lookup. Calling it again replaces the connection,
    /// which is the recovery path after a search error tore down the old
    /// one.
    pub async fn initialize(&mut self) -> Result<(), Error> {
        // required settings are checked again before anything touches the
        // network
        self.conf.validate()?;

        let (conn, mut ldap) = LdapConnAsync::with_settings(self.settings(), self.url.as_str())
            .await
            .map_err(|source| Error::Connection {
                url: self.url.to_string(),
                source,
            })?;

        ldap3::drive!(conn);

        ldap.simple_bind(&self.conf.binddn, &self.conf.bindpw)
            .await
            .map_err(|source| Error::Connection {
                url: self.url.to_string(),
                source,
            })?
            .success()
            .map_err(|source| Error::Bind {
                dn: self.conf.binddn.clone(),
                source,
            })?;

        info!(url = %self.url, binddn = %self.conf.binddn, "bound to directory");

        self.ldap = Some(ldap);
        Ok(())
    }

    fn handle(&self) -> Result<Ldap, Error> {
        self.ldap.clone().ok_or(Error::NotInitialized)
    }

    fn settings(&self) -> LdapConnSettings {
        let opts = &self.conf.connection;
        let mut settings = LdapConnSettings::new()
            .set_starttls(opts.starttls)
            .set_no_tls_verify(opts.no_tls_verify);

        if let Some(secs) = opts.timeout {
            settings = settings.set_conn_timeout(Duration::from_secs(secs));
        }

        settings
    }

    // The username is interpolated verbatim, without escaping filter
    // metacharacters. Existing deployments rely on the raw value reaching
    // the directory.
    fn filter(&self, user: &str) -> String {
        format!(
            "(&(objectClass={})({}={}))",
            self.conf.objclass, self.conf.userattr, user
        )
    }

    async fn search(&self, user: &str) -> Result<Option<DirectoryRecord>, Error> {
        let mut ldap = self.handle()?;

        let filter = self.filter(user);
        let attrs = vec![self.conf.userattr.as_str(), self.conf.passattr.as_str()];

        debug!(base = %self.conf.basedn, %filter, "searching directory");

        let result = ldap
            .search(&self.conf.basedn, Scope::Subtree, &filter, attrs)
            .await
            .and_then(|res| res.success());

        let entries = match result {
            Ok((entries, _)) => entries,
            Err(source) => {
                // release the connection first; a failed release must not
                // mask the search error
                if let Err(err) = ldap.unbind().await {
                    warn!(?err, "failed to release directory connection");
                }
                return Err(Error::Search {
                    base: self.conf.basedn.clone(),
                    source,
                });
            }
        };

        let entries: Vec<SearchEntry> = entries.into_iter().map(SearchEntry::construct).collect();

        Ok(pick_entry(entries)
            .and_then(|entry| extract_record(&entry, &self.conf.userattr, &self.conf.passattr)))
    }
}

/// Take the first entry in result order. More than one match is worth a
/// warning, never an error.
fn pick_entry(entries: Vec<SearchEntry>) -> Option<SearchEntry> {
    if entries.len() > 1 {
        warn!(
            count = entries.len(),
            "ambiguous result: using the first matching entry"
        );
    }

    entries.into_iter().next()
}

// An attribute name containing "dn" (any case) selects the entry's
// distinguished name instead of an attribute value.
fn uses_dn(userattr: &str) -> bool {
    userattr.to_ascii_lowercase().contains("dn")
}

fn first_attr(entry: &SearchEntry, name: &str) -> Option<String> {
    entry.attrs.get(name).and_then(|values| values.first()).cloned()
}

fn extract_record(entry: &SearchEntry, userattr: &str, passattr: &str) -> Option<DirectoryRecord> {
    let username = if uses_dn(userattr) {
        Some(entry.dn.clone())
    } else {
        first_attr(entry, userattr)
    };

    match (username, first_attr(entry, passattr)) {
        (Some(username), Some(password)) => Some(DirectoryRecord { username, password }),
        _ => {
            debug!(dn = %entry.dn, "entry carries no usable credential");
            None
        }
    }
}

fn decide(record: Option<DirectoryRecord>, user: &str, password: &str) -> LookupResult {
    match record {
        None => LookupResult::NoSuchUser,
        // the extracted name has to equal the queried one verbatim
        Some(record) if record.username != user => LookupResult::NoSuchUser,
        Some(record) if record.password == password => LookupResult::Success,
        Some(_) => LookupResult::IncorrectPassword,
    }
}

#[async_trait]
impl UserBase for LdapUserBase {
    #[tracing::instrument(skip(self, user, password))]
    async fn lookup(&self, user: &str, password: &str) -> Result<LookupResult, Error> {
        let verdict = decide(self.search(user).await?, user, password);

        match verdict {
            LookupResult::Success => debug!("successful user lookup"),
            LookupResult::NoSuchUser => debug!("user not found"),
            LookupResult::IncorrectPassword => debug!("incorrect password"),
        }

        Ok(verdict)
    }
}

use thiserror::Error;

/// Failures surfaced by a user base. A failed credential check is not an
/// error; lookups only error when the backend itself cannot answer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("cannot connect to directory server {url}")]
    Connection {
        url: String,
        #[source]
        source: ldap3::LdapError,
    },

    #[error("directory rejected bind as {dn}")]
    Bind {
        dn: String,
        #[source]
        source: ldap3::LdapError,
    },

    #[error("directory search under {base} failed")]
    Search {
        base: String,
        #[source]
        source: ldap3::LdapError,
    },

    #[error("user base has not been initialized")]
    NotInitialized,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting `{0}` is missing or empty")]
    MissingField(&'static str),

    #[error("`{server}` is not a usable server address")]
    InvalidServer { server: String },

    #[error("error loading config file: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing config")]
    Parse(#[from] serde_yaml::Error),
}

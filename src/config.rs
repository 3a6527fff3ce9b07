use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

fn default_userattr() -> String {
    "cn".to_owned()
}

fn default_passattr() -> String {
    "userPassword".to_owned()
}

fn default_objclass() -> String {
    "person".to_owned()
}

/// Connection parameters handed through to the directory client. `scheme`
/// and `port` only apply when `server` names a bare host.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConnectionOptions {
    pub scheme: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub starttls: bool,
    #[serde(default)]
    pub no_tls_verify: bool,
    /// Connect timeout in seconds.
    pub timeout: Option<u64>,
}

/// Settings for the LDAP user base. Unknown keys are ignored; the four
/// connection and bind settings are mandatory, the attribute names fall
/// back to the usual directory schema.
#[derive(Deserialize, Debug, Clone)]
pub struct LdapConf {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub binddn: String,
    #[serde(default)]
    pub bindpw: String,
    #[serde(default)]
    pub basedn: String,
    #[serde(default = "default_userattr")]
    pub userattr: String,
    #[serde(default = "default_passattr")]
    pub passattr: String,
    #[serde(default = "default_objclass")]
    pub objclass: String,
    #[serde(default)]
    pub connection: ConnectionOptions,
}

impl LdapConf {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("server", &self.server),
            ("binddn", &self.binddn),
            ("bindpw", &self.bindpw),
            ("basedn", &self.basedn),
        ];

        for (name, value) in required {
            if value.is_empty() {
                return Err(ConfigError::MissingField(name));
            }
        }

        Ok(())
    }

    /// The URL the directory client connects to. `server` is used verbatim
    /// when it already carries a scheme.
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let raw = if self.server.contains("://") {
            self.server.clone()
        } else {
            let scheme = self.connection.scheme.as_deref().unwrap_or("ldap");
            format!("{}://{}", scheme, self.server)
        };

        let mut url = Url::parse(&raw).map_err(|_| ConfigError::InvalidServer {
            server: self.server.clone(),
        })?;

        if let Some(port) = self.connection.port {
            url.set_port(Some(port))
                .map_err(|_| ConfigError::InvalidServer {
                    server: self.server.clone(),
                })?;
        }

        Ok(url)
    }
}

#[derive(Deserialize, Debug)]
pub struct UserPassConf {
    pub users: Vec<(String, String)>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum UserBaseConf {
    Ldap(LdapConf),
    UserPass(UserPassConf),
}

pub fn load(path: &Path) -> Result<UserBaseConf, ConfigError> {
    let reader = std::fs::File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_string_lossy().into_owned(),
        source,
    })?;

    let config = serde_yaml::from_reader(reader)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> LdapConf {
        serde_yaml::from_str(
            "server: ldap.example.com\n\
             binddn: cn=proxy,dc=example,dc=com\n\
             bindpw: hunter2\n\
             basedn: ou=people,dc=example,dc=com\n",
        )
        .unwrap()
    }

    #[test]
    fn defaults_fill_in_when_absent() {
        let conf = minimal();

        assert_eq!(conf.userattr, "cn");
        assert_eq!(conf.passattr, "userPassword");
        assert_eq!(conf.objclass, "person");
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn explicit_attribute_names_are_kept() {
        let conf: LdapConf = serde_yaml::from_str(
            "server: ldap.example.com\n\
             binddn: cn=proxy,dc=example,dc=com\n\
             bindpw: hunter2\n\
             basedn: ou=people,dc=example,dc=com\n\
             userattr: uid\n\
             passattr: userSecret\n\
             objclass: posixAccount\n",
        )
        .unwrap();

        assert_eq!(conf.userattr, "uid");
        assert_eq!(conf.passattr, "userSecret");
        assert_eq!(conf.objclass, "posixAccount");
    }

    #[test]
    fn each_required_setting_is_checked() {
        for field in ["server", "binddn", "bindpw", "basedn"] {
            let mut conf = minimal();
            match field {
                "server" => conf.server.clear(),
                "binddn" => conf.binddn.clear(),
                "bindpw" => conf.bindpw.clear(),
                "basedn" => conf.basedn.clear(),
                _ => unreachable!(),
            }

            match conf.validate() {
                Err(ConfigError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("expected MissingField({:?}), got {:?}", field, other),
            }
        }
    }

    #[test]
    fn settings_absent_from_the_input_fail_validation() {
        let conf: LdapConf = serde_yaml::from_str("userattr: uid").unwrap();

        assert!(matches!(
            conf.validate(),
            Err(ConfigError::MissingField("server"))
        ));
    }

    #[test]
    fn non_mapping_input_is_rejected() {
        assert!(serde_yaml::from_str::<LdapConf>("just a string").is_err());
        assert!(serde_yaml::from_str::<LdapConf>("- a\n- list\n").is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let conf: LdapConf = serde_yaml::from_str(
            "server: ldap.example.com\n\
             binddn: cn=proxy,dc=example,dc=com\n\
             bindpw: hunter2\n\
             basedn: ou=people,dc=example,dc=com\n\
             wibble: 42\n",
        )
        .unwrap();

        assert!(conf.validate().is_ok());
    }

    #[test]
    fn server_url_defaults_to_ldap_scheme() {
        let conf = minimal();

        assert_eq!(
            conf.server_url().unwrap().as_str(),
            "ldap://ldap.example.com"
        );
    }

    #[test]
    fn connection_options_set_scheme_and_port() {
        let mut conf = minimal();
        conf.connection.scheme = Some("ldaps".to_owned());
        conf.connection.port = Some(6636);

        assert_eq!(
            conf.server_url().unwrap().as_str(),
            "ldaps://ldap.example.com:6636"
        );
    }

    #[test]
    fn server_with_scheme_is_used_verbatim() {
        let mut conf = minimal();
        conf.server = "ldap://10.0.0.1:3389".to_owned();

        assert_eq!(conf.server_url().unwrap().as_str(), "ldap://10.0.0.1:3389");
    }

    #[test]
    fn unparseable_server_is_a_config_error() {
        let mut conf = minimal();
        conf.server = "not a host name".to_owned();

        assert!(matches!(
            conf.server_url(),
            Err(ConfigError::InvalidServer { .. })
        ));
    }

    #[test]
    fn user_base_config_dispatches_on_kind() {
        let conf: UserBaseConf = serde_yaml::from_str(
            "ldap:\n\
            \x20 server: ldap.example.com\n\
            \x20 binddn: cn=proxy,dc=example,dc=com\n\
            \x20 bindpw: hunter2\n\
            \x20 basedn: ou=people,dc=example,dc=com\n",
        )
        .unwrap();
        assert!(matches!(conf, UserBaseConf::Ldap(_)));

        let conf: UserBaseConf =
            serde_yaml::from_str("user_pass:\n  users:\n    - [alice, secret]\n").unwrap();
        assert!(matches!(conf, UserBaseConf::UserPass(_)));
    }
}

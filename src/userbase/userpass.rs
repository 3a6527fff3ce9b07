use std::collections::HashMap;

use tracing::debug;

use crate::config::UserPassConf;
use crate::error::Error;
use crate::userbase::{LookupResult, UserBase};

/// A fixed in-memory user base. Useful for bootstrap setups and as the
/// trivial backend in tests.
pub struct UserPass {
    users: HashMap<String, String>,
}

impl UserPass {
    pub fn new(config: &UserPassConf) -> UserPass {
        UserPass {
            users: config.users.iter().cloned().collect(),
        }
    }
}

#[async_trait::async_trait]
impl UserBase for UserPass {
    #[tracing::instrument(skip(self, user, password))]
    async fn lookup(&self, user: &str, password: &str) -> Result<LookupResult, Error> {
        match self.users.get(user) {
            None => {
                debug!("user not found");
                Ok(LookupResult::NoSuchUser)
            }
            Some(expected) if expected == password => {
                debug!("successful user lookup");
                Ok(LookupResult::Success)
            }
            Some(_) => {
                debug!("incorrect password");
                Ok(LookupResult::IncorrectPassword)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> UserPass {
        UserPass::new(&UserPassConf {
            users: vec![("alice".to_owned(), "secret".to_owned())],
        })
    }

    #[tokio::test]
    async fn lookup_covers_all_three_outcomes() -> anyhow::Result<()> {
        let base = base();

        assert_eq!(base.lookup("alice", "secret").await?, LookupResult::Success);
        assert_eq!(
            base.lookup("alice", "wrong").await?,
            LookupResult::IncorrectPassword
        );
        assert_eq!(
            base.lookup("nobody", "secret").await?,
            LookupResult::NoSuchUser
        );

        Ok(())
    }

    #[tokio::test]
    async fn is_valid_maps_success_only() -> anyhow::Result<()> {
        let base = base();

        assert!(base.is_valid("alice", "secret").await?);
        assert!(!base.is_valid("alice", "wrong").await?);
        assert!(!base.is_valid("nobody", "anything").await?);

        Ok(())
    }

    #[tokio::test]
    async fn repeated_lookups_are_stable() -> anyhow::Result<()> {
        let base = base();

        for _ in 0..3 {
            assert!(base.is_valid("alice", "secret").await?);
            assert!(!base.is_valid("alice", "wrong").await?);
        }

        Ok(())
    }
}

use std::sync::Mutex;

use nanomock_crypto::{AccountKey, KeySpec};
use nanomock_types::{Account, Seed};

use crate::builder::{BlockBuilder, BuildOptions};
use crate::draft::BlockIntent;
use crate::error::BlockgenError;
use crate::result::BlockResult;

/// Representative changes, one block at a time.
///
/// A representative set with [`set_representative`] is reused by every
/// later change that does not name one.
///
/// [`set_representative`]: ChangeGenerator::set_representative
pub struct ChangeGenerator {
    builder: BlockBuilder,
    broadcast: bool,
    representative: Mutex<Option<Account>>,
}

fn random_account() -> Account {
    AccountKey::from_seed(&Seed::random(), 0).account
}

impl ChangeGenerator {
    pub fn new(builder: BlockBuilder, broadcast: bool) -> Self {
        Self {
            builder,
            broadcast,
            representative: Mutex::new(None),
        }
    }

    /// Remember `representative`, or a freshly generated account when `None`.
    pub fn set_representative(&self, representative: Option<Account>) -> Account {
        let chosen = representative.unwrap_or_else(random_account);
        if let Ok(mut current) = self.representative.lock() {
            *current = Some(chosen);
        }
        chosen
    }

    pub fn representative(&self) -> Option<Account> {
        self.representative.lock().ok().and_then(|current| *current)
    }

    /// Change `key`'s representative to `representative`, the remembered one,
    /// or a random account, in that order of preference.
    pub async fn change(&self, key: &AccountKey, representative: Option<Account>) -> BlockResult {
        let representative = representative
            .or_else(|| self.representative())
            .unwrap_or_else(random_account);
        self.builder
            .build(
                key,
                BlockIntent::Change { representative },
                BuildOptions::in_memory(self.broadcast),
            )
            .await
    }

    pub async fn change_spec(
        &self,
        spec: &KeySpec,
        representative: Option<Account>,
    ) -> Result<BlockResult, BlockgenError> {
        let key = spec.derive()?;
        Ok(self.change(&key, representative).await)
    }
}

use std::sync::Arc;

use crate::account::AccountService;
use crate::config::AppConfig;
use crate::store::BankStore;
use crate::transfer::TransferEngine;
use crate::user_auth::UserAuthService;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    /// Storage engine behind every service
    pub store: Arc<dyn BankStore>,
    pub user_auth: Arc<UserAuthService>,
    pub accounts: Arc<AccountService>,
    pub transfers: Arc<TransferEngine>,
}

impl AppState {
    /// Wire every service onto one store
    pub fn new(store: Arc<dyn BankStore>, config: &AppConfig) -> Self {
        Self {
            user_auth: Arc::new(UserAuthService::new(store.clone(), &config.auth)),
            accounts: Arc::new(AccountService::new(store.clone(), config.accounts.clone())),
            transfers: Arc::new(TransferEngine::new(store.clone(), config.transfer.clone())),
            store,
        }
    }

    /// Replace the account service (tests inject a number generator)
    pub fn with_account_service(mut self, accounts: AccountService) -> Self {
        self.accounts = Arc::new(accounts);
        self
    }
}

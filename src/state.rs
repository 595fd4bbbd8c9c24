use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::storage::{JsonFile, RecordFile};
use crate::users::{
    email::{DnsMxResolver, EmailValidator},
    UserStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<UserStore>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let email = if config.email.check_mx {
            EmailValidator::with_resolver(Arc::new(DnsMxResolver::new(config.email.mx_timeout())))
        } else {
            EmailValidator::syntax_only()
        };

        let check_mx = email.checks_domain();

        let file = Box::new(JsonFile::new(&config.data_file)) as Box<dyn RecordFile>;
        let store = UserStore::open(file, email)
            .with_context(|| format!("load users from {}", config.data_file.display()))?;
        tracing::info!(users = store.len(), check_mx, "user store loaded");

        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: UserStore, config: Arc<AppConfig>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            config,
        }
    }

    #[cfg(test)]
    pub fn fake(file: crate::storage::MemoryFile) -> Self {
        use crate::config::EmailConfig;

        let store = UserStore::open(Box::new(file), EmailValidator::syntax_only())
            .expect("fake store opens");
        let config = Arc::new(AppConfig {
            data_file: "fake.json".into(),
            host: "127.0.0.1".into(),
            port: 0,
            email: EmailConfig {
                check_mx: false,
                mx_timeout_secs: 1,
            },
        });
        Self::from_parts(store, config)
    }
}

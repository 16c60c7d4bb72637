use crate::commands::Ctx;
use crate::model::ItemId;
use crate::remote::{AuthToken, Credentials, MemRemote, RemoteService};
use crate::store::{ClientStore, StoreHandle, StoreSettings};

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "secret1";

/// A logged-in user against a fresh in-process service and an empty store.
pub struct TestEnv {
    pub remote: MemRemote,
    pub store: StoreHandle,
    pub token: AuthToken,
    pub user_id: ItemId,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_settings(StoreSettings::default()).await
    }

    pub async fn with_settings(settings: StoreSettings) -> Self {
        let remote = MemRemote::new();
        remote.add_user(EMAIL, PASSWORD, "Ada");
        let login = remote
            .login(&Credentials {
                email: EMAIL.into(),
                password: PASSWORD.into(),
            })
            .await
            .expect("login against MemRemote");
        remote.clear_requests();
        Self {
            remote,
            store: StoreHandle::new(ClientStore::new(settings)),
            token: login.token,
            user_id: login.user.id,
        }
    }

    pub fn ctx(&self) -> Ctx<'_, MemRemote> {
        Ctx::new(
            &self.remote,
            &self.store,
            self.token.clone(),
            Some(self.user_id.clone()),
        )
    }
}

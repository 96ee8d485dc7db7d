//! Shared request context.
//!
//! Groups the state every step of a request needs (HTTP client, settings,
//! reporter, cancellation, the chosen architecture and store preference) so
//! it is built once in `main` and passed down by reference.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;

use apkget_core::store::{BazaarClient, MyketClient, StoreClient};
use apkget_core::tools::{ProcessGateway, ToolLocator};
use apkget_core::{Reporter, Settings, USER_AGENT, config_path};
use apkget_schema::{Arch, StorePreference};

use crate::Cli;
use crate::ui::Output;
use crate::ui::menu::{self, MenuItem};

pub struct Context {
    pub client: reqwest::Client,
    pub settings: Settings,
    pub reporter: Arc<Output>,
    pub cancel: CancellationToken,
    pub arch: Arch,
    pub store: StorePreference,
    pub interactive: bool,
    myket: Arc<MyketClient>,
    bazaar: Arc<BazaarClient>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("arch", &self.arch)
            .field("store", &self.store)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Build the context, asking for architecture and store when the flags
    /// leave them open and prompting is allowed.
    pub async fn from_cli(cli: &Cli, cancel: CancellationToken) -> Result<Self> {
        let settings = Settings::load_default()
            .await
            .context("Failed to load settings")?;
        let interactive = cli.interactive();

        let arch = match cli.arch {
            Some(arch) => arch,
            None if interactive => choose_arch()?,
            None => Arch::default(),
        };
        let store = match cli.store {
            Some(store) => store,
            None if interactive => choose_store()?,
            None => StorePreference::default(),
        };

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;

        let myket = Arc::new(
            MyketClient::new(client.clone(), arch).with_token(settings.myket_token.clone()),
        );
        let bazaar = Arc::new(BazaarClient::new(client.clone()));

        Ok(Self {
            client,
            settings,
            reporter: Arc::new(Output::new()),
            cancel,
            arch,
            store,
            interactive,
            myket,
            bazaar,
        })
    }

    pub fn clients(&self) -> Vec<Arc<dyn StoreClient>> {
        let myket: Arc<dyn StoreClient> = self.myket.clone();
        vec![myket, self.bazaar.clone()]
    }

    pub fn reporter(&self) -> Arc<dyn Reporter> {
        self.reporter.clone()
    }

    /// Tool gateway bound to the configured tools directory and this
    /// request's cancellation token.
    pub fn gateway(&self) -> ProcessGateway {
        ProcessGateway::new(ToolLocator::new(self.settings.tools_dir()))
            .with_cancellation(self.cancel.clone())
    }

    /// Write a newly issued Myket token back to `config.toml`.
    ///
    /// Re-reads the file first so keys edited while the request ran survive.
    pub async fn persist_token(&self) -> Result<()> {
        let Some(token) = self.myket.token().await else {
            return Ok(());
        };
        if self.settings.myket_token.as_deref() == Some(token.as_str()) {
            return Ok(());
        }
        let path = config_path();
        let mut settings = Settings::load(&path).await?;
        settings.myket_token = Some(token);
        settings.save(&path).await?;
        tracing::debug!(path = %path.display(), "saved myket token");
        Ok(())
    }
}

fn choose_arch() -> Result<Arch> {
    let items: Vec<MenuItem> = Arch::ALL
        .iter()
        .map(|arch| MenuItem::new(arch.as_str()).detail(arch.cpu_list()))
        .collect();
    let choice = menu::select("Choose architecture", &items)?;
    Ok(choice.map_or_else(Arch::default, |i| Arch::ALL[i]))
}

fn choose_store() -> Result<StorePreference> {
    let items: Vec<MenuItem> = StorePreference::ALL
        .iter()
        .map(|pref| MenuItem::new(pref.label()))
        .collect();
    let choice = menu::select("Choose store preference", &items)?;
    Ok(choice.map_or_else(StorePreference::default, |i| StorePreference::ALL[i]))
}

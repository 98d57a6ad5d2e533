//! Application shell
//!
//! Builds the shared catalog service and the persisted mirror from the
//! configuration, mounts one catalog view, and runs a command against it.

use crate::cli::{AddArgs, Command};
use crate::config::Config;
use crate::form::FormField;
use crate::mirror::MirrorStore;
use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::view::{CatalogView, ViewPhase};
use anyhow::Context;
use catalog_client::{CatalogApi, HttpClient, NetworkHttpClient};
use std::sync::Arc;

/// Shell over the network client and the configured store
pub type AppShell = Shell<NetworkHttpClient, Box<dyn KeyValueStore>>;

pub struct Shell<H, S> {
    view: CatalogView<H, S>,
}

impl AppShell {
    /// Wire the network client and durable storage described by `config`
    pub fn mount(config: &Config) -> anyhow::Result<Self> {
        let api = CatalogApi::from_config(&config.client_config())
            .context("Failed to create catalog client")?;

        let store: Box<dyn KeyValueStore> = if config.ephemeral {
            Box::new(MemoryStore::new())
        } else {
            Box::new(FileStore::new(&config.data_dir))
        };
        let mirror = MirrorStore::load(store).with_policy(config.reconcile_policy());

        tracing::info!(
            base_url = %config.base_url,
            data_dir = %config.data_dir.display(),
            ephemeral = config.ephemeral,
            policy = ?mirror.policy(),
            cached = mirror.len(),
            "Catalog shell mounted"
        );
        Ok(Self::new(CatalogView::mount(Arc::new(api), mirror)))
    }
}

impl<H, S> Shell<H, S>
where
    H: HttpClient + 'static,
    S: KeyValueStore,
{
    pub fn new(view: CatalogView<H, S>) -> Self {
        Self { view }
    }

    pub fn view(&self) -> &CatalogView<H, S> {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut CatalogView<H, S> {
        &mut self.view
    }

    /// Run `command` to completion and unmount the view
    pub async fn run(mut self, command: Command) -> anyhow::Result<()> {
        let result = match command {
            Command::Browse => crate::tui::run(&mut self.view).await,
            command => self.execute(command).await.map(|lines| {
                for line in lines {
                    println!("{line}");
                }
            }),
        };
        self.view.unmount();
        result
    }

    /// Run a headless command, returning the lines to print
    pub async fn execute(&mut self, command: Command) -> anyhow::Result<Vec<String>> {
        match command {
            Command::Browse => anyhow::bail!("browse needs an interactive terminal"),
            Command::List => {
                self.fetch().await?;
                Ok(self.view.screen().lines())
            }
            Command::Add(args) => self.add(args).await,
            Command::BumpPrice { id } => self.bump_price(id).await,
        }
    }

    /// Fetch and reconcile, failing on a fetch error
    async fn fetch(&mut self) -> anyhow::Result<()> {
        if !self.view.refresh().await {
            anyhow::bail!("Catalog view unmounted");
        }
        if let ViewPhase::Failed(message) = self.view.phase() {
            anyhow::bail!("Error fetching products: {message}");
        }
        Ok(())
    }

    async fn add(&mut self, args: AddArgs) -> anyhow::Result<Vec<String>> {
        let form = self.view.form_mut();
        form.open();
        form.set(FormField::Title, args.title);
        form.set(FormField::Price, args.price);
        form.set(FormField::Description, args.description);
        form.set(FormField::Category, args.category);
        form.set(FormField::Image, args.image);
        form.set(FormField::Rating, args.rating);

        if !self.view.submit_add_form().await {
            let message = self
                .view
                .form()
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Product was not added".to_string());
            anyhow::bail!(message);
        }
        Ok(self.view.status().map(str::to_string).into_iter().collect())
    }

    async fn bump_price(&mut self, id: u64) -> anyhow::Result<Vec<String>> {
        self.fetch().await?;
        if !self.view.increase_price(id).await {
            let message = self
                .view
                .status()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Product {id} was not updated"));
            anyhow::bail!(message);
        }

        let mut lines: Vec<String> = self.view.status().map(str::to_string).into_iter().collect();
        if let Some(product) = self.view.mirror().get(id) {
            lines.push(format!("{} now costs {}", product.title, product.price_label()));
        }
        Ok(lines)
    }
}

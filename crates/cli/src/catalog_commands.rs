use {
    anyhow::{Result, bail},
    clap::Subcommand,
    skillport_config::SkillportConfig,
    skillport_skills::{CatalogEntry, LOCAL_CATALOG_ID, SkillsCatalog},
};

use crate::app::{App, default_catalog_name};

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List catalogs and how many skills each offers.
    List,
    /// Add a GitHub repository or local folder as a catalog.
    Add {
        /// `https://github.com/owner/repo`, `owner/repo` or a folder path.
        url: String,
        /// Display name; defaults to `owner/repo` or the folder name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove a catalog. Installed skills are left alone.
    Remove {
        /// Catalog id, name or url.
        id: String,
    },
    /// Reload one catalog, or all of them.
    Refresh { id: Option<String> },
}

pub async fn handle_catalogs(action: CatalogAction, config: SkillportConfig) -> Result<()> {
    let mut app = App::open(config)?;
    match action {
        CatalogAction::List => {
            app.library.load_all().await;
            list(&app);
            Ok(())
        },
        CatalogAction::Add { url, name } => add(&mut app, url, name).await,
        CatalogAction::Remove { id } => remove(&mut app, &id),
        CatalogAction::Refresh { id } => refresh(&mut app, id.as_deref()).await,
    }
}

fn list(app: &App) {
    let catalogs =
        std::iter::once(app.library.local_catalog()).chain(app.library.remote_catalogs());
    for catalog in catalogs {
        print_catalog(catalog);
    }
}

fn print_catalog(catalog: &SkillsCatalog) {
    let id = if catalog.is_local() {
        "local".to_string()
    } else {
        catalog.id().to_string()
    };
    println!(
        "  {:<24} {:<36} {} skill(s)",
        catalog.name(),
        id,
        catalog.skills().len()
    );
    if let Some(url) = catalog.url() {
        println!("      {url}");
    }
    if let Some(message) = catalog.error_message() {
        println!("      error: {message}");
    }
}

async fn add(app: &mut App, url: String, name: Option<String>) -> Result<()> {
    let Some(default_name) = default_catalog_name(&url) else {
        bail!("'{url}' is neither a GitHub repository nor an existing folder");
    };
    let entry = CatalogEntry::new(url.clone(), name.unwrap_or(default_name));
    if !app.registry.add(entry.clone()) {
        bail!("a catalog for '{url}' is already registered");
    }
    app.save_registry()?;
    tracing::info!(%url, id = %entry.id, "catalog added");

    let id = app.attach(entry);
    // The local catalog supplies installed state for the sync that follows.
    app.library.refresh_catalog(LOCAL_CATALOG_ID).await;
    app.library.refresh_catalog(id).await;
    if let Some(catalog) = app.library.catalog(id) {
        print_catalog(catalog);
    }
    Ok(())
}

fn remove(app: &mut App, selector: &str) -> Result<()> {
    let id = app.resolve_catalog(selector)?;
    if id == LOCAL_CATALOG_ID {
        bail!("the installed skills catalog cannot be removed");
    }
    let Some(entry) = app.registry.remove(id) else {
        bail!("'{selector}' comes from the config file; remove it from catalogs.folders there");
    };
    app.save_registry()?;
    app.library.remove_catalog(id);
    tracing::info!(id = %entry.id, name = %entry.name, "catalog removed");
    println!("Removed catalog '{}'", entry.name);
    Ok(())
}

async fn refresh(app: &mut App, selector: Option<&str>) -> Result<()> {
    let Some(selector) = selector else {
        app.library.load_all().await;
        list(app);
        return Ok(());
    };

    let id = app.resolve_catalog(selector)?;
    if id != LOCAL_CATALOG_ID {
        app.library.refresh_catalog(LOCAL_CATALOG_ID).await;
    }
    app.library.refresh_catalog(id).await;
    if let Some(catalog) = app.library.catalog(id) {
        print_catalog(catalog);
    }
    Ok(())
}

use std::collections::BTreeSet;

use {
    anyhow::{Context, Result, bail},
    clap::Subcommand,
    skillport_config::SkillportConfig,
    skillport_skills::{Library, Provider, Skill, SourceFilter},
};

use crate::app::App;

#[derive(Subcommand)]
pub enum SkillAction {
    /// List skills, installed and available.
    List {
        /// Only show one catalog: `local`, a catalog id or its name.
        #[arg(long)]
        catalog: Option<String>,
        /// Case-insensitive filter on name or description.
        #[arg(long)]
        search: Option<String>,
        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show one skill's details and documentation.
    Show {
        /// Skill key (`id`, or `path/id` for nested skills).
        key: String,
    },
    /// Install a skill for one or more providers.
    Install {
        key: String,
        /// Provider to install for (claude, codex). Repeatable.
        #[arg(long = "provider", short, required = true)]
        providers: Vec<Provider>,
        /// Catalog to install from; defaults to the first one listing the key.
        #[arg(long)]
        catalog: Option<String>,
    },
    /// Remove a skill from one provider.
    Uninstall {
        key: String,
        #[arg(long, short)]
        provider: Provider,
    },
    /// Edit a local skill's manifest fields.
    Edit {
        key: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        version: Option<String>,
    },
    /// Show provider directories and how many skills each has.
    Providers,
}

pub async fn handle_skills(action: SkillAction, config: SkillportConfig) -> Result<()> {
    let mut app = App::open(config)?;
    app.library.load_all().await;
    report_load_errors(&app.library);

    match action {
        SkillAction::List {
            catalog,
            search,
            json,
        } => list(&mut app, catalog.as_deref(), search, json),
        SkillAction::Show { key } => show(&app.library, &key),
        SkillAction::Install {
            key,
            providers,
            catalog,
        } => install(&mut app, &key, providers, catalog.as_deref()).await,
        SkillAction::Uninstall { key, provider } => {
            uninstall(&mut app.library, &key, provider).await
        },
        SkillAction::Edit {
            key,
            name,
            description,
            version,
        } => edit(&mut app.library, &key, name, description, version).await,
        SkillAction::Providers => {
            providers(&app);
            Ok(())
        },
    }
}

fn list(app: &mut App, catalog: Option<&str>, search: Option<String>, json: bool) -> Result<()> {
    if let Some(selector) = catalog {
        let id = app.resolve_catalog(selector)?;
        app.library.select_source(SourceFilter::Catalog(id));
    }
    if let Some(search) = search {
        app.library.set_search_text(search);
    }

    let skills = app.library.filtered_skills();
    if json {
        println!("{}", serde_json::to_string_pretty(&skills)?);
        return Ok(());
    }
    if skills.is_empty() {
        println!("No skills found.");
        return Ok(());
    }
    for skill in skills {
        println!(
            "  {:<32} {:<24} {}",
            skill.display_name(),
            installed_badge(skill),
            skill.description
        );
    }
    Ok(())
}

fn show(library: &Library, key: &str) -> Result<()> {
    let skill = find(library, key)?;
    println!("Name:        {}", skill.name);
    println!("Key:         {}", skill.unique_key());
    println!("Version:     {}", skill.version);
    if !skill.description.is_empty() {
        println!("Description: {}", skill.description);
    }
    println!("Source:      {}", skill.source.display_name());
    println!("Installed:   {}", installed_badge(skill));
    if let Some(dir) = &skill.directory {
        println!("Path:        {}", dir.display());
    }
    if !skill.content.is_empty() {
        println!("\n{}", skill.content);
    }
    Ok(())
}

async fn install(
    app: &mut App,
    key: &str,
    providers: Vec<Provider>,
    catalog: Option<&str>,
) -> Result<()> {
    let skill = match catalog {
        Some(selector) => {
            let id = app.resolve_catalog(selector)?;
            app.library
                .catalog(id)
                .and_then(|c| c.skill(key))
                .cloned()
                .with_context(|| format!("'{key}' is not listed in catalog '{selector}'"))?
        },
        None => find(&app.library, key)?.clone(),
    };
    let providers: BTreeSet<Provider> = providers.into_iter().collect();

    app.library.select_skill(Some(skill));
    if !app.library.install(&providers).await {
        bail!(failure(&app.library));
    }
    let installed = app
        .library
        .selected_skill()
        .map(installed_badge)
        .unwrap_or_default();
    println!("Installed '{key}' ({installed})");
    Ok(())
}

async fn uninstall(library: &mut Library, key: &str, provider: Provider) -> Result<()> {
    let skill = library
        .local_catalog()
        .skill(key)
        .cloned()
        .with_context(|| format!("'{key}' is not installed"))?;

    if !library.uninstall_skill(&skill, provider).await {
        bail!(failure(library));
    }
    match library.local_catalog().skill(key) {
        Some(remaining) => println!(
            "Removed '{key}' from {provider}; still installed for {}",
            installed_badge(remaining)
        ),
        None => println!("Removed '{key}' from {provider}"),
    }
    Ok(())
}

async fn edit(
    library: &mut Library,
    key: &str,
    name: Option<String>,
    description: Option<String>,
    version: Option<String>,
) -> Result<()> {
    let mut skill = library
        .local_catalog()
        .skill(key)
        .cloned()
        .with_context(|| format!("'{key}' is not installed"))?;
    if name.is_none() && description.is_none() && version.is_none() {
        bail!("nothing to change: pass --name, --description or --version");
    }
    if let Some(name) = name {
        skill.name = name;
    }
    if let Some(description) = description {
        skill.description = description;
    }
    if let Some(version) = version {
        skill.version = version;
    }

    if !library.save_skill(&skill).await {
        bail!(failure(library));
    }
    println!("Saved '{key}'");
    Ok(())
}

fn providers(app: &App) {
    let skills = app.library.local_catalog().skills();
    for provider in Provider::ALL {
        let count = skills.iter().filter(|s| s.is_installed_for(provider)).count();
        match app.roots.get(&provider) {
            Some(root) => println!(
                "  {:<12} {:<48} {count} skill(s)",
                provider.display_name(),
                root.display()
            ),
            None => println!("  {:<12} (no skills directory)", provider.display_name()),
        }
    }
}

/// Local copy first, then the first catalog listing the key.
fn find<'a>(library: &'a Library, key: &str) -> Result<&'a Skill> {
    library
        .local_catalog()
        .skill(key)
        .or_else(|| library.remote_catalogs().iter().find_map(|c| c.skill(key)))
        .with_context(|| format!("no skill with key '{key}'"))
}

fn installed_badge(skill: &Skill) -> String {
    if !skill.is_installed() {
        return "not installed".into();
    }
    skill
        .installed_providers
        .iter()
        .map(|p| p.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn failure(library: &Library) -> String {
    library
        .error_message()
        .unwrap_or("operation failed")
        .to_string()
}

fn report_load_errors(library: &Library) {
    let catalogs = std::iter::once(library.local_catalog()).chain(library.remote_catalogs());
    for catalog in catalogs {
        if let Some(message) = catalog.error_message() {
            eprintln!("warning: {}: {message}", catalog.name());
        }
    }
}

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;

use areg_editor::{build_editor_registry, CredentialManager, EditorsBackend};
use areg_registry::{Registry, RequestContext};
use areg_server::{Config, RegistryServer};
use areg_space::NamespaceResolver;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::AddEditor(args) => cmd_add_editor(&config, &args.name).await,
        Command::GenToken(args) => {
            let token = issue_token(&config, &args.name, args.max_age).await?;
            println!("{token}");
            Ok(())
        }
        Command::CheckConfig => cmd_check_config(&config),
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = Config::load(path)?;
    config
        .registry
        .validate()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(config)
}

async fn credentials(config: &Config) -> anyhow::Result<CredentialManager> {
    let editors = build_editor_registry(&config.registry.editors).await?;
    Ok(CredentialManager::new(editors))
}

async fn cmd_serve(mut config: Config, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    let registry = Registry::from_config(&config.registry).await?;
    registry
        .prepare_containers(&RequestContext::new(config.server.request_timeout))
        .await
        .context("cannot prepare stores")?;
    RegistryServer::new(config.server, Arc::new(registry))
        .serve()
        .await?;
    Ok(())
}

async fn cmd_add_editor(config: &Config, name: &str) -> anyhow::Result<()> {
    if config.registry.editors.kind == EditorsBackend::Memory {
        println!(
            "{} editors backend is in-memory; the secret is lost on exit",
            "warning:".yellow().bold()
        );
    }
    if create_editor(config, name).await? {
        println!("{} Rotated secret of editor {}", "✓".green().bold(), name.yellow());
        println!("  Tokens issued before now are no longer valid.");
    } else {
        println!("{} Created editor {}", "✓".green().bold(), name.yellow());
    }
    Ok(())
}

/// Create or rotate the secret of `name`. Returns whether it existed.
async fn create_editor(config: &Config, name: &str) -> anyhow::Result<bool> {
    let credentials = credentials(config).await?;
    let existed = credentials.registry().get_secret(name).await?.is_some();
    credentials.create_secret(name).await?;
    Ok(existed)
}

async fn issue_token(
    config: &Config,
    name: &str,
    max_age: Option<Duration>,
) -> anyhow::Result<String> {
    let credentials = credentials(config).await?;
    let token = credentials
        .issue_token(name, max_age)
        .await
        .with_context(|| format!("cannot issue a token for {name}"))?;
    Ok(token.encode())
}

fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    let registry = &config.registry;
    let resolver = NamespaceResolver::new(registry.namespace()?, registry.spaces.clone())?;
    let ns = resolver.namespace();
    println!("{} Configuration is valid", "✓".green().bold());
    println!("  Namespace: {}", ns.as_str().cyan());
    println!("  Listen: {}", config.server.bind_addr.to_string().bold());
    for space in &registry.spaces.spaces {
        println!("  Space {} → {}", space.yellow(), ns.db_name(space).dimmed());
    }
    for (name, def) in &registry.spaces.virtual_spaces {
        println!(
            "  Virtual space {} over {} → {}",
            name.yellow(),
            def.source.yellow(),
            ns.overwrite_db_name(name).dimmed()
        );
    }
    for (domain, space) in &registry.spaces.domain_space {
        let trusted = registry
            .spaces
            .trusted_domains
            .get(domain)
            .map(|editors| editors.join(", "))
            .unwrap_or_else(|| "-".into());
        println!("  Domain {} → {} (trusted: {})", domain.bold(), space.yellow(), trusted);
    }
    println!(
        "  Backends: storage={:?} documents={:?} cache={:?} editors={:?}",
        registry.storage.kind, registry.documents, registry.cache.kind, registry.editors.kind
    );
    Ok(())
}

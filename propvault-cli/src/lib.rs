//! Administrative commands for PropVault property stores.

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use propvault_crypto::MasterKey;
use propvault_store::{
    PropertyManager, PropertyMap, PropertyScope, PropertyServices, PropertyStore, ServerConfig,
    StoreResult,
};
use serde::Serialize;
use std::io::Write;
use tracing::info;

/// Environment variable holding the passphrase being rotated away from.
pub const PREVIOUS_MASTER_KEY_ENV: &str = "PROPVAULT_PREVIOUS_MASTER_KEY";

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report whether encrypted properties can be written
    Check,
    /// Set one property
    Set {
        #[command(flatten)]
        target: Target,
        /// Property name
        name: String,
        /// Property value (omit to store a null value)
        value: Option<String>,
    },
    /// Print one property
    Get {
        #[command(flatten)]
        target: Target,
        /// Property name
        name: String,
    },
    /// Print every property of a scope in insertion order
    Show {
        #[command(flatten)]
        target: Target,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List persisted scopes
    List {
        /// Only scopes of this category
        #[arg(long)]
        category: Option<String>,
        /// List plain-text scopes instead of encrypted ones
        #[arg(long)]
        plain: bool,
    },
    /// Delete one property, or the whole scope when no name is given
    Delete {
        #[command(flatten)]
        target: Target,
        /// Property name
        name: Option<String>,
    },
    /// Re-encrypt sets written under a previous master key
    Rekey {
        /// Environment variable holding the previous passphrase
        #[arg(long, default_value = PREVIOUS_MASTER_KEY_ENV)]
        previous_key_env: String,
    },
}

/// Scope selection shared by the per-scope commands.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Owning identity (tenant, container, user...)
    pub owner: String,
    /// Category name
    pub category: String,
    /// Use the plain-text store instead of the encrypted one
    #[arg(long)]
    pub plain: bool,
}

impl Target {
    fn scope(&self) -> PropertyScope {
        PropertyScope::new(&self.owner, &self.category)
    }
}

#[derive(Serialize)]
struct PropertyEntry<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

/// Runs one command against `services`, writing results to `out`.
///
/// `previous_key` resolves the passphrase for `rekey`; the binary reads it
/// from the environment.
pub fn run(
    command: &Command,
    config: &ServerConfig,
    services: &PropertyServices,
    previous_key: impl Fn(&str) -> Option<String>,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Check => {
            let store = services.encrypted.store();
            writeln!(out, "preferred encryption: {}", store.preferred_encryption())?;
            store
                .validate_configuration()
                .context("encrypted properties cannot be written")?;
            writeln!(out, "ok")?;
        }
        Command::Set {
            target,
            name,
            value,
        } => {
            with_manager(services, target.plain, |manager| {
                set_property(manager, &target.scope(), name, value.clone())
            })?;
            info!("set property {} in {}", name, target.scope());
        }
        Command::Get { target, name } => {
            let value = with_manager(services, target.plain, |manager| {
                let map = manager.get_properties(&target.scope())?;
                if !map.contains_key(name) {
                    bail!("property {} not found in {}", name, target.scope());
                }
                Ok(map.get(name).map(str::to_owned))
            })?;
            match value {
                Some(value) => writeln!(out, "{value}")?,
                None => writeln!(out, "(null)")?,
            }
        }
        Command::Show { target, json } => {
            let entries = with_manager(services, target.plain, |manager| {
                let map = manager.get_properties(&target.scope())?;
                Ok(map
                    .iter()
                    .map(|(name, value)| (name.to_owned(), value.map(str::to_owned)))
                    .collect::<Vec<_>>())
            })?;
            if *json {
                let entries: Vec<PropertyEntry<'_>> = entries
                    .iter()
                    .map(|(name, value)| PropertyEntry {
                        name,
                        value: value.as_deref(),
                    })
                    .collect();
                writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
            } else {
                for (name, value) in &entries {
                    writeln!(out, "{} = {}", name, value.as_deref().unwrap_or("(null)"))?;
                }
            }
        }
        Command::List { category, plain } => {
            let sets = if *plain {
                services.normal.list_scopes(category.as_deref())?
            } else {
                services.encrypted.list_scopes(category.as_deref())?
            };
            for info in sets {
                writeln!(out, "{}\t{}", info.scope, info.encryption)?;
            }
        }
        Command::Delete { target, name } => {
            let deleted = with_manager(services, target.plain, |manager| {
                delete(manager, &target.scope(), name.as_deref())
            })?;
            writeln!(out, "{}", if deleted { "deleted" } else { "nothing to delete" })?;
        }
        Command::Rekey { previous_key_env } => {
            let Some(previous) = previous_key(previous_key_env) else {
                bail!("{} is not set; it must hold the previous master key", previous_key_env);
            };
            let previous = MasterKey::with_params(&previous, (&config.encryption.kdf).into())
                .context("invalid previous master key")?;
            let rewritten = services.encrypted.rekey(&previous)?;
            writeln!(out, "re-encrypted {rewritten} property sets")?;
        }
    }
    Ok(())
}

/// Dispatches `f` to the plain or encrypted manager.
fn with_manager<T>(
    services: &PropertyServices,
    plain: bool,
    f: impl FnOnce(&dyn ManagerOps) -> Result<T>,
) -> Result<T> {
    if plain {
        f(&services.normal)
    } else {
        f(&services.encrypted)
    }
}

/// The subset of [`PropertyManager`] the per-scope commands need.
trait ManagerOps {
    fn get_properties(&self, scope: &PropertyScope) -> StoreResult<PropertyMap>;
    fn get_writable_properties(
        &self,
        scope: &PropertyScope,
        create: bool,
    ) -> StoreResult<Option<PropertyMap>>;
    fn save(&self, map: &mut PropertyMap) -> StoreResult<i64>;
    fn delete_properties(&self, scope: &PropertyScope) -> StoreResult<bool>;
}

impl<S: PropertyStore> ManagerOps for PropertyManager<S> {
    fn get_properties(&self, scope: &PropertyScope) -> StoreResult<PropertyMap> {
        PropertyManager::get_properties(self, scope)
    }

    fn get_writable_properties(
        &self,
        scope: &PropertyScope,
        create: bool,
    ) -> StoreResult<Option<PropertyMap>> {
        PropertyManager::get_writable_properties(self, scope, create)
    }

    fn save(&self, map: &mut PropertyMap) -> StoreResult<i64> {
        PropertyManager::save(self, map)
    }

    fn delete_properties(&self, scope: &PropertyScope) -> StoreResult<bool> {
        PropertyManager::delete_properties(self, scope)
    }
}

fn set_property(
    manager: &dyn ManagerOps,
    scope: &PropertyScope,
    name: &str,
    value: Option<String>,
) -> Result<()> {
    let mut map = manager
        .get_writable_properties(scope, true)?
        .context("property set could not be created")?;
    map.insert(name, value);
    manager.save(&mut map)?;
    Ok(())
}

fn delete(manager: &dyn ManagerOps, scope: &PropertyScope, name: Option<&str>) -> Result<bool> {
    let Some(name) = name else {
        return Ok(manager.delete_properties(scope)?);
    };
    let Some(mut map) = manager.get_writable_properties(scope, false)? else {
        return Ok(false);
    };
    if map.remove(name).is_none() {
        return Ok(false);
    }
    manager.save(&mut map)?;
    Ok(true)
}

/// Loads configuration from `path` (if given) and applies the environment
/// override; a missing path yields defaults.
pub fn load_config(path: Option<&std::path::Path>) -> Result<ServerConfig> {
    let config = match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => ServerConfig::default(),
    };
    Ok(config.apply_env())
}

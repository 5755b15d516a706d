use crate::config::types::Config;
use crate::config::validation::validate;
use crate::listing::SortOrder;
use crate::ConfigError;
use std::path::Path;

/// Values supplied on the command line that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_items: Option<u64>,
    pub page_size: Option<u32>,
    pub cursor: Option<String>,
    pub sort: Option<SortOrder>,
    pub output: Option<String>,
    pub overwrite: bool,
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use scratchpad_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Page size: {}", config.paging.page_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = read_config(path)?;
    validate(&config)?;
    Ok(config)
}

/// Builds the effective configuration from an optional file plus overrides
///
/// The file (or the built-in defaults when no file is given) is read first,
/// the overrides are layered on top, and only the merged result is validated.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => Config::default(),
    };

    apply_overrides(&mut config, overrides);
    validate(&config)?;

    Ok(config)
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, overrides: ConfigOverrides) {
    if let Some(max_items) = overrides.max_items {
        config.paging.max_items = Some(max_items);
    }
    if let Some(page_size) = overrides.page_size {
        config.paging.page_size = page_size;
    }
    if let Some(cursor) = overrides.cursor {
        config.paging.cursor = Some(cursor);
    }
    if let Some(sort) = overrides.sort {
        config.listing.sort = sort;
    }
    if let Some(output) = overrides.output {
        config.output.path = output_file_name(&output);
    }
    if overrides.overwrite {
        config.output.overwrite = true;
    }
}

/// Appends `.json` to a bare output name such as `programs`
pub fn output_file_name(name: &str) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{}.json", name)
    }
}

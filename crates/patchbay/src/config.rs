//! Config loading with CLI flag overrides.

use patchbay_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the layered config, then apply `--url` and `--layout`.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = patchbay_config::load(global.config.as_deref())?;
    apply_overrides(&mut config, global);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, global: &GlobalOpts) {
    if let Some(url) = &global.url {
        config.control_plane.url.clone_from(url);
    }
    if let Some(layout) = &global.layout {
        config.layout.path = Some(layout.clone());
    }
}

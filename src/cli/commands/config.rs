//! `promptpack config`

use anyhow::Result;

use crate::Config;

/// Print the effective configuration, one `key = value (source)` per line.
pub fn execute_config_command(config: &Config) -> Result<()> {
    let effective = config.effective_config();
    let mut keys: Vec<&String> = effective.keys().collect();
    keys.sort();

    for key in keys {
        let (value, source) = &effective[key];
        println!("{key} = {value} ({source})");
    }
    Ok(())
}

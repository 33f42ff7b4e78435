//! Print the effective tool settings

use crate::settings::ToolSettings;
use anyhow::Result;

pub fn show_settings(settings: &ToolSettings) -> Result<()> {
    print!("{}", settings.to_yaml()?);
    Ok(())
}

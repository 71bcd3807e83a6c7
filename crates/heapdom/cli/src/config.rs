// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use heapdom_core::AnalysisConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "HEAPDOM_CONFIG";

pub fn load_from_file(path: impl AsRef<Path>) -> Result<AnalysisConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AnalysisConfig = toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// `--config` wins over `$HEAPDOM_CONFIG`; without either the defaults apply
pub fn resolve_config(cli_config: Option<PathBuf>) -> Result<AnalysisConfig> {
    if let Some(path) = cli_config {
        load_from_file(path)
    } else if let Ok(path) = std::env::var(CONFIG_ENV) {
        load_from_file(path)
    } else {
        Ok(AnalysisConfig::default())
    }
}

/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

pub mod config;
pub mod logger;

use std::{path::PathBuf, sync::OnceLock};

use crate::config::LogConfig;

static LOGGER: OnceLock<logger::Logger> = OnceLock::new();

/// Initialize logging system using the default configuration file path "logging.yaml"
///
/// # Example
/// ```no_run
/// fn main() {
///     common_log::init().expect("Failed to initialize logger");
///     log::info!("Logger initialized");
/// }
/// ```
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_with_yaml("logging.yaml")
}

/// Initialize logging system
///
/// # Arguments
/// * `config_path` - Path to the logging configuration file
pub fn init_with_yaml(config_path: impl Into<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = LogConfig::from_yaml(config_path)?;
    init_with_config(config)
}

/// Initialize logging system with an in-code config
///
/// # Arguments
/// * `config` - LogConfig info
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let logger = logger::Logger::new_from_config(config)?;
    if LOGGER.set(logger).is_err() {
        return Err("Logger already initialized".into());
    }
    Ok(())
}

// Re-export log macros for convenient use in other modules
pub use log::{debug, error, info, trace, warn};

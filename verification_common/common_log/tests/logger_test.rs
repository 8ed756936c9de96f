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

use std::io::Write;

use serial_test::serial;

use common_log::config::{LogConfig, LoggerConfig};

#[test]
fn test_log_config_from_yaml() {
    let yaml = r#"
loggers:
  - path_prefix: root
    log_directory: logs
    log_file_name: verification-service.log
    max_file_size: 10480
    max_rolled_count: 6
    level: info
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = LogConfig::from_yaml(file.path()).unwrap();
    assert_eq!(config.loggers.len(), 1);
    let root = config.get_root_config().unwrap();
    assert_eq!(root.log_file_name, "verification-service.log");
    assert_eq!(root.level, "info");
}

#[test]
#[serial]
fn test_init_with_config_creates_log_file_and_rejects_reinit() {
    let dir = tempfile::tempdir().unwrap();
    let log_directory = dir.path().join("logs").to_str().unwrap().to_string();
    let config = LogConfig {
        loggers: vec![LoggerConfig {
            path_prefix: "root".to_string(),
            log_directory: log_directory.clone(),
            log_file_name: "test.log".to_string(),
            max_file_size: 10480,
            max_rolled_count: 2,
            level: "info".to_string(),
        }],
    };

    common_log::init_with_config(config).unwrap();
    log::info!("logger initialized");
    assert!(std::path::Path::new(&log_directory).join("test.log").exists());

    // The process logger is initialized at most once
    let again = LogConfig {
        loggers: vec![LoggerConfig {
            path_prefix: "root".to_string(),
            log_directory,
            log_file_name: "test.log".to_string(),
            max_file_size: 10480,
            max_rolled_count: 2,
            level: "info".to_string(),
        }],
    };
    assert!(common_log::init_with_config(again).is_err());
}

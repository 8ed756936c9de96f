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

use serde::{Deserialize, Serialize};

/// Job manager tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker tasks draining the verify channels
    pub verifier_workers: usize,
    /// Capacity of the internal dispatch queue decoupling submission from
    /// worker availability
    pub dispatch_buffer: usize,
    /// Capacity of each worker request channel
    pub channel_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { verifier_workers: 4, dispatch_buffer: 256, channel_buffer: 64 }
    }
}

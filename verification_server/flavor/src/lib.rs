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

//! Flavor model: signed good-known measurement policies and the templates
//! that derive their per-PCR rules.

pub mod error;
pub mod model;
pub mod signed;
pub mod template;

pub use error::FlavorError;
pub use model::{
    Bios, EventLogEquals, External, Flavor, FlavorDescription, FlavorMeta, FlavorPart, FlavorPcrs,
    Hardware, Software, SoftwareMeasurement,
};
pub use signed::SignedFlavor;
pub use template::{
    resolve_pcr_rules, EventLogEqualsTemplate, FlavorPartTemplate, FlavorTemplate, PcrEquals,
    PcrListRules, PcrTemplateRule,
};

// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use super::unknown_value::UnknownValue;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    pub library_name: String,
    pub library_version: String,
    pub family: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// A list of "key:value" tuples.
    pub tags: Vec<String>,
}

impl Metadata {
    pub fn new(
        library_name: String,
        library_version: String,
        family: String,
        tags: Vec<String>,
    ) -> Self {
        Self {
            library_name,
            library_version,
            family,
            tags,
        }
    }
}

impl UnknownValue for Metadata {
    fn unknown_value() -> Self {
        Self {
            library_name: "unknown".to_string(),
            library_version: "unknown".to_string(),
            family: "unknown".to_string(),
            tags: vec![],
        }
    }
}

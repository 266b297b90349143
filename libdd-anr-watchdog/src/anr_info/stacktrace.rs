// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use symbolic_common::Name;
use symbolic_demangle::{Demangle, DemangleOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StackTrace {
    pub format: String,
    pub frames: Vec<StackFrame>,
    pub incomplete: bool,
}

const FORMAT_STRING: &str = "Datadog ANR Watchdog 1.0";

impl StackTrace {
    pub fn empty() -> Self {
        Self {
            format: FORMAT_STRING.to_string(),
            frames: vec![],
            incomplete: false,
        }
    }

    pub fn from_frames(frames: Vec<StackFrame>, incomplete: bool) -> Self {
        Self {
            format: FORMAT_STRING.to_string(),
            frames,
            incomplete,
        }
    }

    /// A stack the capture primitive could not produce frames for.
    pub fn missing() -> Self {
        Self {
            format: FORMAT_STRING.to_string(),
            frames: vec![],
            incomplete: true,
        }
    }
}

impl StackTrace {
    pub fn set_complete(&mut self) -> anyhow::Result<()> {
        self.incomplete = false;
        Ok(())
    }

    pub fn push_frame(&mut self, frame: StackFrame, incomplete: bool) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.incomplete,
            "Can't push a new frame onto a complete stack"
        );
        self.frames.push(frame);
        self.incomplete = incomplete;
        Ok(())
    }

    pub fn demangle_names(&mut self) -> anyhow::Result<()> {
        let mut errors = 0;
        for frame in &mut self.frames {
            frame.demangle_name().unwrap_or_else(|e| {
                frame.comments.push(e.to_string());
                errors += 1;
            });
        }
        anyhow::ensure!(errors == 0);
        Ok(())
    }
}

impl Default for StackTrace {
    fn default() -> Self {
        Self::missing()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct StackFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    // Debug Info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mangled_name: Option<String>,

    // Additional Info
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl StackFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn demangle_name(&mut self) -> anyhow::Result<()> {
        if let Some(name) = self.function.take() {
            match Name::from(&name).demangle(DemangleOptions::name_only()) {
                Some(demangled) if demangled != name => {
                    self.mangled_name = Some(name);
                    self.function = Some(demangled.to_string());
                }
                _ => {
                    self.function = Some(name);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.function, &self.ip) {
            (Some(function), _) => {
                write!(f, "{function}")?;
                match (&self.file, self.line) {
                    (Some(file), Some(line)) => write!(f, " ({file}:{line})")?,
                    (Some(file), None) => write!(f, " ({file})")?,
                    _ => {}
                }
                Ok(())
            }
            (None, Some(ip)) => write!(f, "{ip}"),
            (None, None) => write!(f, "<unknown frame>"),
        }
    }
}

#[cfg(test)]
impl super::test_utils::TestInstance for StackTrace {
    fn test_instance(seed: u64) -> Self {
        let frames = (seed..seed + 4).map(StackFrame::test_instance).collect();
        Self::from_frames(frames, false)
    }
}

#[cfg(test)]
impl super::test_utils::TestInstance for StackFrame {
    fn test_instance(seed: u64) -> Self {
        Self {
            ip: Some(format!("{seed:#x}")),
            column: Some(2 * seed as u32),
            file: Some(format!("banana{seed}.rs")),
            function: Some(format!("Bar::baz{seed}")),
            line: Some((2 * seed + 1) as u32),
            mangled_name: Some(format!("_ZN3Bar3baz{seed}E")),
            comments: vec![],
        }
    }
}

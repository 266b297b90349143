// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Default Linux host primitives backed by procfs. Thread identity and state
//! come from `/proc/self/task/<tid>/{comm,stat}`; stacks stay empty because
//! walking another thread's user stack needs runtime cooperation this crate
//! does not assume. Hosts with richer runtimes install their own source.

use super::thread_source::{DebuggerProbe, ThreadSource};
use crate::anr_info::{StackTrace, ThreadData, ThreadState};
use anyhow::Context;
use std::fs;

pub struct ProcfsThreadSource;

impl ProcfsThreadSource {
    fn read_thread(&self, tid: u64) -> Option<ThreadData> {
        // The thread may exit between readdir and these reads; a vanished
        // thread is skipped, never an error.
        let name = fs::read_to_string(format!("/proc/self/task/{tid}/comm"))
            .ok()?
            .trim_end()
            .to_string();
        let state = fs::read_to_string(format!("/proc/self/task/{tid}/stat"))
            .ok()
            .and_then(|stat| parse_stat_state(&stat))
            .unwrap_or(ThreadState::Unknown);
        Some(ThreadData {
            id: tid,
            name,
            stack: StackTrace::missing(),
            state,
        })
    }
}

impl ThreadSource for ProcfsThreadSource {
    fn main_thread_id(&self) -> u64 {
        // On Linux the main thread's tid is the process id.
        // SAFETY: no preconditions.
        (unsafe { libc::getpid() }) as u64
    }

    fn enumerate(&self) -> anyhow::Result<Vec<ThreadData>> {
        let tasks = fs::read_dir("/proc/self/task").context("Failed to read /proc/self/task")?;
        let mut threads = Vec::new();
        for entry in tasks {
            let Ok(entry) = entry else { continue };
            let Some(tid) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };
            if let Some(thread) = self.read_thread(tid) {
                threads.push(thread);
            }
        }
        Ok(threads)
    }

    fn capture_thread(&self, thread_id: u64) -> Option<ThreadData> {
        self.read_thread(thread_id)
    }
}

/// Extracts the state field (third field, after the parenthesized comm, which
/// may itself contain spaces and parentheses) of a `/proc/.../stat` line.
fn parse_stat_state(stat: &str) -> Option<ThreadState> {
    let (_, after_comm) = stat.rsplit_once(')')?;
    let state = after_comm.split_whitespace().next()?;
    let state = match state.chars().next()? {
        'R' => ThreadState::Runnable,
        'S' => ThreadState::Sleeping,
        'D' => ThreadState::UninterruptibleWait,
        'T' | 't' => ThreadState::Stopped,
        'Z' => ThreadState::Zombie,
        'I' => ThreadState::Idle,
        _ => ThreadState::Unknown,
    };
    Some(state)
}

pub struct ProcfsDebuggerProbe;

impl DebuggerProbe for ProcfsDebuggerProbe {
    fn is_debugger_attached(&self) -> bool {
        fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| parse_tracer_pid(&status))
            .is_some_and(|tracer_pid| tracer_pid != 0)
    }
}

fn parse_tracer_pid(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|rest| rest.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_state() {
        let stat = "12345 (worker) S 1 12345 12345 0 -1 4194304 180 0 0 0 1 1 0 0 20 0 1 0";
        assert_eq!(parse_stat_state(stat), Some(ThreadState::Sleeping));

        // comm can contain spaces and a closing parenthesis
        let stat = "7 (weird) name)) R 1 7 7 0 -1";
        assert_eq!(parse_stat_state(stat), Some(ThreadState::Runnable));

        assert_eq!(parse_stat_state("garbage"), None);
    }

    #[test]
    fn test_parse_tracer_pid() {
        let status = "Name:\tfoo\nTracerPid:\t0\nUid:\t1000";
        assert_eq!(parse_tracer_pid(status), Some(0));
        let status = "Name:\tfoo\nTracerPid:\t4242\n";
        assert_eq!(parse_tracer_pid(status), Some(4242));
        assert_eq!(parse_tracer_pid("Name:\tfoo\n"), None);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_enumerate_surfaces_main_and_named_threads() {
        let source = ProcfsThreadSource;
        let main_id = source.main_thread_id();

        let handle = std::thread::Builder::new()
            .name("anr-probe".to_string())
            .spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(300));
            })
            .unwrap();

        let threads = source.enumerate().unwrap();
        assert!(threads.iter().any(|t| t.id == main_id));
        assert!(threads.iter().any(|t| t.name == "anr-probe"));

        let main = source.capture_thread(main_id).unwrap();
        assert_eq!(main.id, main_id);

        handle.join().unwrap();
    }
}

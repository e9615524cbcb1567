pub mod api;
pub mod cache;
pub mod config;
pub mod gateway;
pub mod ingest;
pub mod protocol;
pub mod registry;
pub mod storage;
pub mod targets;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a probe agent.
///
/// Agents start out `pending` after their first handshake and only become
/// `approved` through an administrator action. An approved agent that
/// reconnects from a different address drops to `hold` until re-approved.
/// `blacklisted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Pending,
    Approved,
    Hold,
    Blacklisted,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Pending => write!(f, "pending"),
            AgentStatus::Approved => write!(f, "approved"),
            AgentStatus::Hold => write!(f, "hold"),
            AgentStatus::Blacklisted => write!(f, "blacklisted"),
        }
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AgentStatus::Pending),
            "approved" => Ok(AgentStatus::Approved),
            "hold" => Ok(AgentStatus::Hold),
            "blacklisted" => Ok(AgentStatus::Blacklisted),
            other => Err(format!("unknown agent status: {other}")),
        }
    }
}

/// Outcome of a single connectivity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeResult {
    Ok,
    Fail,
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeResult::Ok => write!(f, "ok"),
            ProbeResult::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for ProbeResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(ProbeResult::Ok),
            "fail" => Ok(ProbeResult::Fail),
            other => Err(format!("unknown probe result: {other}")),
        }
    }
}

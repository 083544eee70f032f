use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Proxy,
    Jdbc,
}

impl FromStr for InstanceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "proxy" => Ok(Self::Proxy),
            "jdbc" => Ok(Self::Jdbc),
            _ => Err(CoreError::UnknownInstanceType(s.to_string())),
        }
    }
}

/// Immutable identity of a compute node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceDefinition {
    pub instance_type: InstanceType,
    pub instance_id: String,
}

impl InstanceDefinition {
    /// Proxy nodes are addressed as `ip@port`.
    pub fn proxy(ip: &str, port: u16) -> Self {
        Self { instance_type: InstanceType::Proxy, instance_id: format!("{}@{}", ip, port) }
    }

    /// Embedded (jdbc) nodes get a random id per process.
    pub fn jdbc() -> Self {
        Self { instance_type: InstanceType::Jdbc, instance_id: uuid::Uuid::new_v4().to_string() }
    }

    pub fn id(&self) -> &str { &self.instance_id }
}

/// Operational state of a compute node. Ordering is severity: `Ok < Lock < CircuitBreak`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateType {
    #[default]
    Ok,
    Lock,
    CircuitBreak,
}

impl StateType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Lock => "LOCK",
            Self::CircuitBreak => "CIRCUIT_BREAK",
        }
    }
}

impl FromStr for StateType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "OK" => Ok(Self::Ok),
            "LOCK" => Ok(Self::Lock),
            "CIRCUIT_BREAK" => Ok(Self::CircuitBreak),
            other => Err(CoreError::UnknownState(other.to_string())),
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order() {
        assert!(StateType::CircuitBreak > StateType::Lock);
        assert!(StateType::Lock > StateType::Ok);
        assert_eq!([StateType::Ok, StateType::CircuitBreak, StateType::Lock].into_iter().max(), Some(StateType::CircuitBreak));
    }

    #[test]
    fn state_strings() {
        assert_eq!("CIRCUIT_BREAK".parse::<StateType>(), Ok(StateType::CircuitBreak));
        assert!("circuit_break".parse::<StateType>().is_err());
        assert_eq!(StateType::Lock.to_string(), "LOCK");
    }

    #[test]
    fn proxy_id_is_ip_and_port() {
        let def = InstanceDefinition::proxy("127.0.0.1", 3307);
        assert_eq!(def.id(), "127.0.0.1@3307");
        assert_ne!(InstanceDefinition::jdbc().id(), InstanceDefinition::jdbc().id());
    }
}

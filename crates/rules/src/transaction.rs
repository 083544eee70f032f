use std::any::Any;
use std::str::FromStr;

use strata_core::{RuleConfiguration, TransactionRuleConfiguration};

use crate::{Rule, RuleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Local,
    Xa,
    Base,
}

impl FromStr for TransactionType {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(Self::Local),
            "XA" => Ok(Self::Xa),
            "BASE" => Ok(Self::Base),
            _ => Err(RuleError::UnknownAlgorithm { rule: "transaction", type_name: s.to_string() }),
        }
    }
}

#[derive(Debug)]
pub struct TransactionRule {
    default_type: TransactionType,
    config: TransactionRuleConfiguration,
}

impl TransactionRule {
    pub fn new(config: TransactionRuleConfiguration) -> Result<Self, RuleError> {
        let default_type = config.default_type.parse()?;
        if default_type != TransactionType::Local && config.provider_type.is_none() {
            return Err(RuleError::Invalid { rule: "transaction", message: format!("{} requires a provider type", config.default_type) });
        }
        Ok(Self { default_type, config })
    }

    pub fn default_type(&self) -> TransactionType { self.default_type }

    pub fn provider_type(&self) -> Option<&str> { self.config.provider_type.as_deref() }
}

impl Rule for TransactionRule {
    fn rule_type(&self) -> &'static str { "transaction" }

    fn as_any(&self) -> &dyn Any { self }

    fn configuration(&self) -> RuleConfiguration { RuleConfiguration::Transaction(self.config.clone()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xa_needs_provider() {
        let cfg = TransactionRuleConfiguration { default_type: "XA".into(), provider_type: None };
        assert!(TransactionRule::new(cfg).is_err());
        let cfg = TransactionRuleConfiguration { default_type: "xa".into(), provider_type: Some("Atomikos".into()) };
        assert_eq!(TransactionRule::new(cfg).unwrap().default_type(), TransactionType::Xa);
    }
}

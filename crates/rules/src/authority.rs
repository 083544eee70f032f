use std::any::Any;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use strata_core::{AlgorithmConfiguration, AuthorityRuleConfiguration, Grantee, RuleConfiguration, User};

use crate::{AuthorityCapability, Rule, RuleError};

const PROVIDERS: [&str; 2] = ["NATIVE", "ALL_PRIVILEGES_PERMITTED"];

/// Cluster users plus the schema names they may see. The user set is swapped in place
/// on authority changes; everything else requires a rebuild.
#[derive(Debug)]
pub struct AuthorityRule {
    users: RwLock<Vec<User>>,
    provider: AlgorithmConfiguration,
    schemas: RwLock<FxHashSet<String>>,
}

impl AuthorityRule {
    pub fn new<'a>(config: AuthorityRuleConfiguration, schema_names: impl IntoIterator<Item = &'a str>) -> Result<Self, RuleError> {
        if !PROVIDERS.contains(&config.provider.type_name.as_str()) {
            return Err(RuleError::UnknownAlgorithm { rule: "authority", type_name: config.provider.type_name });
        }
        Ok(Self {
            users: RwLock::new(config.users),
            provider: config.provider,
            schemas: RwLock::new(schema_names.into_iter().map(str::to_string).collect()),
        })
    }

    pub fn provider_type(&self) -> &str { &self.provider.type_name }

    /// Known user and known schema.
    pub fn is_schema_visible(&self, grantee: &Grantee, schema: &str) -> bool {
        self.find_user(grantee).is_some() && self.schemas.read().contains(schema)
    }
}

impl AuthorityCapability for AuthorityRule {
    fn find_user(&self, grantee: &Grantee) -> Option<User> {
        self.users.read().iter().find(|u| u.accepts(grantee)).cloned()
    }

    fn users(&self) -> Vec<User> { self.users.read().clone() }

    fn replace_users(&self, users: Vec<User>) {
        *self.users.write() = users;
    }

    fn refresh_schemas(&self, schema_names: &[String]) {
        *self.schemas.write() = schema_names.iter().cloned().collect();
    }
}

impl Rule for AuthorityRule {
    fn rule_type(&self) -> &'static str { "authority" }

    fn as_any(&self) -> &dyn Any { self }

    fn configuration(&self) -> RuleConfiguration {
        RuleConfiguration::Authority(AuthorityRuleConfiguration { users: self.users(), provider: self.provider.clone() })
    }

    fn as_authority(&self) -> Option<&dyn AuthorityCapability> { Some(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_users_in_place() {
        let cfg = AuthorityRuleConfiguration { users: Vec::new(), provider: AlgorithmConfiguration::new("ALL_PRIVILEGES_PERMITTED") };
        let rule = AuthorityRule::new(cfg, ["sharding_db"]).unwrap();
        let root = Grantee::new("root", "%");
        assert!(rule.find_user(&root).is_none());
        rule.replace_users(vec![User::new("root", "root", "%")]);
        assert_eq!(rule.find_user(&root).map(|u| u.password), Some("root".to_string()));
        assert!(rule.is_schema_visible(&root, "sharding_db"));
        assert!(!rule.is_schema_visible(&root, "missing_db"));
        rule.refresh_schemas(&["missing_db".to_string()]);
        assert!(rule.is_schema_visible(&root, "missing_db"));
        assert!(!rule.is_schema_visible(&root, "sharding_db"));
    }

    #[test]
    fn unknown_provider() {
        let cfg = AuthorityRuleConfiguration { users: Vec::new(), provider: AlgorithmConfiguration::new("LDAP") };
        assert!(matches!(AuthorityRule::new(cfg, std::iter::empty()), Err(RuleError::UnknownAlgorithm { .. })));
    }
}

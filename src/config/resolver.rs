//! Tiered configuration resolution.
//!
//! Any parametrized setting is resolved through an ordered fallback
//! chain: employee entry, then unit entry, then institution default,
//! then a hardcoded constant compiled into the engine. Resolution never
//! fails to produce a value; when all three data tiers are absent the
//! fallback constant is used and a warning is logged, so behavior
//! degrades safely instead of blocking payroll.

use tracing::warn;

use crate::calculation::{CalculationLogger, LogRecord};

use super::types::{ConfigTier, ConfigValue, EngineConfig, hardcoded_fallback};

/// A resolved configuration value together with the tier that answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    /// The resolved value.
    pub value: ConfigValue,
    /// The tier the value came from.
    pub tier: ConfigTier,
}

/// Resolves parametrized settings against an [`EngineConfig`] snapshot.
///
/// Every resolution appends one [`crate::calculation::CalculationLogEntry`]
/// recording which tier answered, so each figure in a payroll result is
/// traceable to the configuration tier that produced it.
///
/// # Example
///
/// ```
/// use folha_engine::calculation::CalculationLogger;
/// use folha_engine::config::{keys, ConfigResolver, ConfigTier, ConfigValue, EngineConfig,
///     InstitutionMetadata};
///
/// let config = EngineConfig {
///     institution: InstitutionMetadata {
///         code: "inst".into(), name: "Test".into(), version: "1".into(),
///     },
///     defaults: Default::default(),
///     unit_overrides: Default::default(),
///     employee_overrides: Default::default(),
///     leave_types: Default::default(),
///     non_business_days: vec![],
///     rubricas: vec![],
///     bracket_tables: Default::default(),
///     rounding: Default::default(),
/// };
/// let logger = CalculationLogger::new();
/// let resolver = ConfigResolver::new(&config, &logger);
///
/// let resolved = resolver.resolve(keys::DAILY_HOURS, "emp_001", "unit_hr");
/// assert_eq!(resolved.tier, ConfigTier::HardcodedFallback);
/// assert_eq!(resolved.value, ConfigValue::Integer(8));
/// assert_eq!(logger.all().len(), 1);
/// ```
pub struct ConfigResolver<'a> {
    config: &'a EngineConfig,
    logger: &'a CalculationLogger,
}

impl<'a> ConfigResolver<'a> {
    /// Creates a resolver over a configuration snapshot.
    pub fn new(config: &'a EngineConfig, logger: &'a CalculationLogger) -> Self {
        Self { config, logger }
    }

    /// Resolves `key` for an employee through the tier chain.
    ///
    /// Tries employee, unit, and institution-default entries in order;
    /// the first tier holding the key answers. If none does, the
    /// hardcoded constant answers and a warning is logged (not an
    /// error). Exactly one log entry is appended per call.
    pub fn resolve(&self, key: &str, employee_id: &str, unit_id: &str) -> ResolvedValue {
        let chain = [
            (ConfigTier::Employee, self.employee_entry(key, employee_id)),
            (ConfigTier::Unit, self.unit_entry(key, unit_id)),
            (ConfigTier::InstitutionDefault, self.default_entry(key)),
        ];

        for (tier, candidate) in chain {
            if let Some(value) = candidate {
                self.log_resolution(key, employee_id, unit_id, &value, tier);
                return ResolvedValue { value, tier };
            }
        }

        let value = hardcoded_fallback(key);
        warn!(
            key,
            employee_id,
            unit_id,
            "no configuration entry in any tier, using hardcoded fallback"
        );
        self.log_resolution(key, employee_id, unit_id, &value, ConfigTier::HardcodedFallback);
        ResolvedValue {
            value,
            tier: ConfigTier::HardcodedFallback,
        }
    }

    fn employee_entry(&self, key: &str, employee_id: &str) -> Option<ConfigValue> {
        self.config
            .employee_overrides
            .get(employee_id)
            .and_then(|entries| entries.get(key))
            .cloned()
    }

    fn unit_entry(&self, key: &str, unit_id: &str) -> Option<ConfigValue> {
        self.config
            .unit_overrides
            .get(unit_id)
            .and_then(|entries| entries.get(key))
            .cloned()
    }

    fn default_entry(&self, key: &str) -> Option<ConfigValue> {
        self.config.defaults.get(key).cloned()
    }

    fn log_resolution(
        &self,
        key: &str,
        employee_id: &str,
        unit_id: &str,
        value: &ConfigValue,
        tier: ConfigTier,
    ) {
        self.logger.log(LogRecord {
            employee_id: Some(employee_id.to_string()),
            key: key.to_string(),
            resolved_tier: Some(tier),
            inputs: serde_json::json!({ "unit_id": unit_id }),
            output: serde_json::json!({ "value": value, "tier": tier.to_string() }),
        });
    }
}

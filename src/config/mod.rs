//! Configuration snapshot and tiered resolution.
//!
//! This module contains the [`EngineConfig`] snapshot types, the YAML
//! [`ConfigLoader`], and the [`ConfigResolver`] implementing the
//! employee / unit / institution-default / hardcoded fallback chain.

mod loader;
mod resolver;
mod types;

pub use loader::ConfigLoader;
pub use resolver::{ConfigResolver, ResolvedValue};
pub use types::{
    ConfigTier, ConfigValue, EngineConfig, InstitutionMetadata, RubricaDefinition, RubricaFormula,
    TaxBase, TaxBracketRow, TaxBracketTable, hardcoded_fallback, keys,
};

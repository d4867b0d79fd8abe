//! The built-in registry: shared templates plus the language definitions.

pub mod common;
pub mod csharp;
pub mod python;

use crate::error::{GenerationError, TemplateDefinitionError};
use crate::model::Language;
use crate::registry::Registry;
use crate::template::TemplateSet;

/// Every built-in template, shared ones first so languages can compose from
/// them.
pub fn builtin_templates() -> Result<TemplateSet, TemplateDefinitionError> {
    let builder = common::define_templates(TemplateSet::builder());
    let builder = python::define_templates(builder);
    let builder = csharp::define_templates(builder);
    builder.build()
}

/// Built-in languages in registry order.
pub fn builtin_languages() -> Vec<Language> {
    vec![python::language(), csharp::language()]
}

pub fn builtin_registry() -> Result<Registry, GenerationError> {
    let templates = builtin_templates()?;
    Ok(Registry::new(builtin_languages(), templates)?)
}

//! Binds a serializable context to a template in a [`TemplateSet`].

use super::{TemplateId, TemplateSet};
use crate::error::{BindingError, RenderSite, describe_tera_error};
use serde::Serialize;
use tera::Context;

/// Stateless renderer over a borrowed template set.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    templates: &'a TemplateSet,
}

impl<'a> Renderer<'a> {
    pub fn new(templates: &'a TemplateSet) -> Self {
        Self { templates }
    }

    /// Render `template` against `context`.
    ///
    /// Fails if the template is unknown or references anything `context`
    /// does not define; output is never partially substituted.
    pub fn render<C: Serialize>(
        &self,
        template: &TemplateId,
        context: &C,
        site: RenderSite,
    ) -> Result<String, BindingError> {
        let binding_error = |message: String, site: RenderSite| BindingError {
            site,
            template: template.to_string(),
            message,
        };

        if !self.templates.contains(template) {
            return Err(binding_error("template is not defined".to_string(), site));
        }

        let value = serde_json::to_value(context)
            .map_err(|e| binding_error(e.to_string(), site.clone()))?;
        if let Some(field) = self.templates.unresolved(template, &value) {
            return Err(binding_error(
                format!("variable `{field}` is not defined in the render context"),
                site,
            ));
        }

        let context = Context::from_value(value)
            .map_err(|e| binding_error(describe_tera_error(&e), site.clone()))?;

        let output = self
            .templates
            .render(template, &context)
            .map_err(|e| binding_error(describe_tera_error(&e), site.clone()))?;

        tracing::trace!(
            template = %template,
            site = %site,
            bytes = output.len(),
            "rendered template"
        );
        Ok(output)
    }
}

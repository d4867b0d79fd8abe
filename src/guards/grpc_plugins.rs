//! G3: gRPC Plugins Guard
//!
//! A grpc rule must name the plugins that produce both message and service
//! stubs; one with no plugins at all cannot generate anything.

use crate::error::RegistryError;
use crate::guards::{Guard, GuardContext, GuardResult};
use crate::model::RuleKind;

pub struct GrpcPluginsGuard;

impl Guard for GrpcPluginsGuard {
    fn name(&self) -> &str {
        "G3: gRPC Plugins"
    }

    fn description(&self) -> &str {
        "Checks every grpc rule declares at least one plugin"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> GuardResult {
        let violations: Vec<_> = ctx
            .languages
            .iter()
            .flat_map(|language| {
                language
                    .rules
                    .iter()
                    .filter(|rule| rule.kind == RuleKind::Grpc && rule.plugins.is_empty())
                    .map(|rule| RegistryError::GrpcRuleWithoutPlugins {
                        language: language.name.clone(),
                        rule: rule.name.clone(),
                    })
            })
            .collect();

        GuardResult::from_violations(
            self.name(),
            violations,
            "all grpc rules declare plugins",
            "Add the protobuf and gRPC plugins to the rule's plugin list",
        )
    }
}

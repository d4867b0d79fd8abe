//! Static field references of a parsed template.
//!
//! Tera fails on an undefined variable in `{{ ... }}` and in a `for`
//! container, but an `if` condition, a test, or a `default` filter quietly
//! turns a missing field into false or empty. Every identifier in every
//! expression is therefore collected once at definition time and checked
//! against the render context before Tera sees it.
//!
//! Loop variables are followed into their container: inside
//! `{% for rule in rules %}`, `rule.doc` is checked against every element of
//! `rules`.

use serde_json::Value;
use tera::ast::{Expr, ExprVal, Node};

/// Names Tera defines itself while rendering.
const BUILTIN_ROOTS: &[&str] = &["loop", "__tera_context"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Step {
    Field(String),
    /// Every element of an array, or every value of a map
    Each,
}

/// One identifier a template reads from its context.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FieldRef {
    steps: Vec<Step>,
    text: String,
}

impl FieldRef {
    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether `context` defines this field.
    pub(crate) fn resolves(&self, context: &Value) -> bool {
        resolves(context, &self.steps)
    }
}

fn resolves(value: &Value, steps: &[Step]) -> bool {
    match steps.split_first() {
        None => true,
        Some((Step::Field(name), rest)) => {
            let child = match value {
                Value::Object(map) => map.get(name),
                Value::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            child.is_some_and(|child| resolves(child, rest))
        }
        Some((Step::Each, rest)) => match value {
            Value::Array(items) => items.iter().all(|item| resolves(item, rest)),
            Value::Object(map) => map.values().all(|item| resolves(item, rest)),
            // Iterating a string or null yields nothing addressable.
            _ => true,
        },
    }
}

/// A name bound by the template itself; `None` when its shape is unknown.
type Local = (String, Option<Vec<Step>>);

/// Every context field `nodes` reads, deduplicated and sorted.
pub(crate) fn collect(nodes: &[Node]) -> Vec<FieldRef> {
    let mut refs = Vec::new();
    let mut locals = Vec::new();
    collect_nodes(nodes, &mut locals, &mut refs);
    refs.sort();
    refs.dedup();
    refs
}

fn collect_nodes(nodes: &[Node], locals: &mut Vec<Local>, refs: &mut Vec<FieldRef>) {
    for node in nodes {
        match node {
            Node::VariableBlock(_, expr) => collect_expr(expr, locals, refs),
            Node::Set(_, set) => {
                collect_expr(&set.value, locals, refs);
                let local = (set.key.clone(), None);
                if set.global {
                    locals.insert(0, local);
                } else {
                    locals.push(local);
                }
            }
            Node::FilterSection(_, section, _) => {
                for arg in section.filter.args.values() {
                    collect_expr(arg, locals, refs);
                }
                collect_nodes(&section.body, locals, refs);
            }
            Node::Block(_, block, _) => collect_nodes(&block.body, locals, refs),
            Node::Forloop(_, forloop, _) => {
                collect_expr(&forloop.container, locals, refs);
                let element = if forloop.container.filters.is_empty() {
                    match &forloop.container.val {
                        ExprVal::Ident(ident) => steps_of(ident, locals).map(|mut steps| {
                            steps.push(Step::Each);
                            steps
                        }),
                        _ => None,
                    }
                } else {
                    None
                };

                let scope = locals.len();
                if let Some(key) = &forloop.key {
                    locals.push((key.clone(), None));
                }
                locals.push((forloop.value.clone(), element));
                collect_nodes(&forloop.body, locals, refs);
                locals.truncate(scope);

                if let Some(empty_body) = &forloop.empty_body {
                    collect_nodes(empty_body, locals, refs);
                }
            }
            Node::If(branches, _) => {
                for (_, condition, body) in &branches.conditions {
                    collect_expr(condition, locals, refs);
                    collect_nodes(body, locals, refs);
                }
                if let Some((_, body)) = &branches.otherwise {
                    collect_nodes(body, locals, refs);
                }
            }
            _ => {}
        }
    }
}

fn collect_expr(expr: &Expr, locals: &[Local], refs: &mut Vec<FieldRef>) {
    for filter in &expr.filters {
        for arg in filter.args.values() {
            collect_expr(arg, locals, refs);
        }
    }

    match &expr.val {
        ExprVal::Ident(ident) => push_ident(ident, locals, refs),
        ExprVal::Math(math) => {
            collect_expr(&math.lhs, locals, refs);
            collect_expr(&math.rhs, locals, refs);
        }
        ExprVal::Logic(logic) => {
            collect_expr(&logic.lhs, locals, refs);
            collect_expr(&logic.rhs, locals, refs);
        }
        ExprVal::In(within) => {
            collect_expr(&within.lhs, locals, refs);
            collect_expr(&within.rhs, locals, refs);
        }
        ExprVal::Test(test) => {
            push_ident(&test.ident, locals, refs);
            for arg in &test.args {
                collect_expr(arg, locals, refs);
            }
        }
        ExprVal::FunctionCall(call) => {
            for arg in call.args.values() {
                collect_expr(arg, locals, refs);
            }
        }
        ExprVal::MacroCall(call) => {
            for arg in call.args.values() {
                collect_expr(arg, locals, refs);
            }
        }
        ExprVal::Array(items) => {
            for item in items {
                collect_expr(item, locals, refs);
            }
        }
        ExprVal::StringConcat(concat) => {
            for value in &concat.values {
                if let ExprVal::Ident(ident) = value {
                    push_ident(ident, locals, refs);
                }
            }
        }
        ExprVal::String(_) | ExprVal::Int(_) | ExprVal::Float(_) | ExprVal::Bool(_) => {}
    }
}

fn push_ident(ident: &str, locals: &[Local], refs: &mut Vec<FieldRef>) {
    if let Some(steps) = steps_of(ident, locals) {
        refs.push(FieldRef {
            steps,
            text: ident.to_string(),
        });
    }
}

/// Context path of `ident`, or `None` when it cannot be checked statically.
///
/// Only the dotted prefix is followed; a subscript (`a[b]`) ends the path.
fn steps_of(ident: &str, locals: &[Local]) -> Option<Vec<Step>> {
    let dotted = ident.split('[').next().unwrap_or(ident);
    let mut segments = dotted.split('.').filter(|s| !s.is_empty());
    let root = segments.next()?;

    if BUILTIN_ROOTS.contains(&root) {
        return None;
    }

    let mut steps = match locals.iter().rev().find(|(name, _)| name == root) {
        Some((_, Some(bound))) => bound.clone(),
        Some((_, None)) => return None,
        None => vec![Step::Field(root.to_string())],
    };
    steps.extend(segments.map(|s| Step::Field(s.to_string())));
    Some(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tera::Tera;

    fn refs(source: &str) -> Vec<FieldRef> {
        let mut tera = Tera::default();
        tera.add_raw_template("t", source).unwrap();
        collect(&tera.get_template("t").unwrap().ast)
    }

    fn names(source: &str) -> Vec<String> {
        let mut names: Vec<_> = refs(source).iter().map(|r| r.as_str().to_string()).collect();
        names.dedup();
        names
    }

    #[test]
    fn test_collects_conditions_tests_and_filters() {
        assert_eq!(
            names(
                "{% if rule.experimental %}x{% elif lang.dir is defined %}y{% endif %}\
                 {{ rule.base | default(value=lang.name) }}"
            ),
            vec!["lang.dir", "lang.name", "rule.base", "rule.experimental"]
        );
    }

    #[test]
    fn test_loop_variables_follow_their_container() {
        let found = refs("{% for r in rules %}{% if r.experimental %}x{% endif %}{% endfor %}");
        let ok = json!({"rules": [{"experimental": true}, {"experimental": false}]});
        let typo = json!({"rules": [{"experimental": true}, {"experimentl": false}]});
        let empty = json!({"rules": []});

        assert!(found.iter().all(|r| r.resolves(&ok)));
        assert!(!found.iter().all(|r| r.resolves(&typo)));
        assert!(found.iter().all(|r| r.resolves(&empty)));
    }

    #[test]
    fn test_map_loop_checks_values() {
        let found = refs("{% for k, v in env %}{% if v.set %}{{ k }}{% endif %}{% endfor %}");
        assert!(found.iter().all(|r| r.resolves(&json!({"env": {"A": {"set": 1}}}))));
        assert!(!found.iter().all(|r| r.resolves(&json!({"env": {"A": {}}}))));
    }

    #[test]
    fn test_builtins_and_set_locals_are_skipped() {
        assert_eq!(
            names("{% set x = lang.name %}{% for r in rules %}{{ loop.index }}{% if x %}{% endif %}{% endfor %}"),
            vec!["lang.name", "rules"]
        );
    }

    #[test]
    fn test_null_field_is_defined() {
        let found = refs("{% if notes %}{{ notes }}{% endif %}");
        assert!(found.iter().all(|r| r.resolves(&json!({"notes": null}))));
        assert!(!found.iter().all(|r| r.resolves(&json!({}))));
    }
}

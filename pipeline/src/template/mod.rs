//! Prompt construction.
//!
//! Rendering runs two passes over a template:
//!
//! 1. Conditional regions `{{#name}}...{{/name}}` are kept or dropped by the
//!    predicate registered under `name`. Regions do not nest; unknown names
//!    and regions without a closing marker are left verbatim.
//! 2. Placeholders `{{name}}` are replaced left to right in a single pass.
//!    Substituted values are never re-scanned and unknown placeholders stay
//!    as they are.

pub mod predicates;
pub mod prompts;
pub mod slides;

use kit_core::{Level, TrainingParameters, topic_label};
use serde::Serialize;
use std::collections::HashMap;

pub use predicates::PredicateRegistry;
pub use slides::{SlideDistribution, SlideRules};

/// Fully resolved prompt parameters. Derived per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    pub topic: String,
    pub topic_label: String,
    pub level: Level,
    pub duration: u32,
    pub industry: String,
    pub slides: SlideDistribution,
    pub depth_instruction: &'static str
}

impl PromptContext {
    pub fn parameters(&self) -> TrainingParameters {
        TrainingParameters {
            topic: self.topic.clone(),
            level: self.level,
            duration: self.duration,
            industry: self.industry.clone()
        }
    }

    fn variables(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("topic", self.topic_label.clone()),
            ("topic_value", self.topic.clone()),
            ("level", self.level.to_string()),
            ("duration", self.duration.to_string()),
            ("industry", self.industry.clone()),
            ("total_slides", self.slides.total.to_string()),
            ("opening_slides", self.slides.opening.to_string()),
            ("core_slides", self.slides.core.to_string()),
            ("closing_slides", self.slides.closing.to_string()),
            ("depth_instruction", self.depth_instruction.to_string())
        ])
    }
}

#[derive(Debug, Clone)]
pub struct TemplateEngine {
    rules: SlideRules,
    predicates: PredicateRegistry,
    presentation_template: String,
    guide_template: String
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self {
            rules: SlideRules::default(),
            predicates: PredicateRegistry::with_builtins(),
            presentation_template: prompts::PRESENTATION_TEMPLATE.to_string(),
            guide_template: prompts::INSTRUCTOR_GUIDE_TEMPLATE.to_string()
        }
    }

    pub fn with_rules(mut self, rules: SlideRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_predicates(mut self, predicates: PredicateRegistry) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn with_templates(mut self, presentation: impl Into<String>, guide: impl Into<String>) -> Self {
        self.presentation_template = presentation.into();
        self.guide_template = guide.into();
        self
    }

    pub fn context(&self, parameters: &TrainingParameters) -> PromptContext {
        PromptContext {
            topic: parameters.topic.clone(),
            topic_label: topic_label(&parameters.topic).to_string(),
            level: parameters.level,
            duration: parameters.duration,
            industry: parameters.industry.clone(),
            slides: self.rules.distribute(parameters.duration),
            depth_instruction: prompts::depth_instruction(parameters.duration)
        }
    }

    /// Slide deck prompt for `parameters`.
    pub fn build(&self, parameters: &TrainingParameters) -> String {
        self.render_presentation(&self.context(parameters))
    }

    pub fn render_presentation(&self, context: &PromptContext) -> String {
        self.render(&self.presentation_template, context, context.variables())
    }

    /// Instructor guide prompt embedding the generated slide deck.
    pub fn build_guide(&self, context: &PromptContext, slides_content: &str) -> String {
        let mut variables = context.variables();
        variables.insert("slides_content", slides_content.to_string());
        self.render(&self.guide_template, context, variables)
    }

    fn render(
        &self,
        template: &str,
        context: &PromptContext,
        variables: HashMap<&'static str, String>
    ) -> String {
        let parameters = context.parameters();
        let resolved =
            resolve_conditionals(template, |name| self.predicates.evaluate(name, &parameters));
        substitute(&resolved, |name| variables.get(name).cloned())
    }
}

/// Keeps or drops `{{#name}}...{{/name}}` regions according to `decide`.
/// `None` from `decide` leaves the region untouched.
pub fn resolve_conditionals(template: &str, decide: impl Fn(&str) -> Option<bool>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{#") {
        out.push_str(&rest[..start]);
        let marker = &rest[start..];

        let Some(name_len) = marker[3..].find("}}") else {
            out.push_str(marker);
            return out;
        };
        let name = &marker[3..3 + name_len];
        let body_start = 3 + name_len + 2;
        let body = &marker[body_start..];
        let closing = format!("{{{{/{name}}}}}");

        let decision = if is_name(name) { decide(name) } else { None };
        match (decision, body.find(&closing)) {
            (Some(keep), Some(body_len)) => {
                if keep {
                    out.push_str(&body[..body_len]);
                }
                rest = &body[body_len + closing.len()..];
            }
            _ => {
                out.push_str(&marker[..body_start]);
                rest = body;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Replaces `{{name}}` with `lookup(name)` in one pass. A brace that does
/// not open a valid placeholder is kept and scanning resumes one character
/// later, so `{{{name}}}` becomes `{value}`.
pub fn substitute(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find("}}") {
            Some(len) if is_name(&after[..len]) => {
                let name = &after[..len];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after[len + 2..];
            }
            _ => {
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_name(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

use minijinja::{Environment, UndefinedBehavior};
use serde_json::Value;

use crate::error::Result;

/// Renders `{{name}}` / `{{a.b}}` style templates against a JSON context.
/// Missing values render as empty text; output is not HTML-escaped.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // attribute lookups on a missing value stay undefined instead of failing
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        TemplateEngine { env }
    }

    pub fn render(&self, template: &str, context: &Value) -> Result<String> {
        let ctx = minijinja::Value::from_serialize(context);
        Ok(self.env.render_str(template, ctx)?)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot render with a fresh engine.
pub fn render(template: &str, context: &Value) -> Result<String> {
    TemplateEngine::new().render(template, context)
}

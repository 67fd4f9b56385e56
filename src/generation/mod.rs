//! Generation stages parameterized by prompt template
//!
//! Each stage binds a fixed instruction template and invokes a text
//! generator. Missing upstream inputs are substituted with stable placeholder
//! text before rendering, so a prompt never contains a null or empty slot.

pub mod prompts;

pub use prompts::{ROOT_CAUSE_PROMPT, SOLUTION_PROMPT, SYNTHESIS_PROMPT, WEB_AGENT_PROMPT};

use crate::errors::{PipelineError, Result};
use crate::llm::TextGenerator;
use std::collections::HashMap;

/// Placeholder for a missing root-cause analysis
pub const PLACEHOLDER_ROOT_CAUSE: &str = "No root cause analysis available.";
/// Placeholder for a missing knowledge-base solution
pub const PLACEHOLDER_SOLUTION: &str = "No solution found in internal knowledge base.";
/// Placeholder for missing web findings
pub const PLACEHOLDER_WEB: &str = "No relevant information found via web search.";

/// Substitute a placeholder when an upstream value is absent or blank
pub fn or_placeholder(value: Option<&str>, placeholder: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => placeholder.to_string(),
    }
}

/// Named text bindings for template rendering
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    bindings: HashMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &'static str, value: impl Into<String>) -> &mut Self {
        self.bindings.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(|s| s.as_str())
    }
}

/// A fixed instruction template with named `{slot}` variables
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub system: &'static str,
    pub body: &'static str,
    pub variables: &'static [&'static str],
}

impl PromptTemplate {
    /// Render the full prompt (system instruction + body) with all slots
    /// substituted
    ///
    /// Substitution is a single pass over the body, so slot values are never
    /// re-scanned for further slots. Every declared variable must be bound.
    pub fn render(&self, vars: &TemplateVars) -> Result<String> {
        for name in self.variables {
            if vars.get(name).is_none() {
                return Err(PipelineError::TemplateError(format!(
                    "template '{}' missing binding for '{}'",
                    self.name, name
                )));
            }
        }

        let mut rendered = String::with_capacity(self.body.len());
        let mut rest = self.body;

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                PipelineError::TemplateError(format!(
                    "template '{}' has an unterminated slot",
                    self.name
                ))
            })?;
            let slot = &after[..close];
            let value = vars.get(slot).ok_or_else(|| {
                PipelineError::TemplateError(format!(
                    "template '{}' references undeclared slot '{}'",
                    self.name, slot
                ))
            })?;
            rendered.push_str(value);
            rest = &after[close + 1..];
        }
        rendered.push_str(rest);

        if self.system.is_empty() {
            Ok(rendered)
        } else {
            Ok(format!("{}\n\n{}", self.system, rendered))
        }
    }
}

/// One generation stage: a template bound to a text generator call
pub struct GenerationStage {
    template: PromptTemplate,
}

impl GenerationStage {
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    pub fn name(&self) -> &'static str {
        self.template.name
    }

    /// Render the template and invoke the generator once
    pub async fn generate(
        &self,
        generator: &dyn TextGenerator,
        vars: &TemplateVars,
    ) -> Result<String> {
        let prompt = self.template.render(vars)?;
        generator.complete(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
    }

    impl EchoGenerator {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("generated".to_string())
        }
    }

    const SIMPLE: PromptTemplate = PromptTemplate {
        name: "simple",
        system: "System line.",
        body: "Context: {context}\nQuestion: {question}",
        variables: &["context", "question"],
    };

    #[test]
    fn test_render_substitutes_slots() {
        let mut vars = TemplateVars::new();
        vars.bind("context", "the context").bind("question", "the question");

        let rendered = SIMPLE.render(&vars).unwrap();
        assert_eq!(
            rendered,
            "System line.\n\nContext: the context\nQuestion: the question"
        );
    }

    #[test]
    fn test_render_missing_binding_errors() {
        let mut vars = TemplateVars::new();
        vars.bind("context", "only context");

        let err = SIMPLE.render(&vars).unwrap_err();
        assert!(err.to_string().contains("question"));
    }

    #[test]
    fn test_slot_values_not_rescanned() {
        let mut vars = TemplateVars::new();
        vars.bind("context", "{question}").bind("question", "real question");

        let rendered = SIMPLE.render(&vars).unwrap();
        // The value "{question}" is inserted literally, not substituted again
        assert!(rendered.contains("Context: {question}"));
        assert!(rendered.contains("Question: real question"));
    }

    #[test]
    fn test_or_placeholder() {
        assert_eq!(
            or_placeholder(None, PLACEHOLDER_ROOT_CAUSE),
            PLACEHOLDER_ROOT_CAUSE
        );
        assert_eq!(or_placeholder(Some("   "), PLACEHOLDER_WEB), PLACEHOLDER_WEB);
        assert_eq!(or_placeholder(Some("value"), PLACEHOLDER_WEB), "value");
    }

    #[tokio::test]
    async fn test_stage_generates_with_rendered_prompt() {
        let generator = EchoGenerator::new();
        let stage = GenerationStage::new(SIMPLE);

        let mut vars = TemplateVars::new();
        vars.bind("context", "ctx").bind("question", "q");

        let output = stage.generate(&generator, &vars).await.unwrap();
        assert_eq!(output, "generated");

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Context: ctx"));
    }
}

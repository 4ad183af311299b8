//! A one-call façade over the pipeline.

use miette::SourceSpan;

use crate::diagnostic::Severity;
use crate::document::Document;
use crate::specs;
use crate::unit::Unit;

/// A failed render, carrying the offending source for reporting.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
    #[source_code]
    source_code: String,
    #[label]
    location: SourceSpan,
}

/// Drives documents through the whole pipeline with the default language.
#[derive(Debug)]
pub struct Engine {
    unit: Unit,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            unit: Unit::new(specs::default_spec()),
        }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut Unit {
        &mut self.unit
    }

    /// Register a document without processing it, so later renders can
    /// `#include` it once it is processed.
    pub fn load(&mut self, document: Document) -> bool {
        self.unit.initialize(document)
    }

    /// Run all five actions over `document` and return the rendered
    /// output.
    pub fn process(&mut self, document: Document) -> Result<String, RenderError> {
        let name = document.name().to_string();
        let source = document.read().to_string();
        let ok = self.unit.initialize(document)
            && self.unit.parse(&name)
            && self.unit.analyze(&name)
            && self.unit.compile(&name)
            && self.unit.execute(&name);

        if !ok {
            return Err(self.error(&name, source));
        }
        Ok(self
            .unit
            .environment()
            .get(&name)
            .and_then(|compilation| compilation.output())
            .unwrap_or_default()
            .to_string())
    }

    /// Render an in-memory template.
    pub fn render(
        &mut self,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<String, RenderError> {
        let name = name.into();
        self.process(Document::pseudo(name, content.into()))
    }

    /// The recorded diagnostics, one per line.
    pub fn diagnostics(&self) -> String {
        self.unit.diagnostic()
    }

    fn error(&self, name: &str, source: String) -> RenderError {
        let diagnostic = self
            .unit
            .environment()
            .diagnostics()
            .iter()
            .rev()
            .find(|d| d.severity == Severity::Error && d.document == name)
            .or_else(|| self.unit.environment().diagnostics().last());

        match diagnostic {
            Some(diagnostic) => {
                let start = diagnostic
                    .reference
                    .map(|r| r.position() as usize)
                    .unwrap_or(0)
                    .min(source.len());
                let length = diagnostic
                    .reference
                    .map(|r| r.length() as usize)
                    .unwrap_or(0)
                    .min(source.len() - start);
                RenderError {
                    message: diagnostic.message.clone(),
                    source_code: source,
                    location: SourceSpan::new(start.into(), length),
                }
            }
            None => RenderError {
                message: "the pipeline failed without a diagnostic".to_string(),
                source_code: source,
                location: SourceSpan::new(0.into(), 0),
            },
        }
    }
}

use super::display::format_segments;
use super::theme::Theme;
use crate::orchestrator::Orchestrator;
use crate::render::to_html;
use crate::tools::{Tool, ToolError, explain, generate, refactor};
use crate::trace::{SessionTrace, TraceEvent};
use anyhow::{Result, anyhow};
use std::io::Write;
use std::path::Path;
use tokio::io::AsyncReadExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExplainFormat {
    Terminal,
    Html,
}

/// Shared context for the one-shot tool commands.
pub(crate) struct ToolRunner<'a> {
    orchestrator: &'a Orchestrator,
    theme: Theme,
    trace: Option<SessionTrace>,
}

impl<'a> ToolRunner<'a> {
    pub(crate) fn new(
        orchestrator: &'a Orchestrator,
        theme: Theme,
        trace: Option<SessionTrace>,
    ) -> Self {
        Self {
            orchestrator,
            theme,
            trace,
        }
    }

    pub(crate) async fn explain<W: Write>(
        &self,
        code: &str,
        format: ExplainFormat,
        out: &mut W,
    ) -> Result<()> {
        self.trace_input(Tool::Explain, code);
        let explanation = explain::explain(self.orchestrator, code)
            .await
            .map_err(|err| self.fail(err))?;
        self.trace_output(Tool::Explain, &explanation.text);

        match format {
            ExplainFormat::Terminal => {
                write!(out, "{}", format_segments(&self.theme, &explanation.segments))?
            }
            ExplainFormat::Html => writeln!(out, "{}", to_html(&explanation.segments))?,
        }
        Ok(())
    }

    pub(crate) async fn refactor<W: Write>(
        &self,
        code: &str,
        instruction: &str,
        out: &mut W,
    ) -> Result<()> {
        self.trace_input(Tool::Refactor, &refactor::build_prompt(code, instruction));
        let code = refactor::refactor(self.orchestrator, code, instruction)
            .await
            .map_err(|err| self.fail(err))?;
        self.trace_output(Tool::Refactor, &code);
        writeln!(out, "{code}")?;
        Ok(())
    }

    pub(crate) async fn generate<W: Write>(&self, prompt: &str, out: &mut W) -> Result<()> {
        self.trace_input(Tool::Generate, prompt);
        let code = generate::generate(self.orchestrator, prompt)
            .await
            .map_err(|err| self.fail(err))?;
        self.trace_output(Tool::Generate, &code);
        writeln!(out, "{code}")?;
        Ok(())
    }

    fn trace_input(&self, tool: Tool, text: &str) {
        if let Some(trace) = &self.trace {
            trace.record(TraceEvent::ToolInput { tool, text });
        }
    }

    fn trace_output(&self, tool: Tool, text: &str) {
        if let Some(trace) = &self.trace {
            trace.record(TraceEvent::ToolOutput { tool, text });
        }
    }

    fn fail(&self, err: ToolError) -> anyhow::Error {
        if let Some(trace) = &self.trace {
            trace.record(TraceEvent::Failure {
                text: &err.to_string(),
            });
        }
        anyhow!(err)
    }
}

/// Reads the tool input from `file`, or from stdin when no file is given.
pub(crate) async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|err| anyhow!("Failed to read {}: {err}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .map_err(|err| anyhow!("Failed to read stdin: {err}"))?;
            Ok(text)
        }
    }
}

use query::PipelineEvent;

/// Turns pipeline events into terminal text. Query details only show in verbose mode.
pub struct Renderer {
    pub verbose: bool,
    stage: Option<&'static str>,
}

impl Renderer {
    pub fn new(verbose: bool) -> Self {
        Self { verbose, stage: None }
    }

    pub fn reset(&mut self) {
        self.stage = None;
    }

    fn enter(&mut self, stage: &'static str) -> bool {
        let entered = self.stage != Some(stage);
        self.stage = Some(stage);
        entered
    }

    pub fn render(&mut self, event: &PipelineEvent) -> String {
        let mut out = String::new();

        match event {
            PipelineEvent::Info(message) => {
                out.push_str(&format!("\n[info] {}\n", message));
            }
            PipelineEvent::Cypher(content) => {
                let entered = self.enter("cypher");
                if self.verbose && entered {
                    out.push_str("Translating to Cypher...\n");
                }
                if self.verbose && !content.starts_with("Translating") {
                    out.push_str(&format!("  {}\n", content));
                }
            }
            PipelineEvent::Retrieval(content) => {
                let entered = self.enter("retrieval");
                if self.verbose && entered {
                    out.push_str("Searching knowledge graph...\n");
                }
                if self.verbose && content.starts_with("Found") {
                    out.push_str(&format!("  {}\n", content));
                }
            }
            PipelineEvent::Generation(chunk) => {
                if self.enter("generation") {
                    out.push_str("\nAnswer: ");
                }
                out.push_str(chunk);
            }
            PipelineEvent::Error(message) => {
                self.stage = Some("error");
                out.push_str(&format!("\n[error] {}\n", message));
            }
            PipelineEvent::Done(summary) => {
                self.stage = Some("done");
                out.push_str("\n\n");
                if self.verbose {
                    if !summary.sources.is_empty() {
                        out.push_str(&format!("Sources: {}\n", summary.sources.join(", ")));
                    }
                    out.push_str(&format!("Confidence: {:.0}%\n", summary.confidence * 100.0));
                    out.push_str(&format!("Cypher Query: {}\n", summary.cypher));
                }
            }
        }

        out
    }
}

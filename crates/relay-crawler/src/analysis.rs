//! LLM prompts and output handling for template analysis.

/// Outcome of the legitimacy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Legitimate,
    Rejected,
}

impl Verdict {
    /// Only an exact `GOOD` (after trimming) counts as legitimate.
    pub fn parse(output: &str) -> Self {
        if output.trim() == "GOOD" {
            Verdict::Legitimate
        } else {
            Verdict::Rejected
        }
    }
}

/// Prompt asking whether a template is a real workflow or test/spam.
pub fn legitimacy_prompt(info: &str) -> String {
    format!(
        "You are an expert in n8n workflows. Analyze the following workflow JSON and determine \
         if it's a legitimate workflow or a test/spam one.\n\
         Output only GOOD if it's a legitimate workflow, or BAD if it's a test/spam workflow.\n\n\
         Workflow JSON:\n{info}\n\n\
         Output (GOOD/BAD):"
    )
}

/// Prompts for the three catalog summaries, in storage order:
/// what the workflow accomplishes, its nodes and connections, and
/// suggested variations.
pub fn summary_prompts(info: &str) -> [String; 3] {
    [
        format!("Summarize what the following n8n workflow is accomplishing:\n{info}\nSummary:"),
        format!(
            "Summarize all the nodes used in the following n8n workflow and how they are \
             connected:\n{info}\nSummary:"
        ),
        format!(
            "Based on the following n8n workflow, suggest similar workflows that could be made \
             using this as an example.\n\
             Consider different services but similar setups, and ways the workflow could be \
             expanded:\n{info}\nSuggestions:"
        ),
    ]
}

/// `<n8n-demo>` embed snippet for a workflow graph. Single quotes are
/// backslash-escaped since the attribute is single-quoted.
pub fn demo_snippet(workflow_json: &str) -> String {
    format!(
        "<n8n-demo workflow='{}'></n8n-demo>",
        workflow_json.replace('\'', "\\'")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_requires_exact_good() {
        assert_eq!(Verdict::parse("GOOD"), Verdict::Legitimate);
        assert_eq!(Verdict::parse("  GOOD\n"), Verdict::Legitimate);
        assert_eq!(Verdict::parse("BAD"), Verdict::Rejected);
        assert_eq!(Verdict::parse("good"), Verdict::Rejected);
        assert_eq!(Verdict::parse("GOOD."), Verdict::Rejected);
        assert_eq!(Verdict::parse("The workflow is GOOD"), Verdict::Rejected);
        assert_eq!(Verdict::parse(""), Verdict::Rejected);
    }

    #[test]
    fn test_legitimacy_prompt_embeds_info() {
        let prompt = legitimacy_prompt("Name: \"x\"");
        assert!(prompt.contains("Workflow JSON:\nName: \"x\""));
        assert!(prompt.contains("Output only GOOD"));
        assert!(prompt.ends_with("Output (GOOD/BAD):"));
    }

    #[test]
    fn test_summary_prompts_order() {
        let prompts = summary_prompts("INFO");
        assert!(prompts[0].starts_with("Summarize what"));
        assert!(prompts[1].contains("nodes"));
        assert!(prompts[2].ends_with("Suggestions:"));
        assert!(prompts.iter().all(|p| p.contains("INFO")));
    }

    #[test]
    fn test_demo_snippet_escapes_single_quotes() {
        let snippet = demo_snippet(r#"{"name":"Bob's flow"}"#);
        assert_eq!(
            snippet,
            r#"<n8n-demo workflow='{"name":"Bob\'s flow"}'></n8n-demo>"#
        );
    }
}

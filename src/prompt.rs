//! Prompt assembly for the three completion-service call sites. Templates
//! are registered once and rendered with explicit contexts.

use anyhow::Context as _;
use tera::Tera;

/// System role for the synthetic input generator.
pub const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a synthetic data generator. You output \
example queries based on the specific parameters (subdomains) that are given for the scenario. \
Aim to be as faithful and characteristic as possible to the parameters.";

/// System role for converting free-text taxonomy specifications to JSON.
pub const TAXONOMY_SYSTEM_PROMPT: &str = r#"You will be converting specifications for a Language Model Program (LMP) into a structured JSON format. The specifications will be provided in a specific format, and your task is to organize this information into a JSON structure with predefined categories.

Follow these steps to convert the specifications into JSON:

1. Parse the input specifications, identifying the following sections:
    - Dimensions (numbered)
    - Subdimensions (bulleted under each dimension)
    - Decision Logic (for each dimension)
    - Objective (for each dimension)
    - Summary (at the end)
2. Create a JSON structure with the following top-level keys:
    - "dimensions": An array of dimension objects
    - "summary": A string containing the summary
3. For each dimension, create an object with the following structure:
{
  "name": "Dimension name",
  "subdimensions": ["subdimension1", "subdimension2", ...],
  "decision_logic": "Decision logic text",
  "objective": "Objective text"
}"#;

/// Fallback judge prompt when a project has not set one.
pub const DEFAULT_JUDGE_PROMPT: &str = "You are an evaluator for an unknown model with \
advanced capabilities to judge whether the output produced is good or not.";

/// Placeholder judged in place of a missing model output.
pub const NO_OUTPUT_SENTINEL: &str = "No output produced.";

const SYNTHESIS_TEMPLATE: &str = r#"Here's the JSON input describing the dimensions and their subdimensions you will generate an input for:
<json_input>
{{ json_context }}
</json_input>

Interpret this JSON input as follows:
1. The "dimensions" array contains objects representing different aspects of a scenario that you should use as context to inform your input generation.
2. Each dimension has a "name", "subdimensions" array, and "decision_logic" that acts as context for your input generation.
3. The "summary" provides an overview of the scenario and the context of these dimensions - this should provide context about what your synthetic generation will do.

Now, consider the following specific subdimensions that will define your output:
<subdimensions>{{ scenario }}</subdimensions>

Your task is to create a synthetic input example based on these above subdimensions. The prompt should:
1. Generate a theoretical example synthetic input that is characterised well by the subdimensions.
2. Ensure this is around a paragraph or several hundred characters.
3. Tailor the input to the subdimensions with characteristic detail (differentiated from the other subdimensions)."#;

const JUDGE_TEMPLATE: &str = r#"{{ judge_prompt }}

Respond with a single JSON object carrying a "critique" field (string) and an "outcome" field ("good" or "bad"). Worked examples calibrating the format:

<examples>
<example>
<input>Customer asks why their invoice total changed after switching currencies mid-cycle.</input>
<model_output>The total changed because exchange rates are applied at billing time, not at purchase time. I can walk through the conversion line by line if that helps.</model_output>
<verdict>{"critique": "Identifies the actual cause and offers a concrete next step.", "outcome": "good"}</verdict>
</example>
<example>
<input>User reports that exported reports are missing the final row of data.</input>
<model_output>Reports are generated nightly and reflect the latest data.</model_output>
<verdict>{"critique": "Ignores the reported missing-row defect entirely.", "outcome": "bad"}</verdict>
</example>
</examples>

Now judge the following case.

<input>{{ input }}</input>
<model_output>{{ model_output }}</model_output>

Respond with the JSON verdict object only."#;

const OPTIMIZE_TEMPLATE: &str = r#"You are an AI prompt optimization expert.
Based on the following evaluation data, suggest improvements to the judge prompt so that decisions it makes are more accurate and aligned with expert judgments.

Current judge prompt:
{{ judge_prompt }}

Data samples where the expert either provided a critique, an improved output, or disagreed with the judge:
{{ samples }}

Please analyze the cases where:
1. Expert provided critique (expert_critique_text)
2. Judge and expert disagreed on pass/fail (judge_pass != expert_pass)
3. Improved outputs were provided by a human domain expert.

Suggest specific improvements to the judge prompt to better align with expert judgments.
Start by thinking step by step in <thinking> tags then output the improved prompt in <prompt> tags."#;

const TAXONOMY_USER_TEMPLATE: &str = "{{ taxonomy }}\n\nPlease convert these specifications into a JSON structure following the format described above.";

pub struct PromptSet {
    tera: Tera,
}

impl PromptSet {
    pub fn new() -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template("synthesis", SYNTHESIS_TEMPLATE)
            .context("register synthesis template")?;
        tera.add_raw_template("judge", JUDGE_TEMPLATE)
            .context("register judge template")?;
        tera.add_raw_template("optimize", OPTIMIZE_TEMPLATE)
            .context("register optimize template")?;
        tera.add_raw_template("taxonomy_user", TAXONOMY_USER_TEMPLATE)
            .context("register taxonomy template")?;
        Ok(Self { tera })
    }

    /// Generation prompt: objective-stripped taxonomy as background plus the
    /// scenario string as the binding constraint.
    pub fn synthesis_prompt(
        &self,
        json_context: &serde_json::Value,
        scenario: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = tera::Context::new();
        ctx.insert("json_context", &serde_json::to_string_pretty(json_context)?);
        ctx.insert("scenario", scenario);
        self.tera
            .render("synthesis", &ctx)
            .context("render synthesis prompt")
    }

    /// Judge prompt: the project's prompt followed by the fixed instructional
    /// suffix and the case under judgment.
    pub fn judge_prompt(
        &self,
        judge_prompt: &str,
        input: &str,
        model_output: Option<&str>,
    ) -> anyhow::Result<String> {
        let mut ctx = tera::Context::new();
        ctx.insert("judge_prompt", judge_prompt);
        ctx.insert("input", input);
        ctx.insert("model_output", model_output.unwrap_or(NO_OUTPUT_SENTINEL));
        self.tera.render("judge", &ctx).context("render judge prompt")
    }

    pub fn optimizer_prompt(&self, judge_prompt: &str, samples: &str) -> anyhow::Result<String> {
        let mut ctx = tera::Context::new();
        ctx.insert("judge_prompt", judge_prompt);
        ctx.insert("samples", samples);
        self.tera
            .render("optimize", &ctx)
            .context("render optimizer prompt")
    }

    pub fn taxonomy_user_prompt(&self, taxonomy: &str) -> anyhow::Result<String> {
        let mut ctx = tera::Context::new();
        ctx.insert("taxonomy", taxonomy);
        self.tera
            .render("taxonomy_user", &ctx)
            .context("render taxonomy prompt")
    }
}

//! LLM prompts for classification and entity extraction

use intake_domain::Taxonomy;

/// System prompt for classification calls
pub const CLASSIFICATION_SYSTEM_PROMPT: &str = "You are an expert in email classification.";

/// System prompt for entity extraction calls
pub const ENTITY_SYSTEM_PROMPT: &str = "Extract structured data from unstructured text.";

/// Builds the classification prompt
pub struct ClassificationPrompt<'a> {
    text: &'a str,
    taxonomy: &'a Taxonomy,
    multiple_requests: bool,
}

impl<'a> ClassificationPrompt<'a> {
    /// Create a new prompt builder
    pub fn new(text: &'a str, taxonomy: &'a Taxonomy) -> Self {
        Self {
            text,
            taxonomy,
            multiple_requests: true,
        }
    }

    /// Whether to tell the model a document may hold several requests
    pub fn with_multiple_requests(mut self, multiple_requests: bool) -> Self {
        self.multiple_requests = multiple_requests;
        self
    }

    /// Build the complete prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str("Classify the following email into a request type and sub request type.\n\n");

        prompt.push_str("Email:\n");
        prompt.push_str("---\n");
        prompt.push_str(self.text);
        prompt.push_str("\n---\n\n");

        prompt.push_str("Allowed request types and their sub request types:\n");
        prompt.push_str(&self.taxonomy.to_json_pretty());
        prompt.push_str("\n\n");

        prompt.push_str(CLASSIFICATION_RULES);
        if self.multiple_requests {
            prompt.push('\n');
            prompt.push_str(MULTIPLE_REQUESTS_RULE);
        }
        prompt.push_str("\n\n");
        prompt.push_str(CLASSIFICATION_OUTPUT_FORMAT);

        prompt
    }
}

/// Builds the entity extraction prompt
pub struct EntityPrompt<'a> {
    text: &'a str,
}

impl<'a> EntityPrompt<'a> {
    /// Create a new prompt builder
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// Build the complete prompt
    pub fn build(&self) -> String {
        format!(
            "Extract key fields from the following email, such as deal name, amount, \
             currency, dates and account details.\n\nEmail:\n---\n{}\n---\n\n{}",
            self.text, ENTITY_OUTPUT_FORMAT
        )
    }
}

const CLASSIFICATION_RULES: &str = r#"Rules:
- Choose request_type and sub_request_type only from the list above
- If you are unsure of the sub request type, use "Unknown"
- confidence_score is your confidence between 0 and 1
- If confidence_score is below 0.85, use request_type "Others""#;

const MULTIPLE_REQUESTS_RULE: &str = "- An email may contain several requests; if so, return a JSON array with one object per request";

const CLASSIFICATION_OUTPUT_FORMAT: &str = r#"Output format (JSON only, no additional text):
{
  "request_type": "...",
  "sub_request_type": "...",
  "confidence_score": 0.0
}"#;

const ENTITY_OUTPUT_FORMAT: &str =
    "Return output as a JSON object with auto-detected field names and values. JSON only, no additional text.";

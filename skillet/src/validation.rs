//! Recipe JSON validation pipeline.
//!
//! Model responses that are supposed to contain recipe JSON go through a fixed
//! sequence of checks: cheap textual checks first (bracket shape, markdown
//! fences, conversational lead-ins), then a full JSON parse, then a structural
//! check of the first recipe object. The pipeline short-circuits on the first
//! failure and reports how far the content got via an ordered checkpoint map,
//! so dashboards can distinguish "model wrapped the array in prose" from
//! "model produced broken JSON".
//!
//! The validator itself is a pure function over the input text: it performs no
//! I/O and holds no shared state. Forwarding the resulting
//! [`ValidationOutcome`] to the telemetry backend is the caller's job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Instant;

use crate::config::ValidationConfig;

/// Required keys on the first recipe object, in reporting order.
pub const REQUIRED_RECIPE_FIELDS: [&str; 6] = ["name", "prepTime", "cookTime", "totalTime", "ingredients", "steps"];

/// Conversational lead-ins models like to prepend to JSON output.
///
/// Checked as anchored prefixes in this order; the first match wins and is the
/// phrase reported back to the caller. More specific phrases come before their
/// prefixes ("Here's" before "Here", "I'll" before "I") so the report names
/// the longest matching lead-in.
pub const DEFAULT_INTRO_PHRASES: [&str; 11] = [
    "Here's", "I'll", "Let me", "Here are", "The recipes", "Based on", "Here is", "I've", "I have", "Here", "I",
];

/// Coarse error category for a failed validation, used as the key of the
/// aggregated error histogram and as the `error_type` field on telemetry
/// events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ErrorKind {
    /// Textual pre-checks failed (bracket shape, markdown fence, intro text)
    #[serde(rename = "FormatError")]
    Format,
    /// Content is not valid JSON
    #[serde(rename = "ParseError")]
    Parse,
    /// Valid JSON with the wrong shape or missing recipe fields
    #[serde(rename = "StructureError")]
    Structure,
    /// Numeric field outside its accepted bounds (trace logging only)
    #[serde(rename = "RangeError")]
    Range,
}

impl ErrorKind {
    /// Reference set of categories a consuming dashboard should always show,
    /// even when a batch produced no errors of that kind.
    pub const KNOWN: [ErrorKind; 4] = [ErrorKind::Format, ErrorKind::Parse, ErrorKind::Structure, ErrorKind::Range];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Format => "FormatError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Structure => "StructureError",
            ErrorKind::Range => "RangeError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed check, carrying enough detail to reproduce the failure in
/// a client-facing message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Response must be a JSON array (starts with [ and ends with ])")]
    NotAnArray,

    #[error("Invalid response format: Response contains markdown code block")]
    MarkdownFence,

    #[error("Invalid response format: Response contains introductory text (begins with {phrase:?})")]
    IntroText { phrase: String },

    /// Carries the underlying parser's position so the client sees where the
    /// JSON broke.
    #[error("Invalid JSON format: {message}")]
    Parse { line: usize, column: usize, message: String },

    #[error("Response array cannot be empty")]
    EmptyArray,

    #[error("First recipe must be a JSON object")]
    FirstNotObject,

    #[error("Missing required fields in recipe: {}", missing.join(", "))]
    MissingFields { missing: Vec<String> },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::NotAnArray | ValidationError::MarkdownFence | ValidationError::IntroText { .. } => ErrorKind::Format,
            ValidationError::Parse { .. } => ErrorKind::Parse,
            ValidationError::EmptyArray | ValidationError::FirstNotObject | ValidationError::MissingFields { .. } => {
                ErrorKind::Structure
            }
        }
    }
}

/// The five validation stages, in execution order.
///
/// `Ord` follows execution order, which is what [`StageProgress`] relies on to
/// answer "did this stage pass".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    ArrayFormat,
    MarkdownRemoved,
    IntroTextRemoved,
    JsonParsed,
    StructureValidated,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::ArrayFormat,
        Stage::MarkdownRemoved,
        Stage::IntroTextRemoved,
        Stage::JsonParsed,
        Stage::StructureValidated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ArrayFormat => "array_format",
            Stage::MarkdownRemoved => "markdown_removed",
            Stage::IntroTextRemoved => "intro_text_removed",
            Stage::JsonParsed => "json_parsed",
            Stage::StructureValidated => "structure_validated",
        }
    }
}

/// Linear progression through the validation stages.
///
/// Holds the last stage that passed (or none). A stage can only be marked
/// passed if every earlier stage already passed, so skipped checkpoints are
/// unrepresentable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageProgress(Option<Stage>);

impl StageProgress {
    /// Mark `stage` as passed. Stages must be advanced in declaration order.
    pub fn advance(&mut self, stage: Stage) {
        let expected = match self.0 {
            None => 0,
            Some(last) => last as usize + 1,
        };
        debug_assert_eq!(stage as usize, expected, "validation stages must pass in order");
        self.0 = Some(stage);
    }

    pub fn passed(&self, stage: Stage) -> bool {
        self.0.is_some_and(|last| stage <= last)
    }

    pub fn checkpoints(&self) -> CheckpointMap {
        CheckpointMap {
            array_format: self.passed(Stage::ArrayFormat),
            markdown_removed: self.passed(Stage::MarkdownRemoved),
            intro_text_removed: self.passed(Stage::IntroTextRemoved),
            json_parsed: self.passed(Stage::JsonParsed),
            structure_validated: self.passed(Stage::StructureValidated),
        }
    }
}

/// Named boolean checkpoints in stage order.
///
/// Serialized as an object whose keys appear in execution order, which is the
/// shape the dashboard's per-step bar chart expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckpointMap {
    pub array_format: bool,
    pub markdown_removed: bool,
    pub intro_text_removed: bool,
    pub json_parsed: bool,
    pub structure_validated: bool,
}

impl CheckpointMap {
    pub fn get(&self, stage: Stage) -> bool {
        match stage {
            Stage::ArrayFormat => self.array_format,
            Stage::MarkdownRemoved => self.markdown_removed,
            Stage::IntroTextRemoved => self.intro_text_removed,
            Stage::JsonParsed => self.json_parsed,
            Stage::StructureValidated => self.structure_validated,
        }
    }
}

/// Result of one validation call. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub success: bool,
    #[serde(rename = "validation_steps")]
    pub steps: CheckpointMap,
    #[serde(rename = "validation_duration_ms")]
    pub duration_ms: u64,
    pub content_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_count: Option<usize>,
    #[serde(rename = "error_type", skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub session_id: String,
    pub trace_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Runs the validation pipeline.
///
/// The intro-phrase list is configuration data so tests (and deployments
/// chasing a new model's verbal tics) can substitute their own.
#[derive(Debug, Clone)]
pub struct Validator {
    intro_phrases: Vec<String>,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            intro_phrases: DEFAULT_INTRO_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Validator {
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            intro_phrases: config.intro_phrases.clone(),
        }
    }

    pub fn with_intro_phrases(intro_phrases: Vec<String>) -> Self {
        Self { intro_phrases }
    }

    /// Validate candidate recipe JSON, producing an outcome with per-stage
    /// checkpoints. Never fails: a bad candidate yields `success: false` with
    /// the error category and message recorded on the outcome.
    pub fn validate(&self, content: &str, session_id: &str, trace_id: &str) -> ValidationOutcome {
        let started = Instant::now();
        let content = normalize_json(content.trim());
        let mut progress = StageProgress::default();

        let result = self.run_checks(&content, &mut progress);
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(recipe_count) => ValidationOutcome {
                success: true,
                steps: progress.checkpoints(),
                duration_ms,
                content_length: content.len(),
                recipe_count: Some(recipe_count),
                error_kind: None,
                error_message: None,
                session_id: session_id.to_string(),
                trace_id: trace_id.to_string(),
                timestamp: Utc::now(),
            },
            Err(error) => {
                tracing::debug!(stage = ?progress, %error, "recipe validation failed");
                ValidationOutcome {
                    success: false,
                    steps: progress.checkpoints(),
                    duration_ms,
                    content_length: content.len(),
                    recipe_count: None,
                    error_kind: Some(error.kind()),
                    error_message: Some(error.to_string()),
                    session_id: session_id.to_string(),
                    trace_id: trace_id.to_string(),
                    timestamp: Utc::now(),
                }
            }
        }
    }

    /// The ordered check sequence. Returns the recipe count on full success.
    fn run_checks(&self, content: &str, progress: &mut StageProgress) -> Result<usize, ValidationError> {
        if !content.starts_with('[') || !content.ends_with(']') {
            return Err(ValidationError::NotAnArray);
        }
        progress.advance(Stage::ArrayFormat);

        if contains_markdown_fence(content) {
            return Err(ValidationError::MarkdownFence);
        }
        progress.advance(Stage::MarkdownRemoved);

        if let Some(phrase) = self.intro_phrases.iter().find(|p| content.starts_with(p.as_str())) {
            return Err(ValidationError::IntroText { phrase: phrase.clone() });
        }
        progress.advance(Stage::IntroTextRemoved);

        let data: Value = serde_json::from_str(content).map_err(|e| ValidationError::Parse {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })?;
        progress.advance(Stage::JsonParsed);

        let recipes = data.as_array().ok_or(ValidationError::NotAnArray)?;
        if recipes.is_empty() {
            return Err(ValidationError::EmptyArray);
        }
        let first = recipes[0].as_object().ok_or(ValidationError::FirstNotObject)?;
        // Missing keys are reported in the order of the required-field list,
        // not the order found in the candidate.
        let missing: Vec<String> = REQUIRED_RECIPE_FIELDS
            .iter()
            .filter(|field| !first.contains_key(**field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields { missing });
        }
        progress.advance(Stage::StructureValidated);

        Ok(recipes.len())
    }
}

/// Re-serialize parseable JSON with stable 2-space indentation so logged
/// artifacts have a canonical shape. Unparseable content is passed through
/// unchanged; failing to normalize is not itself a validation failure.
pub fn normalize_json(content: &str) -> String {
    match serde_json::from_str::<Value>(content) {
        Ok(data) => serde_json::to_string_pretty(&data).unwrap_or_else(|_| content.to_string()),
        Err(_) => content.to_string(),
    }
}

/// A fenced code-block marker: three backticks followed by an optional
/// alphanumeric language tag and a newline.
fn contains_markdown_fence(content: &str) -> bool {
    let mut rest = content;
    while let Some(idx) = rest.find("```") {
        let after = &rest[idx + 3..];
        match after.find('\n') {
            Some(nl) if after[..nl].chars().all(|c| c.is_ascii_alphanumeric()) => return true,
            _ => rest = &rest[idx + 3..],
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::default()
    }

    fn validate(content: &str) -> ValidationOutcome {
        validator().validate(content, "session-1", "trace-1")
    }

    const VALID_RECIPE: &str =
        r#"[{"name":"Soup","prepTime":5,"cookTime":10,"totalTime":15,"ingredients":[],"steps":[]}]"#;

    #[test]
    fn valid_recipe_array_passes_all_checkpoints() {
        let outcome = validate(VALID_RECIPE);

        assert!(outcome.success);
        assert_eq!(outcome.recipe_count, Some(1));
        assert!(outcome.error_kind.is_none());
        assert!(outcome.error_message.is_none());
        for stage in Stage::ALL {
            assert!(outcome.steps.get(stage), "{} should have passed", stage.name());
        }
    }

    #[test]
    fn recipe_count_equals_array_length() {
        let recipe = r#"{"name":"Soup","prepTime":5,"cookTime":10,"totalTime":15,"ingredients":[],"steps":[]}"#;
        let content = format!("[{recipe},{recipe},{recipe}]");

        let outcome = validate(&content);

        assert!(outcome.success);
        assert_eq!(outcome.recipe_count, Some(3));
    }

    #[test]
    fn non_array_content_fails_first_checkpoint() {
        for content in ["{\"name\": \"Soup\"}", "Here's your array: [1,2,3]", "plain text", "[1, 2, 3", ""] {
            let outcome = validate(content);

            assert!(!outcome.success, "{content:?} should fail");
            assert_eq!(outcome.error_kind, Some(ErrorKind::Format));
            assert!(!outcome.steps.array_format);
            assert!(!outcome.steps.markdown_removed);
            assert!(!outcome.steps.intro_text_removed);
            assert!(!outcome.steps.json_parsed);
            assert!(!outcome.steps.structure_validated);
        }
    }

    #[test]
    fn fenced_code_block_fails_markdown_check() {
        // Starts with [ and ends with ] but is not parseable, so the fence
        // survives normalization and the markdown check catches it.
        let content = "[\n```json\n[1, 2, 3]\n```\n]";

        let outcome = validate(content);

        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Format));
        assert_eq!(outcome.error_message.as_deref(), Some("Invalid response format: Response contains markdown code block"));
        assert!(outcome.steps.array_format);
        assert!(!outcome.steps.markdown_removed);
        assert!(!outcome.steps.intro_text_removed);
    }

    #[test]
    fn fence_without_language_tag_is_detected() {
        let outcome = validate("[\n```\nnot json\n```\n]");

        assert_eq!(outcome.error_kind, Some(ErrorKind::Format));
        assert!(!outcome.steps.markdown_removed);
    }

    #[test]
    fn intro_text_reports_first_matching_phrase() {
        // The bracket check runs first, so exercising the intro check needs a
        // substituted phrase list that can match array-shaped content. Both
        // phrases match the normalized content; the first one listed wins.
        let validator = Validator::with_intro_phrases(vec!["[\n".to_string(), "[".to_string()]);

        let outcome = validator.validate(r#"[{"note": "hi"}]"#, "s", "t");

        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Format));
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("Invalid response format: Response contains introductory text (begins with \"[\\n\")")
        );
        assert!(outcome.steps.array_format);
        assert!(outcome.steps.markdown_removed);
        assert!(!outcome.steps.intro_text_removed);
    }

    #[test]
    fn intro_phrases_match_in_priority_order() {
        let phrases: Vec<String> = DEFAULT_INTRO_PHRASES.iter().map(|s| s.to_string()).collect();

        // "Here's your..." matches "Here's" (index 0) before the bare "Here".
        let hit = phrases.iter().find(|p| "Here's your recipes".starts_with(p.as_str()));
        assert_eq!(hit.map(String::as_str), Some("Here's"));

        let hit = phrases.iter().find(|p| "Here you go".starts_with(p.as_str()));
        assert_eq!(hit.map(String::as_str), Some("Here"));

        let hit = phrases.iter().find(|p| "I made these".starts_with(p.as_str()));
        assert_eq!(hit.map(String::as_str), Some("I"));
    }

    #[test]
    fn broken_json_reports_parser_position() {
        let content = "[{\"name\": \"Soup\",}]";

        let outcome = validate(content);

        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Parse));
        assert!(outcome.steps.array_format);
        assert!(outcome.steps.markdown_removed);
        assert!(outcome.steps.intro_text_removed);
        assert!(!outcome.steps.json_parsed);
        let message = outcome.error_message.unwrap();
        assert!(message.starts_with("Invalid JSON format:"), "{message}");
        assert!(message.contains("line 1"), "{message}");
    }

    #[test]
    fn empty_array_fails_structure_check() {
        let outcome = validate("[]");

        assert_eq!(outcome.error_kind, Some(ErrorKind::Structure));
        assert_eq!(outcome.error_message.as_deref(), Some("Response array cannot be empty"));
        assert!(outcome.steps.json_parsed);
        assert!(!outcome.steps.structure_validated);
    }

    #[test]
    fn non_object_first_element_fails_structure_check() {
        let outcome = validate(r#"["not", "a", "recipe"]"#);

        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Structure));
        assert!(outcome.steps.json_parsed);
        assert!(!outcome.steps.structure_validated);
    }

    #[test]
    fn missing_fields_reported_in_specification_order() {
        // Candidate lists steps before prepTime; the report must follow the
        // required-field order, not the candidate's.
        let outcome = validate(r#"[{"steps": [], "name": "Soup"}]"#);

        assert_eq!(outcome.error_kind, Some(ErrorKind::Structure));
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("Missing required fields in recipe: prepTime, cookTime, totalTime, ingredients")
        );
    }

    #[test]
    fn only_first_element_is_field_checked() {
        let full = r#"{"name":"Soup","prepTime":5,"cookTime":10,"totalTime":15,"ingredients":[],"steps":[]}"#;
        let content = format!(r#"[{full},{{"name":"incomplete"}}]"#);

        let outcome = validate(&content);

        assert!(outcome.success);
        assert_eq!(outcome.recipe_count, Some(2));
    }

    #[test]
    fn validation_is_deterministic() {
        let content = r#"[{"name": "Soup"}]"#;

        let mut a = validate(content);
        let mut b = validate(content);

        // Identical except for wall-clock fields.
        a.duration_ms = 0;
        b.duration_ms = 0;
        a.timestamp = b.timestamp;
        assert_eq!(a, b);
    }

    #[test]
    fn content_length_reflects_normalized_content() {
        let content = "[{\"name\":\"Soup\",\"prepTime\":5,\"cookTime\":10,\"totalTime\":15,\"ingredients\":[],\"steps\":[]}]";

        let outcome = validate(content);

        assert_eq!(outcome.content_length, normalize_json(content).len());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let outcome = validate(&format!("  \n{VALID_RECIPE}\n  "));

        assert!(outcome.success);
    }

    #[test]
    fn normalize_json_canonicalizes_parseable_content() {
        assert_eq!(normalize_json(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
        // Unparseable content passes through unchanged.
        assert_eq!(normalize_json("not json"), "not json");
    }

    #[test]
    fn checkpoint_map_serializes_keys_in_stage_order() {
        let mut progress = StageProgress::default();
        progress.advance(Stage::ArrayFormat);
        progress.advance(Stage::MarkdownRemoved);

        let json = serde_json::to_string(&progress.checkpoints()).unwrap();
        assert_eq!(
            json,
            r#"{"array_format":true,"markdown_removed":true,"intro_text_removed":false,"json_parsed":false,"structure_validated":false}"#
        );
    }

    #[test]
    fn stage_progress_is_a_strict_prefix() {
        let mut progress = StageProgress::default();
        assert!(!progress.passed(Stage::ArrayFormat));

        progress.advance(Stage::ArrayFormat);
        progress.advance(Stage::MarkdownRemoved);
        assert!(progress.passed(Stage::ArrayFormat));
        assert!(progress.passed(Stage::MarkdownRemoved));
        assert!(!progress.passed(Stage::IntroTextRemoved));
        assert!(!progress.passed(Stage::StructureValidated));
    }
}

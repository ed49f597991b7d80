//! Schema-checked parsing of model output with a single repair pass.

use std::collections::BTreeSet;

use super::schema::ResponseSchema;
use super::types::ChangeRecord;
use super::StructuringError;
use crate::pipeline::llm::LlmClient;
use crate::pipeline::prompt_templates::{PromptId, PromptRegistry};

/// Extra check run after deserialization and schema validation.
pub type Validator<T> = Box<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// Locate the JSON payload in a model response.
///
/// Accepts a ```json fence, a bare ``` fence holding JSON, or the outermost
/// `{...}` / `[...]` span, whichever opens first.
pub fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return Some(after_fence[..end].trim());
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            let block = after_fence[..end].trim();
            if block.starts_with('{') || block.starts_with('[') {
                return Some(block);
            }
        }
    }

    let object = trimmed.find('{').zip(trimmed.rfind('}'));
    let array = trimmed.find('[').zip(trimmed.rfind(']'));
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if a.0 < o.0 { a } else { o }),
        (o, a) => o.or(a),
    };

    span.filter(|(start, end)| start < end)
        .map(|(start, end)| &trimmed[start..=end])
}

/// Strict parse: locate, deserialize, validate. Errors are human-readable
/// reasons suitable for the repair prompt.
pub fn parse_strict<T: ResponseSchema>(response: &str) -> Result<T, String> {
    let json = extract_json(response).ok_or_else(|| "No JSON found in response".to_string())?;
    let value: T = serde_json::from_str(json).map_err(|e| format!("Invalid JSON: {e}"))?;
    value.validate()?;
    Ok(value)
}

/// Parser for one response schema, with optional extra validators.
pub struct StructuredParser<T> {
    validators: Vec<Validator<T>>,
}

impl<T: ResponseSchema> Default for StructuredParser<T> {
    fn default() -> Self {
        Self { validators: Vec::new() }
    }
}

impl<T: ResponseSchema> StructuredParser<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(mut self, validator: Validator<T>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn format_instructions(&self) -> String {
        T::format_instructions()
    }

    fn check(&self, response: &str) -> Result<T, String> {
        let value = parse_strict::<T>(response)?;
        for validator in &self.validators {
            validator(&value)?;
        }
        Ok(value)
    }

    /// Parse without any model round trip.
    pub fn parse(&self, response: &str) -> Result<T, StructuringError> {
        self.check(response).map_err(|reason| StructuringError::SchemaParse {
            reason,
            raw: response.to_string(),
            repair_raw: None,
        })
    }

    /// Parse, and on failure ask `model` once to restate its answer.
    pub fn parse_with_repair(
        &self,
        response: &str,
        model: &dyn LlmClient,
        prompts: &PromptRegistry,
    ) -> Result<T, StructuringError> {
        let first_error = match self.check(response) {
            Ok(value) => return Ok(value),
            Err(reason) => reason,
        };

        tracing::warn!(
            model = %model.describe(),
            error = %first_error,
            response_len = response.len(),
            "Response failed schema check, requesting repair"
        );

        let instructions = self.format_instructions();
        let prompt = prompts.template(PromptId::OutputFixing).render(&[
            ("instructions", instructions.as_str()),
            ("completion", response),
            ("error", first_error.as_str()),
        ])?;
        let repaired = model.invoke(&prompt)?;

        self.check(&repaired).map_err(|reason| {
            tracing::error!(
                model = %model.describe(),
                first_error = %first_error,
                repair_error = %reason,
                "Repair response failed schema check"
            );
            StructuringError::SchemaParse {
                reason,
                raw: response.to_string(),
                repair_raw: Some(repaired.clone()),
            }
        })
    }
}

/// Require a record for every page in `1..=expected_pages`.
pub fn page_coverage_validator(expected_pages: u32) -> Validator<Vec<ChangeRecord>> {
    Box::new(move |records: &Vec<ChangeRecord>| {
        let reported: BTreeSet<u32> = records.iter().filter_map(ChangeRecord::page_number).collect();
        let missing: Vec<u32> = (1..=expected_pages).filter(|p| !reported.contains(p)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            let pages: Vec<String> = missing.iter().map(u32::to_string).collect();
            Err(format!(
                "missing pages {}; report every page, using \"NO CHANGE\" for unchanged ones",
                pages.join(", ")
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::mock::MockLlmClient;
    use crate::pipeline::structuring::{Metadata, NO_CHANGE};

    type Changes = Vec<ChangeRecord>;

    #[test]
    fn extract_json_from_fenced() {
        let text = "Here is the result:\n```json\n[{\"page\": \"1\"}]\n```\nDone.";
        assert_eq!(extract_json(text), Some("[{\"page\": \"1\"}]"));
    }

    #[test]
    fn extract_json_from_bare_fence() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn extract_json_prefers_outer_array() {
        let text = "Result: [{\"page\": \"1\", \"changes\": \"x\"}] thanks";
        assert_eq!(extract_json(text), Some("[{\"page\": \"1\", \"changes\": \"x\"}]"));
    }

    #[test]
    fn extract_json_from_bare_object() {
        let text = "Result: {\"key\": [1, 2]}";
        assert_eq!(extract_json(text), Some("{\"key\": [1, 2]}"));
    }

    #[test]
    fn extract_json_none_without_json() {
        assert_eq!(extract_json("No JSON here at all."), None);
    }

    #[test]
    fn valid_comparison_yields_one_record_per_element() {
        let raw = r#"[{"page":"1","changes":"NO CHANGE"},{"page":"2","changes":"Owner renamed"},{"page":3,"changes":"NO CHANGE"}]"#;
        let records = StructuredParser::<Changes>::new().parse(raw).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].page, "3");
    }

    #[test]
    fn valid_response_makes_no_model_call() {
        let model = MockLlmClient::new("unused");
        let raw = r#"[{"page":"1","changes":"NO CHANGE"}]"#;
        let records = StructuredParser::<Changes>::new()
            .parse_with_repair(raw, &model, &PromptRegistry::new())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn malformed_response_repaired_with_one_call() {
        let model = MockLlmClient::new(r#"```json
[{"page": "1", "changes": "NO CHANGE"}]
```"#);
        let records = StructuredParser::<Changes>::new()
            .parse_with_repair("[{page: 1, changes: NO CHANGE", &model, &PromptRegistry::new())
            .unwrap();
        assert_eq!(records, vec![ChangeRecord::new("1", NO_CHANGE)]);
        assert_eq!(model.calls(), 1);

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("[{page: 1, changes: NO CHANGE"));
        assert!(prompt.contains("Here is the output schema"));
        assert!(prompt.contains("Invalid JSON") || prompt.contains("No JSON"));
    }

    #[test]
    fn failed_repair_is_schema_error_with_both_payloads() {
        let model = MockLlmClient::new("still not json");
        let err = StructuredParser::<Changes>::new()
            .parse_with_repair("garbage", &model, &PromptRegistry::new())
            .unwrap_err();

        assert_eq!(model.calls(), 1);
        match err {
            StructuringError::SchemaParse { raw, repair_raw, .. } => {
                assert_eq!(raw, "garbage");
                assert_eq!(repair_raw.as_deref(), Some("still not json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn model_failure_during_repair_propagates() {
        let model = MockLlmClient::failing(500);
        let err = StructuredParser::<Changes>::new()
            .parse_with_repair("garbage", &model, &PromptRegistry::new())
            .unwrap_err();
        assert!(matches!(err, StructuringError::Model(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn missing_metadata_field_is_schema_violation() {
        let err = StructuredParser::<Metadata>::new()
            .parse(r#"{"title": "Lease"}"#)
            .unwrap_err();
        assert!(matches!(err, StructuringError::SchemaParse { repair_raw: None, .. }));
    }

    #[test]
    fn page_coverage_off_by_default() {
        let raw = r#"[{"page":"2","changes":"x"}]"#;
        assert!(StructuredParser::<Changes>::new().parse(raw).is_ok());
    }

    #[test]
    fn page_coverage_gap_goes_through_repair() {
        let model = MockLlmClient::new(
            r#"[{"page":"1","changes":"NO CHANGE"},{"page":"2","changes":"x"}]"#,
        );
        let parser = StructuredParser::<Changes>::new().with_validator(page_coverage_validator(2));
        let records = parser
            .parse_with_repair(r#"[{"page":"2","changes":"x"}]"#, &model, &PromptRegistry::new())
            .unwrap();
        assert_eq!(records.len(), 2);
        assert!(model.prompts()[0].contains("missing pages 1"));
    }
}

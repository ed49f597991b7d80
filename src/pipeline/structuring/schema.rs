use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::types::{ChangeRecord, Metadata};

/// A typed shape the model must answer in.
pub trait ResponseSchema: DeserializeOwned {
    /// JSON schema describing the expected output.
    fn json_schema() -> Value;

    /// Semantic checks beyond what deserialization enforces.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Instructions embedded in prompts so the model emits this shape.
    fn format_instructions() -> String {
        format!(
            "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\n\
             As an example, for the schema {{\"properties\": {{\"foo\": {{\"title\": \"Foo\", \"description\": \"a list of strings\", \"type\": \"array\", \"items\": {{\"type\": \"string\"}}}}}}, \"required\": [\"foo\"]}}\n\
             the object {{\"foo\": [\"bar\", \"baz\"]}} is a well-formatted instance of the schema. \
             The object {{\"properties\": {{\"foo\": [\"bar\", \"baz\"]}}}} is not well-formatted.\n\n\
             Here is the output schema:\n```\n{}\n```",
            Self::json_schema()
        )
    }
}

impl ResponseSchema for Metadata {
    fn json_schema() -> Value {
        let text = json!({"type": "string"});
        let list = json!({"type": "array", "items": {"type": "string"}});
        json!({
            "title": "Metadata",
            "description": "Structured metadata extracted from estate-related documents.",
            "type": "object",
            "properties": {
                "summary": list,
                "title": text,
                "author": list,
                "date_created": text,
                "last_modified_date": text,
                "publisher": text,
                "language": text,
                "page_count": {"anyOf": [{"type": "integer"}, {"type": "string"}]},
                "sentiment_tone": text,
            },
            "required": [
                "summary", "title", "author", "date_created", "last_modified_date",
                "publisher", "language", "page_count", "sentiment_tone"
            ],
        })
    }
}

impl ResponseSchema for Vec<ChangeRecord> {
    fn json_schema() -> Value {
        json!({
            "title": "SummaryResponse",
            "type": "array",
            "items": {
                "title": "ChangeFormat",
                "description": "A change detected on a specific page of the document.",
                "type": "object",
                "properties": {
                    "page": {"type": "string"},
                    "changes": {"type": "string"},
                },
                "required": ["page", "changes"],
            },
        })
    }

    fn validate(&self) -> Result<(), String> {
        for (i, record) in self.iter().enumerate() {
            if record.page.trim().is_empty() {
                return Err(format!("record {i} has an empty page"));
            }
            if record.changes.trim().is_empty() {
                return Err(format!(
                    "record for page {} has empty changes; unchanged pages must say NO CHANGE",
                    record.page
                ));
            }
        }
        Ok(())
    }
}

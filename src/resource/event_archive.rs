//! EventBridge event archive
//!
//! Renaming an archive or pointing it at a different event bus cannot be
//! done in place; both force a replacement.

use anyhow::Result;
use declarative::{AttributeSpec, Comparison, ResourceSchema, ValueType, Validator};

pub const TYPE_NAME: &str = "aws_cloudwatch_event_archive";

pub fn schema() -> Result<ResourceSchema> {
    Ok(ResourceSchema::new(TYPE_NAME, "EventBridge archive of events from an event bus")
        .attribute(
            AttributeSpec::string("name")
                .required()
                .immutable()
                .validate(Validator::NonEmpty)
                .validate(Validator::MaxLength(48))
                .validate(Validator::pattern(r"^[.\-_A-Za-z0-9]+$")?)
                .describe("Archive name"),
        )
        .attribute(
            AttributeSpec::string("event_source_arn")
                .required()
                .replace_on_change()
                .validate(Validator::NonEmpty)
                .describe("ARN of the event bus whose events are archived"),
        )
        .attribute(
            AttributeSpec::string("description")
                .default_value("")
                .validate(Validator::MaxLength(512)),
        )
        .attribute(
            AttributeSpec::string("event_pattern")
                .validate(Validator::Json)
                .validate(Validator::MaxLength(2048))
                .compare(Comparison::Json)
                .describe("Event pattern filtering which events are archived"),
        )
        .attribute(
            AttributeSpec::int("retention_days")
                .default_value(0_i64)
                .validate(Validator::at_least(0))
                .describe("Days to keep events; 0 keeps them indefinitely"),
        )
        .attribute(AttributeSpec::computed("arn", ValueType::String).describe("Archive ARN")))
}

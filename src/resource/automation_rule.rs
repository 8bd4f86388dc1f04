//! Security Hub automation rule
//!
//! Every attribute can be changed in place; the rule keeps its ARN for life.

use anyhow::Result;
use declarative::{AttributeSpec, Comparison, ResourceSchema, ValueType, Validator};

pub const TYPE_NAME: &str = "aws_securityhub_automation_rule";

const OPERATORS: &[&str] = &[
    "EQUALS",
    "PREFIX",
    "NOT_EQUALS",
    "PREFIX_NOT_EQUALS",
    "CONTAINS",
    "NOT_CONTAINS",
];

fn criterion() -> ValueType {
    ValueType::Block(vec![
        AttributeSpec::string("key").required().validate(Validator::NonEmpty),
        AttributeSpec::string("operator")
            .required()
            .validate(Validator::one_of(OPERATORS)),
        AttributeSpec::new("values", ValueType::list_of(ValueType::String))
            .required()
            .validate(Validator::MinItems(1)),
    ])
}

fn action() -> ValueType {
    ValueType::Block(vec![
        AttributeSpec::string("type").default_value("FINDING_FIELDS_UPDATE"),
        AttributeSpec::string("note"),
        AttributeSpec::string("severity"),
        AttributeSpec::string("workflow_status"),
        AttributeSpec::string("verification_state"),
        AttributeSpec::int("criticality").validate(Validator::IntRange { min: 0, max: 100 }),
        AttributeSpec::int("confidence").validate(Validator::IntRange { min: 0, max: 100 }),
        AttributeSpec::new("types", ValueType::list_of(ValueType::String)),
        AttributeSpec::new("user_defined_fields", ValueType::map_of(ValueType::String)),
    ])
}

pub fn schema() -> Result<ResourceSchema> {
    Ok(ResourceSchema::new(TYPE_NAME, "Security Hub rule that updates matching findings")
        .attribute(
            AttributeSpec::string("rule_name")
                .required()
                .validate(Validator::NonEmpty)
                .validate(Validator::MaxLength(256)),
        )
        .attribute(
            AttributeSpec::string("description")
                .required()
                .validate(Validator::MaxLength(1024)),
        )
        .attribute(AttributeSpec::bool("rule_enabled").default_value(true))
        .attribute(
            AttributeSpec::int("rule_order")
                .default_value(1_i64)
                .validate(Validator::IntRange { min: 1, max: 1000 })
                .describe("Evaluation order; lower runs first"),
        )
        .attribute(
            AttributeSpec::bool("is_terminal")
                .default_value(false)
                .describe("Stop evaluating lower-priority rules after this one matches"),
        )
        .attribute(
            AttributeSpec::new("criteria", ValueType::list_of(criterion()))
                .compare(Comparison::Unordered),
        )
        .attribute(
            AttributeSpec::new("actions", ValueType::list_of(action()))
                .compare(Comparison::Unordered),
        )
        .attribute(AttributeSpec::computed("arn", ValueType::String).describe("Rule ARN")))
}

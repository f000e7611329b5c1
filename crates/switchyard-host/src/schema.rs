use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declarative description of what a view sends to and reads from its
/// backing service.
///
/// Built once per view, either through [`FieldSchema::builder`] or by
/// deserializing a view declaration; both paths validate that no field name
/// repeats within a direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldSchema")]
pub struct FieldSchema {
    input_required: Vec<String>,
    output_required: Vec<String>,
    output_optional: Vec<String>,
    output_repeated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field `{field}` is declared more than once among {direction} fields")]
    DuplicateField { field: String, direction: Direction },
    #[error("{direction} field names must not be blank")]
    BlankField { direction: Direction },
}

impl FieldSchema {
    pub fn builder() -> FieldSchemaBuilder {
        FieldSchemaBuilder::default()
    }

    pub fn input_required(&self) -> &[String] {
        &self.input_required
    }

    pub fn output_required(&self) -> &[String] {
        &self.output_required
    }

    pub fn output_optional(&self) -> &[String] {
        &self.output_optional
    }

    pub fn output_repeated(&self) -> bool {
        self.output_repeated
    }

    /// Required output names followed by optional ones.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.output_required
            .iter()
            .chain(&self.output_optional)
            .map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        check_unique(self.input_required.iter(), Direction::Input)?;
        check_unique(
            self.output_required.iter().chain(&self.output_optional),
            Direction::Output,
        )
    }
}

fn check_unique<'a>(
    names: impl Iterator<Item = &'a String>,
    direction: Direction,
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(SchemaError::BlankField { direction });
        }
        if !seen.insert(name.as_str()) {
            return Err(SchemaError::DuplicateField {
                field: name.clone(),
                direction,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawFieldSchema {
    input_required: Vec<String>,
    output_required: Vec<String>,
    output_optional: Vec<String>,
    output_repeated: bool,
}

impl TryFrom<RawFieldSchema> for FieldSchema {
    type Error = SchemaError;

    fn try_from(raw: RawFieldSchema) -> Result<Self, Self::Error> {
        let schema = FieldSchema {
            input_required: raw.input_required,
            output_required: raw.output_required,
            output_optional: raw.output_optional,
            output_repeated: raw.output_repeated,
        };
        schema.validate()?;
        Ok(schema)
    }
}

#[derive(Debug, Default)]
pub struct FieldSchemaBuilder {
    raw: RawFieldSchema,
}

impl FieldSchemaBuilder {
    pub fn input<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw.input_required.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw
            .output_required
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn optional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw
            .output_optional
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn repeated(mut self, repeated: bool) -> Self {
        self.raw.output_repeated = repeated;
        self
    }

    pub fn build(self) -> Result<FieldSchema, SchemaError> {
        FieldSchema::try_from(self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_schema_is_empty_and_single() {
        let schema = FieldSchema::default();
        assert!(schema.input_required().is_empty());
        assert_eq!(schema.output_names().count(), 0);
        assert!(!schema.output_repeated());
    }

    #[test]
    fn output_names_put_required_first() {
        let schema = FieldSchema::builder()
            .required(["id", "name"])
            .optional(["is_active"])
            .build()
            .unwrap();
        let names: Vec<_> = schema.output_names().collect();
        assert_eq!(names, ["id", "name", "is_active"]);
    }

    #[test]
    fn duplicate_across_output_lists_is_rejected() {
        let err = FieldSchema::builder()
            .required(["name"])
            .optional(["name"])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateField {
                field: "name".into(),
                direction: Direction::Output
            }
        );
    }

    #[test]
    fn same_name_may_appear_in_both_directions() {
        let schema = FieldSchema::builder()
            .input(["name"])
            .required(["name"])
            .build();
        assert!(schema.is_ok());
    }

    #[test]
    fn deserialize_validates_and_defaults() {
        let schema: FieldSchema =
            serde_json::from_value(json!({"output_required": ["name"], "output_repeated": true}))
                .unwrap();
        assert!(schema.output_repeated());
        assert!(schema.output_optional().is_empty());

        let err = serde_json::from_value::<FieldSchema>(json!({"input_required": ["a", "a"]}));
        assert!(err.is_err());
        let err = serde_json::from_value::<FieldSchema>(json!({"outputs": ["a"]}));
        assert!(err.is_err());
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = FieldSchema::builder().input([" "]).build().unwrap_err();
        assert_eq!(
            err,
            SchemaError::BlankField {
                direction: Direction::Input
            }
        );
    }
}

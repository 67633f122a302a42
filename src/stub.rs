//! Validated stub model.
//!
//! A [`StubDefinition`] is the loosely-typed shape stubs arrive in. Validation
//! turns it into a [`Stub`] whose input rule and output are tagged variants, so
//! "exactly one strategy" and "at least one output" hold by construction.

use crate::config::{CodeDefinition, InputDefinition, OutputDefinition, Payload, StubDefinition};
use crate::error::StubError;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A method identifier in canonical form.
///
/// The first character is upper-cased and the rest lower-cased, so `getUser`,
/// `getuser` and `GetUser` all become `Getuser`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodName(String);

impl MethodName {
    /// Canonicalize a raw method identifier.
    pub fn new(raw: &str) -> Self {
        let mut chars = raw.chars();
        let canonical = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        };
        Self(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for MethodName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// RPC status code attached to a failure output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u32);

const CODE_NAMES: [&str; 17] = [
    "OK",
    "CANCELLED",
    "UNKNOWN",
    "INVALID_ARGUMENT",
    "DEADLINE_EXCEEDED",
    "NOT_FOUND",
    "ALREADY_EXISTS",
    "PERMISSION_DENIED",
    "RESOURCE_EXHAUSTED",
    "FAILED_PRECONDITION",
    "ABORTED",
    "OUT_OF_RANGE",
    "UNIMPLEMENTED",
    "INTERNAL",
    "UNAVAILABLE",
    "DATA_LOSS",
    "UNAUTHENTICATED",
];

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0);
    pub const UNKNOWN: StatusCode = StatusCode(2);
    pub const NOT_FOUND: StatusCode = StatusCode(5);
    pub const INTERNAL: StatusCode = StatusCode(13);
    pub const UNAVAILABLE: StatusCode = StatusCode(14);

    pub fn from_u32(code: u32) -> Option<Self> {
        ((code as usize) < CODE_NAMES.len()).then_some(Self(code))
    }

    /// Look up a code by its canonical name, e.g. `NOT_FOUND`.
    pub fn from_name(name: &str) -> Option<Self> {
        CODE_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| Self(i as u32))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn name(&self) -> &'static str {
        CODE_NAMES[self.0 as usize]
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl TryFrom<&CodeDefinition> for StatusCode {
    type Error = StubError;

    fn try_from(def: &CodeDefinition) -> Result<Self, Self::Error> {
        match def {
            CodeDefinition::Number(n) => StatusCode::from_u32(*n),
            CodeDefinition::Name(name) => StatusCode::from_name(name),
        }
        .ok_or_else(|| StubError::InvalidStatusCode(def.to_string()))
    }
}

/// A single `matches` pattern.
///
/// String patterns are regular expressions applied to the string form of the
/// actual value; any other pattern value must be structurally equal.
#[derive(Debug, Clone)]
pub enum Pattern {
    Regex(Regex),
    Literal(Value),
}

impl Pattern {
    /// Compile the pattern configured for `field`.
    pub fn compile(field: &str, value: &Value) -> Result<Self, StubError> {
        match value {
            Value::String(pattern) => Regex::new(pattern)
                .map(Pattern::Regex)
                .map_err(|source| StubError::InvalidPattern {
                    field: field.to_string(),
                    source,
                }),
            other => Ok(Pattern::Literal(other.clone())),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Pattern::Regex(regex) => Value::String(regex.as_str().to_string()),
            Pattern::Literal(value) => value.clone(),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Pattern::Regex(a), Pattern::Regex(b)) => a.as_str() == b.as_str(),
            (Pattern::Literal(a), Pattern::Literal(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Pattern::Regex(regex) => serializer.serialize_str(regex.as_str()),
            Pattern::Literal(value) => value.serialize(serializer),
        }
    }
}

/// The active input-matching strategy of a stub.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputRule {
    /// Payload must equal the mapping exactly.
    Equals(Payload),
    /// Payload must contain every entry; extra fields are ignored.
    Contains(Payload),
    /// Payload values must satisfy the per-field patterns.
    Matches(BTreeMap<String, Pattern>),
}

impl InputRule {
    /// Strategy name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            InputRule::Equals(_) => "equals",
            InputRule::Contains(_) => "contains",
            InputRule::Matches(_) => "matches",
        }
    }
}

impl TryFrom<&InputDefinition> for InputRule {
    type Error = StubError;

    // Precedence: equals, then contains, then matches. Empty mappings count as unset.
    fn try_from(def: &InputDefinition) -> Result<Self, Self::Error> {
        if let Some(equals) = def.equals.as_ref().filter(|m| !m.is_empty()) {
            return Ok(InputRule::Equals(equals.clone()));
        }
        if let Some(contains) = def.contains.as_ref().filter(|m| !m.is_empty()) {
            return Ok(InputRule::Contains(contains.clone()));
        }
        if let Some(matches) = def.matches.as_ref().filter(|m| !m.is_empty()) {
            let patterns = matches
                .iter()
                .map(|(field, value)| Ok((field.clone(), Pattern::compile(field, value)?)))
                .collect::<Result<BTreeMap<_, _>, StubError>>()?;
            return Ok(InputRule::Matches(patterns));
        }
        Err(StubError::EmptyInput)
    }
}

/// The synthesized response of a matched stub.
///
/// `Error` and `Code` are deliberately configured failures; they are returned
/// as normal outputs, not raised as engine errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Data(Payload),
    Error {
        message: String,
        code: Option<StatusCode>,
    },
    Code(StatusCode),
}

impl Output {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Output::Data(_))
    }

    /// Status the boundary should report for this output.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Output::Data(_) => StatusCode::OK,
            Output::Error { code, .. } => code.unwrap_or(StatusCode::UNKNOWN),
            Output::Code(code) => *code,
        }
    }

    /// Pick the active output of a definition. Failures win over data when
    /// several fields are set.
    pub fn from_definition(def: &OutputDefinition) -> Result<Self, StubError> {
        let code = def.code.as_ref().map(StatusCode::try_from).transpose()?;
        if let Some(message) = def.error.as_ref().filter(|m| !m.is_empty()) {
            return Ok(Output::Error {
                message: message.clone(),
                code,
            });
        }
        if let Some(code) = code {
            return Ok(Output::Code(code));
        }
        match &def.data {
            Some(data) => Ok(Output::Data(data.clone())),
            None => Err(StubError::EmptyOutput),
        }
    }
}

impl From<&Output> for OutputDefinition {
    fn from(output: &Output) -> Self {
        match output {
            Output::Data(data) => OutputDefinition {
                data: Some(data.clone()),
                ..Default::default()
            },
            Output::Error { message, code } => OutputDefinition {
                error: Some(message.clone()),
                code: code.map(|c| CodeDefinition::Number(c.value())),
                ..Default::default()
            },
            Output::Code(code) => OutputDefinition {
                code: Some(CodeDefinition::Number(code.value())),
                ..Default::default()
            },
        }
    }
}

impl Serialize for Output {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OutputDefinition::from(self).serialize(serializer)
    }
}

/// A registered expectation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "StubDefinition")]
pub struct Stub {
    pub service: String,
    pub method: MethodName,
    pub input: InputRule,
    pub output: Output,
}

impl TryFrom<StubDefinition> for Stub {
    type Error = StubError;

    fn try_from(def: StubDefinition) -> Result<Self, Self::Error> {
        if def.service.trim().is_empty() {
            return Err(StubError::EmptyService);
        }
        if def.method.trim().is_empty() {
            return Err(StubError::EmptyMethod);
        }
        let method = MethodName::new(&def.method);
        let input = InputRule::try_from(&def.input)?;
        let output = Output::from_definition(&def.output)?;

        Ok(Stub {
            service: def.service,
            method,
            input,
            output,
        })
    }
}

impl From<Stub> for StubDefinition {
    fn from(stub: Stub) -> Self {
        let mut input = InputDefinition::default();
        match &stub.input {
            InputRule::Equals(map) => input.equals = Some(map.clone()),
            InputRule::Contains(map) => input.contains = Some(map.clone()),
            InputRule::Matches(patterns) => {
                input.matches = Some(
                    patterns
                        .iter()
                        .map(|(field, pattern)| (field.clone(), pattern.to_value()))
                        .collect(),
                )
            }
        }

        StubDefinition {
            service: stub.service,
            method: stub.method.0,
            input,
            output: OutputDefinition::from(&stub.output),
        }
    }
}

/// A lookup query for the stub matching an actual call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindRequest {
    pub service: String,
    pub method: String,
    #[serde(default)]
    pub data: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    fn definition(value: Value) -> StubDefinition {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_method_canonicalization() {
        assert_eq!(MethodName::new("getUser").as_str(), "Getuser");
        assert_eq!(MethodName::new("getuser").as_str(), "Getuser");
        assert_eq!(MethodName::new("GetUser").as_str(), "Getuser");
        assert_eq!(MethodName::new("GETUSER").as_str(), "Getuser");
        assert_eq!(MethodName::new("getUser"), MethodName::new("getuser"));
        assert_eq!(MethodName::new("getUser"), MethodName::new("GetUser"));
        assert_ne!(MethodName::new("getUser"), MethodName::new("getUsers"));
    }

    #[test]
    fn test_method_hash_is_case_insensitive() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(MethodName::new("getUser"));
        assert!(set.contains(&MethodName::new("GETUSER")));
        assert!(set.contains(&MethodName::new("getuser")));
    }

    #[test]
    fn test_status_code_parsing() {
        assert_eq!(StatusCode::from_u32(5), Some(StatusCode::NOT_FOUND));
        assert_eq!(StatusCode::from_u32(17), None);
        assert_eq!(StatusCode::from_name("NOT_FOUND"), Some(StatusCode::NOT_FOUND));
        assert_eq!(StatusCode::from_name("unavailable"), Some(StatusCode::UNAVAILABLE));
        assert_eq!(StatusCode::from_name("TEAPOT"), None);
        assert_eq!(StatusCode::INTERNAL.name(), "INTERNAL");
    }

    #[test]
    fn test_validate_full_stub() {
        let stub = Stub::try_from(definition(json!({
            "service": "Greeter",
            "method": "sayHello",
            "input": {"equals": {"name": "tokopedia"}},
            "output": {"data": {"message": "Hello Tokopedia"}}
        })))
        .unwrap();

        assert_eq!(stub.service, "Greeter");
        assert_eq!(stub.method.as_str(), "Sayhello");
        assert_eq!(stub.input, InputRule::Equals(payload(json!({"name": "tokopedia"}))));
        assert_eq!(stub.output, Output::Data(payload(json!({"message": "Hello Tokopedia"}))));
    }

    #[test]
    fn test_validation_failures() {
        let base = json!({
            "service": "Greeter",
            "method": "SayHello",
            "input": {"contains": {"a": 1}},
            "output": {"data": {}}
        });

        let mut no_service = base.clone();
        no_service["service"] = json!("");
        assert!(matches!(
            Stub::try_from(definition(no_service)),
            Err(StubError::EmptyService)
        ));

        let mut no_method = base.clone();
        no_method["method"] = json!("");
        assert!(matches!(
            Stub::try_from(definition(no_method)),
            Err(StubError::EmptyMethod)
        ));

        let mut blank_service = base.clone();
        blank_service["service"] = json!("  \t");
        assert!(matches!(
            Stub::try_from(definition(blank_service)),
            Err(StubError::EmptyService)
        ));

        let mut blank_method = base.clone();
        blank_method["method"] = json!(" ");
        assert!(matches!(
            Stub::try_from(definition(blank_method)),
            Err(StubError::EmptyMethod)
        ));

        let mut no_input = base.clone();
        no_input["input"] = json!({});
        assert!(matches!(
            Stub::try_from(definition(no_input)),
            Err(StubError::EmptyInput)
        ));

        let mut empty_rule = base.clone();
        empty_rule["input"] = json!({"equals": {}});
        assert!(matches!(
            Stub::try_from(definition(empty_rule)),
            Err(StubError::EmptyInput)
        ));

        let mut no_output = base.clone();
        no_output["output"] = json!({"error": ""});
        assert!(matches!(
            Stub::try_from(definition(no_output)),
            Err(StubError::EmptyOutput)
        ));

        let mut bad_code = base;
        bad_code["output"] = json!({"code": 42});
        assert!(matches!(
            Stub::try_from(definition(bad_code)),
            Err(StubError::InvalidStatusCode(_))
        ));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let result = Stub::try_from(definition(json!({
            "service": "Greeter",
            "method": "SayHello",
            "input": {"matches": {"name": "(unclosed"}},
            "output": {"data": {}}
        })));

        match result {
            Err(StubError::InvalidPattern { field, .. }) => assert_eq!(field, "name"),
            other => panic!("Expected InvalidPattern, got {:?}", other),
        }
    }

    #[test]
    fn test_input_precedence() {
        let stub = Stub::try_from(definition(json!({
            "service": "S",
            "method": "M",
            "input": {"matches": {"a": "x"}, "contains": {"a": "x"}},
            "output": {"data": {}}
        })))
        .unwrap();
        assert_eq!(stub.input.kind(), "contains");
    }

    #[test]
    fn test_output_variants() {
        let error = Output::from_definition(&OutputDefinition {
            error: Some("boom".to_string()),
            code: Some(CodeDefinition::Name("INTERNAL".to_string())),
            data: Some(Payload::new()),
        })
        .unwrap();
        assert_eq!(
            error,
            Output::Error {
                message: "boom".to_string(),
                code: Some(StatusCode::INTERNAL),
            }
        );
        assert!(error.is_failure());
        assert_eq!(error.status_code(), StatusCode::INTERNAL);

        let code = Output::from_definition(&OutputDefinition {
            code: Some(CodeDefinition::Number(14)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(code, Output::Code(StatusCode::UNAVAILABLE));

        let bare_error = Output::Error {
            message: "x".to_string(),
            code: None,
        };
        assert_eq!(bare_error.status_code(), StatusCode::UNKNOWN);
    }

    #[test]
    fn test_stub_serializes_as_definition() {
        let def = definition(json!({
            "service": "Greeter",
            "method": "sayHello",
            "input": {"matches": {"name": "^Jo", "age": 30}},
            "output": {"error": "denied", "code": 7}
        }));
        let stub = Stub::try_from(def).unwrap();

        let value = serde_json::to_value(&stub).unwrap();
        assert_eq!(
            value,
            json!({
                "service": "Greeter",
                "method": "Sayhello",
                "input": {"matches": {"age": 30, "name": "^Jo"}},
                "output": {"error": "denied", "code": 7}
            })
        );
    }
}

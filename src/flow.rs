//! Types of the interactive flow protocol: a step gets an optional input map
//! and answers with a form to render or a terminal result.

use serde::Serialize;
use std::collections::BTreeMap;

/// Key of the global error slot on a form
pub const BASE_ERROR: &str = "base";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    User,
    Init,
}

/// Error tags shown to the user
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowError {
    CannotConnect,
    InvalidAuth,
    Unknown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    AlreadyConfigured,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub required: bool,
    /// Write-only field, never sent back with a value
    pub secret: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<String>,
}

impl FormField {
    pub fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            secret: false,
            default: None,
            suggested_value: None,
        }
    }

    pub fn optional(name: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Pre-fill the field, ignored for secret fields
    pub fn with_suggested(mut self, value: Option<&str>) -> Self {
        if !self.secret {
            self.suggested_value = value.map(String::from);
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormView {
    pub step_id: StepId,
    pub data_schema: Vec<FormField>,
    pub errors: BTreeMap<&'static str, FlowError>,
    pub description_placeholders: BTreeMap<&'static str, String>,
}

impl FormView {
    pub fn new(step_id: StepId, data_schema: Vec<FormField>) -> Self {
        Self {
            step_id,
            data_schema,
            errors: BTreeMap::new(),
            description_placeholders: BTreeMap::new(),
        }
    }

    pub fn with_base_error(mut self, error: FlowError) -> Self {
        self.errors.insert(BASE_ERROR, error);
        self
    }

    pub fn with_placeholder(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.description_placeholders.insert(key, value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.data_schema.iter().find(|field| field.name == name)
    }

    pub fn base_error(&self) -> Option<FlowError> {
        self.errors.get(BASE_ERROR).copied()
    }
}

/// Outcome of one flow step
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowResult<T> {
    Form(FormView),
    CreateEntry { title: String, result: T },
    Abort { reason: AbortReason },
}

impl<T> FlowResult<T> {
    pub fn map_result<U>(self, f: impl FnOnce(T) -> U) -> FlowResult<U> {
        match self {
            FlowResult::Form(form) => FlowResult::Form(form),
            FlowResult::CreateEntry { title, result } => FlowResult::CreateEntry {
                title,
                result: f(result),
            },
            FlowResult::Abort { reason } => FlowResult::Abort { reason },
        }
    }
}

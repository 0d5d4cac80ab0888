//! Which optional form fields a model accepts for an operation.
//!
//! The rules live in one static table, [`CAPABILITIES`]. Fields a model does
//! not accept are left out of the form entirely, never sent empty.

/// An upload operation whose request body is a multipart form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `POST /images/edits`
    EditImage,
    /// `POST /images/variations`
    CreateVariation,
}

impl Operation {
    /// Endpoint path, relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Operation::EditImage => "/images/edits",
            Operation::CreateVariation => "/images/variations",
        }
    }

    /// Fields sent for every model, whatever their value.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Operation::EditImage => &[field::IMAGE, field::PROMPT],
            Operation::CreateVariation => &[field::IMAGE],
        }
    }

    /// Whether `field_name` is always sent for this operation.
    pub fn is_required(self, field_name: &str) -> bool {
        self.required_fields().contains(&field_name)
    }
}

/// Form field names used by the image operations.
pub mod field {
    pub const IMAGE: &str = "image";
    pub const MASK: &str = "mask";
    pub const PROMPT: &str = "prompt";
    pub const MODEL: &str = "model";
    pub const N: &str = "n";
    pub const SIZE: &str = "size";
    pub const RESPONSE_FORMAT: &str = "response_format";
    pub const QUALITY: &str = "quality";
    pub const USER: &str = "user";
}

/// Known model identifiers.
pub mod model {
    pub const DALL_E_2: &str = "dall-e-2";
    pub const DALL_E_3: &str = "dall-e-3";
    pub const GPT_IMAGE_1: &str = "gpt-image-1";
}

/// One row of the capability table.
#[derive(Debug)]
pub struct Capability {
    pub operation: Operation,
    /// `None` is the operation's default, used for unlisted models and for
    /// requests naming no model.
    pub model: Option<&'static str>,
    /// Optional fields the model accepts.
    pub fields: &'static [&'static str],
}

impl Capability {
    /// Whether this row accepts the optional field `field_name`.
    pub fn allows(&self, field_name: &str) -> bool {
        self.fields.contains(&field_name)
    }
}

const EDIT_ALL: &[&str] = &[
    field::MASK,
    field::MODEL,
    field::N,
    field::SIZE,
    field::RESPONSE_FORMAT,
    field::QUALITY,
    field::USER,
];

/// Optional fields accepted per operation and model. Each operation has one
/// row with `model: None`.
pub static CAPABILITIES: &[Capability] = &[
    Capability {
        operation: Operation::EditImage,
        model: None,
        fields: EDIT_ALL,
    },
    Capability {
        operation: Operation::EditImage,
        model: Some(model::DALL_E_2),
        fields: EDIT_ALL,
    },
    // Always returns base64 and picks its own quality tier for edits.
    Capability {
        operation: Operation::EditImage,
        model: Some(model::GPT_IMAGE_1),
        fields: &[field::MASK, field::MODEL, field::N, field::SIZE, field::USER],
    },
    Capability {
        operation: Operation::CreateVariation,
        model: None,
        fields: &[field::N, field::SIZE, field::RESPONSE_FORMAT],
    },
];

/// Looks up the row for `model`, falling back to the operation's default row.
pub fn capability(operation: Operation, model: &str) -> &'static Capability {
    let rows = || CAPABILITIES.iter().filter(move |row| row.operation == operation);

    rows()
        .find(|row| !model.is_empty() && row.model == Some(model))
        .or_else(|| rows().find(|row| row.model.is_none()))
        .unwrap_or(&NO_OPTIONAL_FIELDS)
}

static NO_OPTIONAL_FIELDS: Capability = Capability {
    operation: Operation::EditImage,
    model: None,
    fields: &[],
};

/// Decides whether `field_name` with `field_value` belongs in the form.
///
/// Required fields are always included. Optional fields are included only
/// when a value was supplied and the model accepts the field.
pub fn should_include(operation: Operation, model: &str, field_name: &str, field_value: &str) -> bool {
    if operation.is_required(field_name) {
        return true;
    }

    !field_value.is_empty() && capability(operation, model).allows(field_name)
}

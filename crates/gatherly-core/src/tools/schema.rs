//! Field registry and JSON schema generation
//!
//! The source system generated tool schemas by introspecting ORM column
//! metadata at runtime. Here that becomes an explicit static field registry:
//! a table of `{name, type, required}` descriptors per entity, from which
//! tool parameter schemas are built. New fields become tool parameters by
//! adding a descriptor - no schema is written by hand.

use serde_json::{json, Value};

/// JSON-schema-level type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    DateTime,
}

impl FieldType {
    fn json_type(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::DateTime => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }
}

/// One field descriptor in the registry
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub description: &'static str,
}

/// Event entity fields (mirrors the booking system's Event columns)
pub const EVENT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "title",
        field_type: FieldType::String,
        required: true,
        description: "Event title",
    },
    FieldSpec {
        name: "description",
        field_type: FieldType::String,
        required: false,
        description: "Longer event description",
    },
    FieldSpec {
        name: "start_time",
        field_type: FieldType::DateTime,
        required: false,
        description: "Start date and time (ISO-8601)",
    },
    FieldSpec {
        name: "end_time",
        field_type: FieldType::DateTime,
        required: false,
        description: "End date and time (ISO-8601)",
    },
    FieldSpec {
        name: "location",
        field_type: FieldType::String,
        required: false,
        description: "Venue or address",
    },
    FieldSpec {
        name: "capacity",
        field_type: FieldType::Integer,
        required: false,
        description: "Maximum number of attendees",
    },
    FieldSpec {
        name: "cost",
        field_type: FieldType::Number,
        required: false,
        description: "Base cost per attendee",
    },
    FieldSpec {
        name: "min_age",
        field_type: FieldType::Integer,
        required: false,
        description: "Minimum attendee age",
    },
    FieldSpec {
        name: "max_age",
        field_type: FieldType::Integer,
        required: false,
        description: "Maximum attendee age",
    },
    FieldSpec {
        name: "online",
        field_type: FieldType::Boolean,
        required: false,
        description: "Whether the event is held online",
    },
];

/// Ticket type fields
pub const TICKET_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        field_type: FieldType::String,
        required: true,
        description: "Ticket type name (e.g. child, adult)",
    },
    FieldSpec {
        name: "price",
        field_type: FieldType::Number,
        required: true,
        description: "Price in dollars",
    },
    FieldSpec {
        name: "quantity",
        field_type: FieldType::Integer,
        required: false,
        description: "Number of tickets available",
    },
    FieldSpec {
        name: "description",
        field_type: FieldType::String,
        required: false,
        description: "Who this ticket is for",
    },
];

/// Build a JSON schema object from a field list.
pub fn object_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for field in fields {
        let mut spec = json!({
            "type": field.field_type.json_type(),
            "description": field.description,
        });
        if field.field_type == FieldType::DateTime {
            spec["format"] = json!("date-time");
        }
        properties.insert(field.name.to_string(), spec);
        if field.required {
            required.push(json!(field.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Same schema with every field optional (for partial updates).
pub fn partial_schema(fields: &[FieldSpec]) -> Value {
    let mut schema = object_schema(fields);
    schema["required"] = json!([]);
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_schema_has_all_fields() {
        let schema = object_schema(EVENT_FIELDS);
        let properties = schema["properties"].as_object().expect("object");
        assert_eq!(properties.len(), EVENT_FIELDS.len());
        assert_eq!(properties["capacity"]["type"], "integer");
        assert_eq!(properties["start_time"]["format"], "date-time");
        assert_eq!(schema["required"], json!(["title"]));
    }

    #[test]
    fn partial_schema_drops_required() {
        let schema = partial_schema(EVENT_FIELDS);
        assert_eq!(schema["required"], json!([]));
    }

    #[test]
    fn ticket_schema_requires_name_and_price() {
        let schema = object_schema(TICKET_FIELDS);
        assert_eq!(schema["required"], json!(["name", "price"]));
    }
}

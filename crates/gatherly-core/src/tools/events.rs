//! Event draft tools
//!
//! The fixed tool set the model can request. Every tool validates its
//! arguments, writes through the draft store, and returns a `{success}`
//! envelope - errors are results, never panics, so a bad call becomes an
//! observation the agent can react to.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::registry::{parse_params, Tool, ToolContext, ToolRegistry, ToolResult};
use super::schema::{self, EVENT_FIELDS, TICKET_FIELDS};

/// Error message when a ticket/venue/discount tool runs before any draft
pub const NO_DRAFT_MESSAGE: &str =
    "No draft found for this conversation. Create an event draft first.";

/// Keep only keys that are registered event fields.
fn filter_event_fields(params: &Value) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Value::Object(input) = params {
        for spec in EVENT_FIELDS {
            if let Some(value) = input.get(spec.name) {
                if !value.is_null() {
                    fields.insert(spec.name.to_string(), value.clone());
                }
            }
        }
    }
    fields
}

/// Create a new event draft version from scratch.
pub struct CreateEventDraft;

#[async_trait]
impl Tool for CreateEventDraft {
    fn name(&self) -> &str {
        "create_event_draft"
    }

    fn description(&self) -> &str {
        "Create a draft for a new event with a title and any known details"
    }

    fn parameters_schema(&self) -> Value {
        schema::object_schema(EVENT_FIELDS)
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let fields = filter_event_fields(&params);
        let has_title = fields
            .get("title")
            .and_then(|t| t.as_str())
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
        if !has_title {
            return ToolResult::invalid_parameters("Missing required parameter: title");
        }

        match ctx
            .drafts
            .save(&ctx.session_id, Value::Object(fields), vec![], self.name())
        {
            Ok(version) => {
                let current = ctx.drafts.get_current(&ctx.session_id).ok().flatten();
                ToolResult::success(json!({
                    "version": version,
                    "event_data": current.map(|e| e.event_data).unwrap_or(json!({})),
                }))
            }
            Err(e) => ToolResult::error(e),
        }
    }
}

/// Merge partial fields into the current draft.
pub struct UpdateEventDraft;

#[async_trait]
impl Tool for UpdateEventDraft {
    fn name(&self) -> &str {
        "update_event_draft"
    }

    fn description(&self) -> &str {
        "Update fields on the current event draft"
    }

    fn parameters_schema(&self) -> Value {
        schema::partial_schema(EVENT_FIELDS)
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        match ctx.drafts.get_current(&ctx.session_id) {
            Ok(None) => return ToolResult::error_with_code("no_draft", NO_DRAFT_MESSAGE),
            Err(e) => return ToolResult::error(e),
            Ok(Some(_)) => {}
        }

        let fields = filter_event_fields(&params);
        if fields.is_empty() {
            return ToolResult::invalid_parameters("No recognized event fields to update");
        }

        match ctx
            .drafts
            .update(&ctx.session_id, Value::Object(fields), self.name())
        {
            Ok(version) => ToolResult::success(json!({"version": version})),
            Err(e) => ToolResult::error(e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TicketParams {
    name: String,
    price: f64,
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

/// Add a ticket type to the current draft.
pub struct AddTicketType;

#[async_trait]
impl Tool for AddTicketType {
    fn name(&self) -> &str {
        "add_ticket_type"
    }

    fn description(&self) -> &str {
        "Add a named ticket type with a price to the current event draft"
    }

    fn parameters_schema(&self) -> Value {
        schema::object_schema(TICKET_FIELDS)
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let ticket: TicketParams = match parse_params(params) {
            Ok(p) => p,
            Err(result) => return result,
        };

        if ticket.price < 0.0 {
            return ToolResult::invalid_parameters("Ticket price cannot be negative");
        }

        match ctx.drafts.get_current(&ctx.session_id) {
            Ok(None) => return ToolResult::error_with_code("no_draft", NO_DRAFT_MESSAGE),
            Err(e) => return ToolResult::error(e),
            Ok(Some(_)) => {}
        }

        let mut entry = json!({"name": ticket.name, "price": ticket.price});
        if let Some(quantity) = ticket.quantity {
            entry["quantity"] = json!(quantity);
        }
        if let Some(description) = ticket.description {
            entry["description"] = json!(description);
        }

        match ctx.drafts.update(
            &ctx.session_id,
            json!({"tickets": [entry]}),
            self.name(),
        ) {
            Ok(version) => ToolResult::success(json!({
                "version": version,
                "ticket": ticket.name,
            })),
            Err(e) => ToolResult::error(e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VenueParams {
    location: String,
    #[serde(default)]
    address: Option<String>,
}

/// Set the venue on the current draft.
pub struct SetVenue;

#[async_trait]
impl Tool for SetVenue {
    fn name(&self) -> &str {
        "set_venue"
    }

    fn description(&self) -> &str {
        "Set the venue/location for the current event draft"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {"type": "string", "description": "Venue name"},
                "address": {"type": "string", "description": "Street address"},
            },
            "required": ["location"],
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let venue: VenueParams = match parse_params(params) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match ctx.drafts.get_current(&ctx.session_id) {
            Ok(None) => return ToolResult::error_with_code("no_draft", NO_DRAFT_MESSAGE),
            Err(e) => return ToolResult::error(e),
            Ok(Some(_)) => {}
        }

        let location = match venue.address {
            Some(address) => format!("{}, {}", venue.location, address),
            None => venue.location,
        };

        match ctx
            .drafts
            .update(&ctx.session_id, json!({"location": location}), self.name())
        {
            Ok(version) => ToolResult::success(json!({"version": version})),
            Err(e) => ToolResult::error(e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DiscountParams {
    code: String,
    #[serde(default)]
    percent: Option<f64>,
    #[serde(default)]
    amount: Option<f64>,
}

/// Add a discount code to the current draft.
pub struct AddDiscount;

#[async_trait]
impl Tool for AddDiscount {
    fn name(&self) -> &str {
        "add_discount"
    }

    fn description(&self) -> &str {
        "Add a discount code (percent or fixed amount) to the current event draft"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {"type": "string", "description": "Discount code"},
                "percent": {"type": "number", "description": "Percentage off (0-100)"},
                "amount": {"type": "number", "description": "Fixed dollar amount off"},
            },
            "required": ["code"],
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let discount: DiscountParams = match parse_params(params) {
            Ok(p) => p,
            Err(result) => return result,
        };

        if discount.percent.is_none() && discount.amount.is_none() {
            return ToolResult::invalid_parameters("Provide either percent or amount");
        }

        let current = match ctx.drafts.get_current(&ctx.session_id) {
            Ok(None) => return ToolResult::error_with_code("no_draft", NO_DRAFT_MESSAGE),
            Err(e) => return ToolResult::error(e),
            Ok(Some(entry)) => entry,
        };

        let mut discounts = current
            .event_data
            .get("discounts")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        let code_lower = discount.code.to_lowercase();
        let exists = discounts.iter().any(|d| {
            d.get("code")
                .and_then(|c| c.as_str())
                .is_some_and(|c| c.to_lowercase() == code_lower)
        });
        if exists {
            return ToolResult::error_with_code(
                "duplicate_discount",
                format!("Discount code '{}' already exists", discount.code),
            );
        }

        let mut entry = json!({"code": discount.code});
        if let Some(percent) = discount.percent {
            entry["percent"] = json!(percent);
        }
        if let Some(amount) = discount.amount {
            entry["amount"] = json!(amount);
        }
        discounts.push(entry);

        match ctx.drafts.update(
            &ctx.session_id,
            json!({"discounts": discounts}),
            self.name(),
        ) {
            Ok(version) => ToolResult::success(json!({"version": version})),
            Err(e) => ToolResult::error(e),
        }
    }
}

/// Read-only view of the current draft.
pub struct GetEventDraft;

#[async_trait]
impl Tool for GetEventDraft {
    fn name(&self) -> &str {
        "get_event_draft"
    }

    fn description(&self) -> &str {
        "Get the current event draft, if one exists"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> ToolResult {
        match ctx.drafts.get_current(&ctx.session_id) {
            Ok(Some(entry)) => ToolResult::success(json!({
                "draft": {
                    "event_data": entry.event_data,
                    "tickets": entry.tickets,
                    "version": entry.version,
                }
            })),
            Ok(None) => ToolResult::success(json!({"draft": null})),
            Err(e) => ToolResult::error(e),
        }
    }
}

/// Build a registry with the full event tool set.
pub async fn event_tool_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(std::sync::Arc::new(CreateEventDraft)).await;
    registry.register(std::sync::Arc::new(UpdateEventDraft)).await;
    registry.register(std::sync::Arc::new(AddTicketType)).await;
    registry.register(std::sync::Arc::new(SetVenue)).await;
    registry.register(std::sync::Arc::new(AddDiscount)).await;
    registry.register(std::sync::Arc::new(GetEventDraft)).await;
    registry
}

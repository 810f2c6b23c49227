//! Hotel concierge tool catalog.
//!
//! Every room-scoped request takes `room_number` as a required parameter so
//! the model has to ask the guest for it instead of assuming one.

use crate::error::DuplicateToolError;
use crate::tool::{ParamSpec, ParamType, ToolRegistry, ToolSpec};

const ROOM_NUMBER_DESCRIPTION: &str =
    "The guest's room number. Ask the guest for it; never assume a value.";

fn room_number() -> ParamSpec {
    ParamSpec::required("room_number", ParamType::Integer, ROOM_NUMBER_DESCRIPTION)
}

fn text(name: &str, description: &str) -> ParamSpec {
    ParamSpec::required(name, ParamType::String, description)
}

/// Builds the registry of hotel concierge tools in their canonical order.
///
/// # Errors
///
/// Returns [`DuplicateToolError`] if two declarations share a name.
pub fn hotel_concierge_tools() -> Result<ToolRegistry, DuplicateToolError> {
    let mut registry = ToolRegistry::new();
    for spec in declarations() {
        registry.register(spec)?;
    }
    Ok(registry)
}

fn declarations() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "get_current_temperature",
            "Fetch the current weather for given cities or coordinates. \
             For example: what is the weather in Colombo?",
        )
        .with_param(ParamSpec::required(
            "latitude",
            ParamType::Number,
            "Latitude of the location to fetch weather data for",
        ))
        .with_param(ParamSpec::required(
            "longitude",
            ParamType::Number,
            "Longitude of the location to fetch weather data for",
        )),
        ToolSpec::new("book_room", "Book a room with the specified details.")
            .with_param(text(
                "room_type",
                "Which type of room: AC or Non-AC. Input from user",
            ))
            .with_param(text(
                "class_type",
                "Which class of room: Business class or Economic class. Input from user",
            ))
            .with_param(ParamSpec::required(
                "check_in_date",
                ParamType::Date,
                "The date the guest will check in. Input from user",
            ))
            .with_param(ParamSpec::required(
                "check_out_date",
                ParamType::Date,
                "The date the guest will check out. Input from user",
            ))
            .with_param(text(
                "mobile_no",
                "Mobile number of the guest. Input from user",
            )),
        ToolSpec::new(
            "order_restaurant_item",
            "Order food and beverages at the hotel restaurant with the specified details.",
        )
        .with_param(text(
            "item_name",
            "The food item the guest wants to order from the restaurant",
        ))
        .with_param(text(
            "dine_in_type",
            "Where the guest will eat. One of 'dine-in-room', 'dine-in-restaurant', 'parcel'",
        ))
        .with_param(room_number()),
        ToolSpec::new(
            "bill_complaint_request",
            "Complaints about billing with the specified details.",
        )
        .with_param(text(
            "complaint",
            "Complaint about the bill, for example the bill is higher than it should be \
             or a service was overcharged",
        ))
        .with_param(room_number()),
        ToolSpec::new(
            "restaurant_information",
            "Information related to the restaurant of the hotel.",
        )
        .with_param(text("subject", "The subject the guest wants to know about")),
        ToolSpec::new(
            "hotel_information_request",
            "Information related to the residential hotel.",
        )
        .with_param(text("subject", "The subject the guest wants to know about")),
        ToolSpec::new(
            "emergency_concierge_request",
            "Emergency safety call for help with the specified details.",
        )
        .with_param(text(
            "location",
            "Location of the emergency. Example: garage, lobby, plinth at 6th floor, \
             balcony of room, dining room",
        ))
        .with_param(ParamSpec::optional(
            "room_number",
            ParamType::Integer,
            "The room number the call is made from, if the guest states it",
        )),
        ToolSpec::new(
            "excursion_recommendation",
            "Suggest nice places to visit nearby with the specified details.",
        )
        .with_param(text(
            "place_type",
            "The type of place the guest wants to visit. Example: park, zoo, pool. \
             Always ask for this value",
        )),
        ToolSpec::new(
            "transportation_recommendation",
            "Recommend transportation to a destination.",
        )
        .with_param(text("location", "The place the guest wants to visit")),
        ToolSpec::new(
            "food_recommendation",
            "Recommend food from the restaurant suited to the guest and the weather.",
        )
        .with_param(text(
            "cuisine",
            "The type of cuisine the guest wants to eat, like Chinese, Indian, Italian. \
             Take input from user",
        )),
        ToolSpec::new(
            "room_recommendation",
            "Room recommendation for the guest with the specified details.",
        )
        .with_param(ParamSpec::required(
            "budget_highest",
            ParamType::Integer,
            "Maximum rent the guest can pay per day for a room. Take input from user",
        )),
        ToolSpec::new(
            "housekeeping_service_request",
            "Provide housekeeping service to the hotel room.",
        )
        .with_param(room_number()),
        ToolSpec::new(
            "request_room_maintenance",
            "Resolve room issues regarding hardware like toiletries, furniture, windows \
             or electric gadgets like fan, TV, AC of the hotel room.",
        )
        .with_param(text(
            "issue",
            "The issue for which the room needs maintenance service",
        ))
        .with_param(room_number()),
        ToolSpec::new(
            "request_miscellaneous",
            "Other requests that can be served by ordinary staff.",
        )
        .with_param(text("request", "The service the guest wants"))
        .with_param(room_number()),
        ToolSpec::new(
            "request_reminder",
            "Set an alarm to remind the guest about a message at the mentioned time.",
        )
        .with_param(text("reminder_message", "The reminder message of the guest"))
        .with_param(text("reminder_time", "The time to remind the guest at"))
        .with_param(room_number()),
        ToolSpec::new("request_wakeup", "Set an alarm to wake the guest up.")
            .with_param(text("wakeup_time", "The time to wake the guest at"))
            .with_param(room_number()),
        ToolSpec::new(
            "check_stock_availability",
            "Check the amount of stock of an item in the warehouse.",
        )
        .with_param(text(
            "stock_of",
            "The item the guest wants to know the availability of. Take input from user",
        ))
        .with_param(ParamSpec::optional(
            "query_date",
            ParamType::Date,
            "The date the guest wants to know the stock for. Omit for today",
        )),
        ToolSpec::new("check_status_request", "Check the status of a request.")
            .with_param(text("request_type", "The type of request of the guest"))
            .with_param(room_number()),
        ToolSpec::new(
            "shuttle_service_request",
            "Book a shuttle service that picks up or drops off the guest.",
        )
        .with_param(text(
            "location",
            "The location where the guest will be picked up",
        ))
        .with_param(text("time", "The exact time of pickup or drop off")),
        ToolSpec::new(
            "request_room_amenity",
            "Request room amenities like an extra towel, pillow or blanket.",
        )
        .with_param(text(
            "requested_amenity",
            "The amenity the guest wants. Example: extra towel, extra pillow, extra blanket. \
             Take input from user",
        ))
        .with_param(room_number()),
    ]
}

//! Built-in invitation content types

use crate::descriptor::{InverseMapping, TypeDescriptor};
use serde_json::json;

pub fn descriptors() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::new("hero", "Hero")
            .with_default("title", "You're invited")
            .with_default("subtitle", "")
            .with_default("image", json!(null)),
        TypeDescriptor::new("text", "Text")
            .with_default("body", "")
            .with_default("align", "center"),
        TypeDescriptor::new("countdown", "Countdown")
            .with_default("target", json!(null))
            .with_default("label", "Until the big day")
            .with_default("showSeconds", false),
        TypeDescriptor::new("rsvp", "RSVP")
            .with_default("title", "Will you join us?")
            .with_default("deadline", json!(null))
            .with_default("allowPlusOne", true),
        TypeDescriptor::new("gallery", "Gallery")
            .with_default("images", json!([]))
            .with_default("layout", "grid"),
        TypeDescriptor::new("map", "Map")
            .with_default("address", "")
            .with_default("zoom", 15),
        TypeDescriptor::new("schedule", "Schedule").with_default("items", json!([])),
        TypeDescriptor::new("divider", "Divider").with_default("variant", "line"),
        TypeDescriptor::new("music", "Background music")
            .with_default("src", json!(null))
            .with_default("autoplay", false),
        TypeDescriptor::new("dress-code", "Dress code")
            .with_default("title", "Dress code")
            .with_default("body", ""),
        // Free-canvas types
        TypeDescriptor::new("free-text", "Free text")
            .free_only()
            .with_default("text", "")
            .with_inverse(InverseMapping::to("text").rename("text", "body")),
        TypeDescriptor::new("shape", "Shape")
            .free_only()
            .with_default("shape", "rectangle")
            .with_default("fill", "#ffffff"),
        TypeDescriptor::new("sticker", "Sticker")
            .free_only()
            .with_default("emoji", "💌"),
    ]
}

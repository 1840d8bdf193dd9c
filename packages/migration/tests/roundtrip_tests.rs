//! Conversion properties across both directions

use invitation_migration::{
    decode_payload, detect_mode, free_to_linear, linear_to_free, migrate, MigrationPolicy,
};
use invitation_model::{Block, Content, Element, FieldMap, Mode, Position, Section};
use invitation_registry::TypeRegistry;
use serde_json::json;

fn block(id: &str, kind: &str, order: u32, field: &str, value: serde_json::Value) -> Block {
    let mut content = FieldMap::new();
    content.insert(field.into(), value);
    Block::new(id, kind, order, content)
}

fn wedding_blocks() -> Vec<Block> {
    vec![
        block("b-1", "hero", 0, "title", json!("Ana & Luis")),
        block("b-2", "countdown", 1, "target", json!("2027-05-01T16:00:00Z")),
        block("b-3", "rsvp", 2, "deadline", json!("2027-04-01")),
    ]
}

#[test]
fn test_linear_free_linear_is_identity() {
    let registry = TypeRegistry::builtin();
    let blocks = wedding_blocks();

    let free = linear_to_free(&blocks, &registry);
    assert!(!free.requires_confirmation);
    assert_eq!(free.output.len(), 3);

    let back = free_to_linear(&free.output, &registry, MigrationPolicy::Strict);
    assert!(!back.requires_confirmation);
    assert!(back.dropped.is_empty());
    assert_eq!(back.output, blocks);
}

#[test]
fn test_linear_to_free_is_deterministic() {
    let registry = TypeRegistry::builtin();
    let blocks = wedding_blocks();

    let first = linear_to_free(&blocks, &registry);
    let second = linear_to_free(&blocks, &registry);
    assert_eq!(first, second);
}

#[test]
fn test_free_to_linear_is_idempotent_after_first_pass() {
    let registry = TypeRegistry::builtin();
    let sections = vec![Section {
        id: "s".into(),
        order: 0,
        background: FieldMap::new(),
        elements: vec![
            Element {
                id: "e2".into(),
                kind: "text".into(),
                position: Position::Absolute { x: 0.0, y: 200.0, width: 10.0, height: 10.0 },
                z_index: 0,
                content: FieldMap::new(),
                style: FieldMap::new(),
                locked: false,
                hidden: false,
                revision: 3,
            },
            Element {
                id: "e1".into(),
                kind: "hero".into(),
                position: Position::Absolute { x: 0.0, y: 0.0, width: 10.0, height: 10.0 },
                z_index: 1,
                content: FieldMap::new(),
                style: FieldMap::new(),
                locked: false,
                hidden: false,
                revision: 1,
            },
        ],
    }];

    let once = free_to_linear(&sections, &registry, MigrationPolicy::Strict).output;
    let refreed = linear_to_free(&once, &registry).output;
    let twice = free_to_linear(&refreed, &registry, MigrationPolicy::Strict).output;

    assert_eq!(once, twice);
    assert_eq!(once[0].id, "e1");
    assert_eq!(once[1].revision, 3);
}

#[test]
fn test_persisted_free_payload_is_detected_after_conversion() {
    let registry = TypeRegistry::builtin();
    let free = migrate(
        &Content::Linear(wedding_blocks()),
        Mode::Free,
        &registry,
        MigrationPolicy::Strict,
    )
    .output;

    let payload = free.to_payload();
    assert_eq!(detect_mode(&payload), Mode::Free);
    assert_eq!(decode_payload(payload).unwrap(), free);

    let linear_payload = Content::Linear(wedding_blocks()).to_payload();
    assert_eq!(detect_mode(&linear_payload), Mode::Linear);
}

#[test]
fn test_strict_and_tolerant_agree_on_output() {
    let registry = TypeRegistry::builtin();
    let mut free = linear_to_free(&wedding_blocks(), &registry).output;
    free[1].elements.push(Element {
        id: "sticker-1".into(),
        kind: "sticker".into(),
        position: Position::Absolute { x: 40.0, y: 40.0, width: 32.0, height: 32.0 },
        z_index: 2,
        content: FieldMap::new(),
        style: FieldMap::new(),
        locked: true,
        hidden: false,
        revision: 0,
    });

    let strict = free_to_linear(&free, &registry, MigrationPolicy::Strict);
    let tolerant = free_to_linear(&free, &registry, MigrationPolicy::Tolerant);

    assert!(strict.requires_confirmation);
    assert!(!tolerant.requires_confirmation);
    assert_eq!(strict.output, tolerant.output);
    assert_eq!(strict.output, wedding_blocks());
    assert_eq!(strict.dropped.len(), 1);
    assert_eq!(strict.dropped[0].section_id, "section-b-2");
}

#[test]
fn test_unknown_types_survive_both_directions() {
    let registry = TypeRegistry::builtin();
    let blocks = vec![
        block("b-1", "hero", 0, "title", json!("Hi")),
        block("b-2", "guestbook-v2", 1, "entries", json!([1, 2, 3])),
    ];

    let free = linear_to_free(&blocks, &registry);
    assert_eq!(free.warnings.len(), 1);

    let back = free_to_linear(&free.output, &registry, MigrationPolicy::Strict);
    assert_eq!(back.output, blocks);
    assert!(!back.requires_confirmation);
}

//! # Linear ⇄ Free Conversion
//!
//! ## linear → free
//! Each block becomes a section holding a single element. Nothing is
//! measured: the element is placed in vertical auto-flow at the block's
//! order, so the transform is pure and deterministic. Ids are derived from
//! the block id (element id = block id, section id = `section-<block id>`),
//! which lets the reverse direction restore the original blocks exactly.
//!
//! ## free → linear
//! Elements are flattened into reading order:
//!
//! ```text
//! section order → vertical position → horizontal position → flattened index
//! ```
//!
//! and mapped back through the registry. Free-only types either follow their
//! inverse mapping or are dropped (tolerant) / reported (strict).

use crate::report::{DroppedItem, MigrationPolicy, MigrationReport, MigrationWarning};
use invitation_model::{Block, Content, Element, FieldMap, Mode, Position, Section};
use invitation_registry::{Availability, TypeLookup, TypeRegistry};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

const SECTION_PREFIX: &str = "section-";

/// Convert content to the target mode; same-mode input is returned as-is
pub fn migrate(
    content: &Content,
    target: Mode,
    registry: &TypeRegistry,
    policy: MigrationPolicy,
) -> MigrationReport<Content> {
    match (content, target) {
        (Content::Linear(blocks), Mode::Free) => {
            linear_to_free(blocks, registry).map(Content::Free)
        }
        (Content::Free(sections), Mode::Linear) => {
            free_to_linear(sections, registry, policy).map(Content::Linear)
        }
        (content, _) => MigrationReport::clean(content.clone()),
    }
}

/// One section with one auto-flow element per block, in block order
#[instrument(skip_all, fields(blocks = blocks.len()))]
pub fn linear_to_free(blocks: &[Block], registry: &TypeRegistry) -> MigrationReport<Vec<Section>> {
    let mut ordered: Vec<&Block> = blocks.iter().collect();
    ordered.sort_by_key(|b| b.order);

    let mut taken: HashSet<String> = blocks.iter().map(|b| b.id.clone()).collect();
    let mut warnings = Vec::new();
    let sections = ordered
        .into_iter()
        .enumerate()
        .map(|(index, block)| {
            if let TypeLookup::Unknown(kind) = registry.lookup(&block.kind) {
                warnings.push(MigrationWarning::UnknownType {
                    id: block.id.clone(),
                    kind: kind.to_string(),
                });
            }

            let slot = index as u32;
            Section {
                id: section_id(&block.id, &mut taken),
                order: slot,
                background: FieldMap::new(),
                elements: vec![Element {
                    id: block.id.clone(),
                    kind: block.kind.clone(),
                    position: Position::Flow { slot },
                    z_index: 0,
                    content: block.content.clone(),
                    style: block.style.clone(),
                    locked: false,
                    hidden: !block.visible,
                    revision: block.revision,
                }],
            }
        })
        .collect::<Vec<_>>();

    debug!(sections = sections.len(), "converted linear document to free");

    MigrationReport {
        output: sections,
        dropped: Vec::new(),
        warnings,
        requires_confirmation: false,
    }
}

/// `section-<block id>`, suffixed when a block or earlier section already
/// owns that id
fn section_id(block_id: &str, taken: &mut HashSet<String>) -> String {
    let base = format!("{}{}", SECTION_PREFIX, block_id);
    let mut id = base.clone();
    let mut n = 2;
    while taken.contains(&id) {
        id = format!("{}-{}", base, n);
        n += 1;
    }
    taken.insert(id.clone());
    id
}

/// Element with the keys that decide its reading order
struct Placed<'a> {
    section: &'a Section,
    element: &'a Element,
    vertical: f64,
    horizontal: f64,
    index: usize,
}

fn reading_order(a: &Placed<'_>, b: &Placed<'_>) -> Ordering {
    a.section
        .order
        .cmp(&b.section.order)
        .then_with(|| a.vertical.total_cmp(&b.vertical))
        .then_with(|| a.horizontal.total_cmp(&b.horizontal))
        .then_with(|| a.index.cmp(&b.index))
}

/// Flatten sections into blocks in reading order
#[instrument(skip_all, fields(sections = sections.len(), policy = ?policy))]
pub fn free_to_linear(
    sections: &[Section],
    registry: &TypeRegistry,
    policy: MigrationPolicy,
) -> MigrationReport<Vec<Block>> {
    let mut placed: Vec<Placed<'_>> = sections
        .iter()
        .flat_map(|section| section.elements.iter().map(move |element| (section, element)))
        .enumerate()
        .map(|(index, (section, element))| {
            let (vertical, horizontal) = element.position.reading_key();
            Placed {
                section,
                element,
                vertical,
                horizontal,
                index,
            }
        })
        .collect();
    placed.sort_by(reading_order);

    let mut warnings = Vec::new();
    let mut dropped = Vec::new();
    let mut blocks = Vec::new();

    for section in sections {
        if !section.background.is_empty() {
            warnings.push(MigrationWarning::BackgroundDiscarded {
                section_id: section.id.clone(),
            });
        }
    }

    for item in placed {
        let element = item.element;

        let (kind, content) = match registry.lookup(&element.kind) {
            TypeLookup::Known(descriptor) => match (&descriptor.availability, &descriptor.inverse) {
                (Availability::Both, _) => (element.kind.clone(), element.content.clone()),
                (Availability::FreeOnly, Some(inverse)) => {
                    let mapped = inverse.map_content(&element.content);
                    for (field, displaced) in mapped.displaced {
                        warn!(id = %element.id, %field, "mapped field replaced an existing value");
                        warnings.push(MigrationWarning::FieldOverwritten {
                            id: element.id.clone(),
                            field,
                            displaced,
                        });
                    }
                    (inverse.target.clone(), mapped.content)
                }
                (Availability::FreeOnly, None) => {
                    dropped.push(DroppedItem {
                        id: element.id.clone(),
                        kind: element.kind.clone(),
                        section_id: item.section.id.clone(),
                    });
                    warnings.push(MigrationWarning::Dropped {
                        id: element.id.clone(),
                        kind: element.kind.clone(),
                    });
                    continue;
                }
            },
            TypeLookup::Unknown(kind) => {
                warnings.push(MigrationWarning::UnknownType {
                    id: element.id.clone(),
                    kind: kind.to_string(),
                });
                (element.kind.clone(), element.content.clone())
            }
        };

        if !element.position.is_flow() {
            warnings.push(MigrationWarning::GeometryDiscarded {
                id: element.id.clone(),
            });
        }
        if element.locked {
            warnings.push(MigrationWarning::LockDiscarded {
                id: element.id.clone(),
            });
        }

        blocks.push(Block {
            id: element.id.clone(),
            kind,
            order: blocks.len() as u32,
            visible: !element.hidden,
            content,
            style: element.style.clone(),
            revision: element.revision,
        });
    }

    let requires_confirmation = policy == MigrationPolicy::Strict && !dropped.is_empty();
    if requires_confirmation {
        info!(dropped = dropped.len(), "conversion needs confirmation before dropping items");
    } else {
        for item in &dropped {
            warn!(id = %item.id, kind = %item.kind, "dropping free-only element");
        }
    }

    debug!(blocks = blocks.len(), warnings = warnings.len(), "converted free document to linear");

    MigrationReport {
        output: blocks,
        dropped,
        warnings,
        requires_confirmation,
    }
}

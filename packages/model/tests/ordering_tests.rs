//! Ordering stability across long mutation sequences
//!
//! After any mix of add/remove/reorder, block orders must stay unique and
//! strictly increasing (dense 0..n), and ids must never repeat.

use invitation_model::{BlockPatch, Document, FieldMap};
use std::collections::HashSet;

fn assert_dense(doc: &Document) {
    let blocks = doc.blocks().unwrap();
    for (index, block) in blocks.iter().enumerate() {
        assert_eq!(block.order, index as u32, "block {} out of order", block.id);
    }
    doc.check_invariants().unwrap();
}

#[test]
fn test_mixed_sequence_keeps_orders_dense() {
    let mut doc = Document::new("inv-ordering", "event-1");
    let mut issued = HashSet::new();

    for round in 0..20 {
        let id = doc.add_block("text", FieldMap::new()).unwrap();
        assert!(issued.insert(id.clone()), "id {} reissued", id);
        assert_dense(&doc);

        if round % 3 == 0 {
            let first = doc.blocks().unwrap()[0].id.clone();
            doc.remove_block(&first).unwrap();
            assert_dense(&doc);
        }

        if round % 4 == 0 {
            let mut ids: Vec<String> = doc.blocks().unwrap().iter().map(|b| b.id.clone()).collect();
            ids.reverse();
            doc.reorder_blocks(&ids).unwrap();
            assert_dense(&doc);

            let after: Vec<String> = doc.blocks().unwrap().iter().map(|b| b.id.clone()).collect();
            assert_eq!(after, ids);
        }
    }
}

#[test]
fn test_patch_does_not_move_blocks() {
    let mut doc = Document::new("inv-ordering", "event-1");
    let ids: Vec<String> = (0..4)
        .map(|_| doc.add_block("text", FieldMap::new()).unwrap())
        .collect();

    doc.patch_block(&ids[2], &BlockPatch::content("body", "changed"))
        .unwrap();
    doc.patch_block(&ids[0], &BlockPatch::visibility(false)).unwrap();

    let order: Vec<String> = doc.blocks().unwrap().iter().map(|b| b.id.clone()).collect();
    assert_eq!(order, ids);
    assert_dense(&doc);
}

#[test]
fn test_failed_mutations_leave_document_unchanged() {
    let mut doc = Document::new("inv-ordering", "event-1");
    let a = doc.add_block("text", FieldMap::new()).unwrap();
    let snapshot = doc.clone();

    assert!(doc.remove_block("missing").is_err());
    assert!(doc.reorder_blocks(&[a.clone(), a.clone()]).is_err());
    assert!(doc.patch_block("missing", &BlockPatch::visibility(false)).is_err());
    assert!(doc.add_section(FieldMap::new()).is_err());

    assert_eq!(doc, snapshot);
}

use rustc_hash::FxHashSet;

use crate::foundation::Foundation;
use crate::graph::{ClassId, Lang};

/// Refreshes `class_id`'s cached [`Class::hierarchy`](crate::graph::Class::hierarchy)
/// if it is stale with respect to the current global epoch, recursing into
/// superclasses first so their own cache is current before we concatenate.
pub fn ensure_hierarchy<L: Lang>(foundation: &mut Foundation<L>, class_id: ClassId) {
    let current_epoch = foundation.epoch();
    let stale = foundation
        .classes()
        .get(class_id)
        .map(|class| class.hierarchy_epoch != current_epoch)
        .unwrap_or(false);
    if stale {
        rebuild_hierarchy(foundation, class_id);
    }
}

fn rebuild_hierarchy<L: Lang>(foundation: &mut Foundation<L>, class_id: ClassId) {
    let superclasses = foundation.classes()[class_id].superclasses.clone();

    let hierarchy = match superclasses.as_slice() {
        [] => Vec::new(),
        [only] => {
            ensure_hierarchy(foundation, *only);
            let mut hierarchy = Vec::with_capacity(1 + foundation.classes()[*only].hierarchy.len());
            hierarchy.push(*only);
            hierarchy.extend(foundation.classes()[*only].hierarchy.iter().copied());
            hierarchy
        }
        many => {
            let mut flat = Vec::new();
            for sup in many {
                ensure_hierarchy(foundation, *sup);
                flat.push(*sup);
                flat.extend(foundation.classes()[*sup].hierarchy.iter().copied());
            }
            dedup_last_occurrence_wins(&mut flat);
            flat
        }
    };

    let epoch = foundation.epoch();
    let class = foundation
        .classes
        .get_mut(class_id)
        .expect("class_id must resolve while rebuilding its own hierarchy");
    class.hierarchy = hierarchy;
    class.hierarchy_epoch = epoch;
}

/// Right-to-left scan keeping only each id's last occurrence, preserving the
/// original left-to-right order of the survivors (§4.2 step 3).
fn dedup_last_occurrence_wins(list: &mut Vec<ClassId>) {
    let mut seen = FxHashSet::default();
    let mut keep = vec![false; list.len()];
    for i in (0..list.len()).rev() {
        keep[i] = seen.insert(list[i]);
    }
    let mut idx = 0;
    list.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}

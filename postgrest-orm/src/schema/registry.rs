//! Process-wide cache of validated type descriptors.
//!
//! Descriptors are built on first use. Construction walks every type reachable
//! through reference edges with a worklist, so mutually referring types never
//! recurse. Nothing is published until the whole reachable set is built. The
//! lock is only held to publish; construction runs outside it, and a thread
//! that loses the race to publish adopts the winner's descriptor.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use super::{Model, ModelKey, TypeDescriptor};
use crate::error::SchemaError;

type Slot = Result<Arc<TypeDescriptor>, SchemaError>;

static DESCRIPTORS: Lazy<RwLock<HashMap<TypeId, Slot>>> = Lazy::new(Default::default);

/// Descriptor for `M`, building and caching it (and every type it can reach)
/// on first use. Failures are cached too.
pub fn describe<M: Model>() -> Result<Arc<TypeDescriptor>, SchemaError> {
    describe_key(&ModelKey::of::<M>())
}

pub fn describe_key(key: &ModelKey) -> Result<Arc<TypeDescriptor>, SchemaError> {
    if let Some(slot) = cached(key.type_id()) {
        return slot;
    }

    let (root, reachable) = construct(key);

    let mut cache = DESCRIPTORS.write();
    for (type_id, slot) in reachable {
        cache.entry(type_id).or_insert(slot);
    }
    cache.entry(key.type_id()).or_insert(root).clone()
}

fn cached(type_id: TypeId) -> Option<Slot> {
    DESCRIPTORS.read().get(&type_id).cloned()
}

/// Outcome of one type during construction.
enum Pending {
    /// Discovered, definition not yet validated
    Placeholder,
    Built(Result<TypeDescriptor, SchemaError>),
}

/// Build the root and every uncached type it reaches. Returns the root slot
/// separately from the rest.
fn construct(root: &ModelKey) -> (Slot, Vec<(TypeId, Slot)>) {
    let mut arena: HashMap<TypeId, Pending> = HashMap::new();
    let mut order: Vec<TypeId> = Vec::new();
    let mut worklist = vec![*root];

    while let Some(key) = worklist.pop() {
        let type_id = key.type_id();
        if arena.contains_key(&type_id) || cached(type_id).is_some() {
            continue;
        }
        arena.insert(type_id, Pending::Placeholder);
        order.push(type_id);

        let built = TypeDescriptor::from_definition(key, key.definition());
        if let Ok(descriptor) = &built {
            worklist.extend(descriptor.references().iter().map(|r| r.target));
        }
        arena.insert(type_id, Pending::Built(built));
    }

    // a type is unusable when anything it reaches is
    loop {
        let mut failed = Vec::new();
        for type_id in &order {
            let Some(Pending::Built(Ok(descriptor))) = arena.get(type_id) else {
                continue;
            };
            let broken = descriptor.references().iter().find_map(|reference| {
                target_error(&arena, &reference.target).map(|reason| SchemaError::InvalidTarget {
                    table: descriptor.table().to_string(),
                    edge: reference.name.clone(),
                    reason: Box::new(reason),
                })
            });
            if let Some(error) = broken {
                failed.push((*type_id, error));
            }
        }
        if failed.is_empty() {
            break;
        }
        for (type_id, error) in failed {
            arena.insert(type_id, Pending::Built(Err(error)));
        }
    }

    let mut root_slot = None;
    let mut reachable = Vec::with_capacity(order.len());
    for type_id in order {
        let slot: Slot = match arena.remove(&type_id) {
            Some(Pending::Built(Ok(descriptor))) => {
                debug!(
                    model = descriptor.model_name(),
                    table = %descriptor.table(),
                    columns = descriptor.columns().len(),
                    references = descriptor.references().len(),
                    "Registered type descriptor"
                );
                Ok(Arc::new(descriptor))
            }
            Some(Pending::Built(Err(error))) => {
                debug!(error = %error, "Type descriptor rejected");
                Err(error)
            }
            // every discovered key is built before the worklist drains
            Some(Pending::Placeholder) | None => continue,
        };
        if type_id == root.type_id() {
            root_slot = Some(slot);
        } else {
            reachable.push((type_id, slot));
        }
    }

    // the root was cached by another thread while we were building
    let root_slot = root_slot
        .or_else(|| cached(root.type_id()))
        .unwrap_or_else(|| {
            TypeDescriptor::from_definition(*root, root.definition()).map(Arc::new)
        });

    (root_slot, reachable)
}

fn target_error(arena: &HashMap<TypeId, Pending>, target: &ModelKey) -> Option<SchemaError> {
    match arena.get(&target.type_id()) {
        Some(Pending::Built(Err(error))) => Some(error.clone()),
        Some(_) => None,
        None => cached(target.type_id()).and_then(Result::err),
    }
}

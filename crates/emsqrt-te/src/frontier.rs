//! Bounded-frontier estimation for a TE block order.
//!
//! Given each block's dependencies, compute the maximum number of blocks
//! that must be simultaneously "live" (produced but not yet fully consumed)
//! if blocks execute in the given order. This is advisory — it is reported
//! on `TePlan` for the exec runtime's own memory accounting, not enforced
//! by `tree_eval` itself.

use std::collections::HashMap;

use emsqrt_core::id::BlockId;

pub fn compute_max_frontier(order: &[(BlockId, Vec<BlockId>)]) -> usize {
    // remaining[id] = number of not-yet-executed blocks that still depend on id.
    let mut remaining: HashMap<u64, usize> = HashMap::new();
    for (_, deps) in order {
        for dep in deps {
            *remaining.entry(dep.get()).or_insert(0) += 1;
        }
    }

    let mut live: HashMap<u64, usize> = HashMap::new();
    let mut max_frontier = 0usize;

    for (id, deps) in order {
        for dep in deps {
            if let Some(count) = live.get_mut(&dep.get()) {
                *count -= 1;
                if *count == 0 {
                    live.remove(&dep.get());
                }
            }
        }
        live.insert(id.get(), *remaining.get(&id.get()).unwrap_or(&0));
        max_frontier = max_frontier.max(live.len());
    }

    max_frontier
}

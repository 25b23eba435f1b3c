/// Property-based tests for registration and disambiguation
///
/// These tests use proptest to generate candidate sets and startup plans and
/// check the container against a small reference model.
use ferrous_wire::{Container, Context, DiError, Resolver};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Candidate {
    index: usize,
}

#[derive(Debug, Clone, Copy)]
struct Flags {
    primary: bool,
    alternative: bool,
    priority: i32,
}

fn flags() -> impl Strategy<Value = Flags> {
    (any::<bool>(), any::<bool>(), -3i32..3).prop_map(|(primary, alternative, priority)| Flags {
        primary,
        alternative,
        priority,
    })
}

/// Expected winner, or `None` when the set is ambiguous.
fn expected_winner(all: &[Flags]) -> Option<usize> {
    let mut remaining: Vec<usize> = (0..all.len()).collect();
    if remaining.len() == 1 {
        return Some(0);
    }
    if remaining.iter().any(|&i| all[i].primary) {
        remaining.retain(|&i| all[i].primary);
    }
    if remaining.len() == 1 {
        return Some(remaining[0]);
    }
    if remaining.iter().any(|&i| !all[i].alternative) {
        remaining.retain(|&i| !all[i].alternative);
    }
    if remaining.len() == 1 {
        return Some(remaining[0]);
    }
    let lowest = remaining.iter().map(|&i| all[i].priority).min()?;
    let best: Vec<usize> = remaining.into_iter().filter(|&i| all[i].priority == lowest).collect();
    match best.as_slice() {
        [winner] => Some(*winner),
        _ => None,
    }
}

proptest! {
    #[test]
    fn disambiguation_matches_model(candidates in prop::collection::vec(flags(), 1..8)) {
        let container = Container::new();
        for (index, f) in candidates.iter().enumerate() {
            let builder = container.factory(move || Arc::new(Candidate { index })).priority(f.priority);
            let builder = if f.primary { builder.primary() } else { builder };
            let builder = if f.alternative { builder.alternative() } else { builder };
            builder.register().unwrap();
        }

        let resolved = container.get::<Candidate>(&Context::background());
        match expected_winner(&candidates) {
            Some(winner) => prop_assert_eq!(resolved.unwrap().index, winner),
            None => prop_assert!(matches!(resolved, Err(DiError::ManyCandidatesFound(_)))),
        }
    }
}

proptest! {
    #[test]
    fn registration_order_does_not_change_winner(
        candidates in prop::collection::vec(flags(), 1..6),
        seed in any::<u64>(),
    ) {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        // deterministic shuffle
        let mut state = seed | 1;
        for i in (1..order.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            order.swap(i, (state % (i as u64 + 1)) as usize);
        }

        let resolve = |order: &[usize]| {
            let container = Container::new();
            for &index in order {
                let f = candidates[index];
                let builder = container.factory(move || Arc::new(Candidate { index })).priority(f.priority);
                let builder = if f.primary { builder.primary() } else { builder };
                let builder = if f.alternative { builder.alternative() } else { builder };
                builder.register().unwrap();
            }
            container.get::<Candidate>(&Context::background()).map(|c| c.index).ok()
        };

        let natural: Vec<usize> = (0..candidates.len()).collect();
        prop_assert_eq!(resolve(&natural), resolve(&order));
    }
}

proptest! {
    #[test]
    fn startup_runs_in_stable_priority_order(priorities in prop::collection::vec(-5i32..5, 0..10)) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let container = Container::new();
        for (index, priority) in priorities.iter().enumerate() {
            let log = log.clone();
            container
                .factory(move || {
                    log.lock().unwrap().push(index);
                })
                .startup(*priority)
                .register()
                .unwrap();
        }

        container.initialize(&Context::background()).unwrap();

        let mut expected: Vec<usize> = (0..priorities.len()).collect();
        expected.sort_by_key(|&i| priorities[i]);
        prop_assert_eq!(log.lock().unwrap().clone(), expected);
    }
}

proptest! {
    #[test]
    fn singleton_resolution_consistency(value in "\\PC{0,50}") {
        let container = Container::new();
        let captured = value.clone();
        container.register(move || Arc::new(captured.clone())).unwrap();

        let ctx = Context::background();
        let first = container.get::<String>(&ctx).unwrap();
        let second = container.get::<String>(&ctx).unwrap();

        prop_assert!(Arc::ptr_eq(&first, &second));
        prop_assert_eq!(&*first, &value);
    }
}

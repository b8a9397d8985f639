use std::collections::{BTreeMap, BTreeSet};

use featureboard_core::FeatureRequestId;
use featureboard_engine::EngineError;
use featureboard_harness::TestBoard;
use proptest::prelude::*;

const CLIENTS: usize = 3;
const TITLES: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Add { client: usize, title: usize, priority: i64 },
    Move { pick: usize, client: usize, priority: i64 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..CLIENTS, 0..TITLES, 1i64..6).prop_map(|(client, title, priority)| Op::Add {
            client,
            title,
            priority
        }),
        (any::<usize>(), 0..CLIENTS, 1i64..6).prop_map(|(pick, client, priority)| Op::Move {
            pick,
            client,
            priority
        }),
    ]
}

/// Reference model: title -> (client index, priority).
#[derive(Debug, Default, Clone)]
struct Model {
    rows: BTreeMap<String, (usize, i64)>,
}

impl Model {
    fn save(&mut self, title: &str, client: usize, priority: i64) {
        let taken = self
            .rows
            .iter()
            .any(|(t, &(c, p))| t != title && c == client && p == priority);
        if taken {
            for (_, (c, p)) in self.rows.iter_mut() {
                if *c == client && *p >= priority {
                    *p += 1;
                }
            }
        }
        self.rows.insert(title.to_string(), (client, priority));
    }

    fn group(&self, client: usize) -> Vec<(String, i64)> {
        let mut rows: Vec<(String, i64)> = self
            .rows
            .iter()
            .filter(|(_, (c, _))| *c == client)
            .map(|(t, (_, p))| (t.clone(), *p))
            .collect();
        rows.sort_by_key(|(_, p)| *p);
        rows
    }
}

fn title(n: usize) -> String {
    format!("request {n}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn ranks_and_titles_stay_unique(ops in prop::collection::vec(op(), 1..24)) {
        let mut board = TestBoard::new().unwrap();
        let mut model = Model::default();
        let mut ids: Vec<(String, FeatureRequestId)> = Vec::new();

        for op in ops {
            match op {
                Op::Add { client, title: n, priority } => {
                    let t = title(n);
                    let result = board.add(board.client(client), &t, priority);
                    if model.rows.contains_key(&t) {
                        prop_assert!(
                            matches!(result, Err(EngineError::TitleConflict { .. })),
                            "expected a title conflict for {}",
                            t
                        );
                    } else {
                        let saved = result.unwrap();
                        ids.push((t.clone(), saved.id.unwrap()));
                        model.save(&t, client, priority);
                    }
                }
                Op::Move { pick, client, priority } => {
                    if ids.is_empty() {
                        continue;
                    }
                    let (t, id) = ids[pick % ids.len()].clone();
                    board.move_to(id, board.client(client), priority).unwrap();
                    model.save(&t, client, priority);
                }
            }

            let mut titles = BTreeSet::new();
            for client in 0..CLIENTS {
                let group = board.ranks(board.client(client)).unwrap();
                let distinct: BTreeSet<i64> = group.iter().map(|(_, p)| *p).collect();
                prop_assert_eq!(distinct.len(), group.len());
                for (t, _) in &group {
                    prop_assert!(titles.insert(t.clone()));
                }
                prop_assert_eq!(group, model.group(client));
            }
        }
    }

    #[test]
    fn insert_into_dense_group_shifts_tail(n in 0usize..8, pick in any::<usize>()) {
        let mut board = TestBoard::new().unwrap();
        let a = board.client(0);
        let titles: Vec<String> = (0..n).map(title).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        board.add_dense(a, &refs).unwrap();

        let target = (pick % (n + 1)) as i64 + 1;
        board.add(a, "claimant", target).unwrap();

        let after = board.ranks(a).unwrap();
        let mut expected: Vec<(String, i64)> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let p = i as i64 + 1;
                (t.clone(), if p >= target { p + 1 } else { p })
            })
            .collect();
        expected.push(("claimant".to_string(), target));
        expected.sort_by_key(|(_, p)| *p);
        prop_assert_eq!(after, expected);
    }
}

//! Property-based tests for the commit codec, naming and graph walks.
//!
//! These tests use proptest to generate random commits and random acyclic
//! histories and verify that invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::assemble::ordering::topological_order;
    use crate::commit::{parse, serialize, Commit, ExtraHeader, Signature};
    use crate::graph::test_support::commit;
    use crate::graph::{CommitGraph, NodeId};
    use crate::naming::{assign_names, collapse_dots, message_preview, PREVIEW_LEN};
    use crate::reachability::discover;
    use crate::timestamp::{Offset, Timestamp};
    use proptest::prelude::*;
    use proptest::sample::Index;
    use std::collections::BTreeSet;

    // ============================================================================
    // Strategies
    // ============================================================================

    fn offset() -> impl Strategy<Value = Offset> {
        (any::<bool>(), 0u32..=14, 0u32..=59).prop_map(|(negative, hours, minutes)| {
            let sign = if negative { '-' } else { '+' };
            format!("{}{:02}{:02}", sign, hours, minutes)
                .parse()
                .unwrap()
        })
    }

    fn timestamp() -> impl Strategy<Value = Timestamp> {
        (-2_000_000_000i64..8_000_000_000, offset())
            .prop_map(|(seconds, offset)| Timestamp::new(seconds, offset))
    }

    fn signature() -> impl Strategy<Value = Signature> {
        ("[A-Za-z][A-Za-z0-9 .<>@-]{0,24}", timestamp())
            .prop_map(|(name, time)| Signature::new(name, time))
    }

    fn extra_header() -> impl Strategy<Value = ExtraHeader> {
        prop_oneof![
            "[a-z]{1,8}( [a-z0-9]{1,10})?".prop_map(ExtraHeader::Marker),
            ("[a-z]{1,8}", prop::collection::vec("[ -~]{0,16}", 1..4)).prop_map(
                |(key, lines)| {
                    let continuation: Vec<String> =
                        lines.iter().map(|line| format!(" {}", line)).collect();
                    ExtraHeader::Unsupported(format!("{} x\n{}", key, continuation.join("\n")))
                }
            ),
        ]
    }

    fn any_commit() -> impl Strategy<Value = Commit> {
        (
            "[0-9a-f]{40}",
            prop::collection::vec("[0-9a-f]{40}", 0..4),
            signature(),
            signature(),
            prop::collection::vec(extra_header(), 0..3),
            prop::collection::vec(
                prop::collection::vec(any::<u8>().prop_filter("no newline", |b| *b != b'\n'), 0..30),
                1..6,
            ),
        )
            .prop_map(
                |(tree, parents, author, committer, extra_headers, message)| Commit {
                    id: Some("0123456789abcdef0123456789abcdef01234567".to_string()),
                    tree,
                    parents,
                    author,
                    committer,
                    extra_headers,
                    message,
                },
            )
    }

    /// A random acyclic history: node `i` picks up to three parents among
    /// the nodes before it.
    fn history() -> impl Strategy<Value = CommitGraph> {
        prop::collection::vec(prop::collection::vec(any::<Index>(), 0..4), 1..40).prop_map(
            |picks| {
                let commits = picks
                    .iter()
                    .enumerate()
                    .map(|(i, parent_picks)| {
                        let mut parents: Vec<String> = Vec::new();
                        if i > 0 {
                            for pick in parent_picks {
                                let parent = format!("n{:04}", pick.index(i));
                                if !parents.contains(&parent) {
                                    parents.push(parent);
                                }
                            }
                        }
                        let parent_refs: Vec<&str> = parents.iter().map(String::as_str).collect();
                        commit(&format!("n{:04}", i), &parent_refs)
                    })
                    .collect();
                CommitGraph::from_commits(commits).unwrap()
            },
        )
    }

    // ============================================================================
    // Commit codec property tests
    // ============================================================================

    proptest! {
        /// Property: serializing a commit and parsing it back gives the same commit
        #[test]
        fn serialize_then_parse_is_identity(commit in any_commit()) {
            let raw = serialize(&commit);
            let parsed = parse(commit.display_id(), &raw).unwrap();
            prop_assert_eq!(parsed, commit);
        }

        /// Property: parsing then serializing reproduces the exact bytes
        #[test]
        fn parse_then_serialize_is_byte_exact(commit in any_commit()) {
            let raw = serialize(&commit);
            let parsed = parse("x", &raw).unwrap();
            prop_assert_eq!(serialize(&parsed), raw);
        }
    }

    // ============================================================================
    // Timestamp and naming property tests
    // ============================================================================

    proptest! {
        /// Property: the text form of a timestamp parses back to the same instant and offset
        #[test]
        fn timestamp_text_round_trips(time in timestamp()) {
            let text = time.to_text().unwrap();
            prop_assert_eq!(Timestamp::parse_text(&text), Some(time));
        }

        /// Property: collapse_dots reaches a fixed point in one call
        #[test]
        fn collapse_dots_is_idempotent(input in "[a.]{0,40}") {
            let once = collapse_dots(&input);
            prop_assert!(!once.contains(".."));
            prop_assert_eq!(collapse_dots(&once), once);
        }

        /// Property: previews are short, filesystem-safe and never start or end with a dot
        #[test]
        fn preview_is_filesystem_safe(
            message in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..40), 0..4),
        ) {
            let preview = message_preview(&message);
            prop_assert!(preview.len() <= PREVIEW_LEN);
            prop_assert!(preview.chars().all(|c| c.is_ascii_alphanumeric() || c == '.'));
            prop_assert!(!preview.contains(".."));
            prop_assert!(!preview.starts_with('.'));
            prop_assert!(!preview.ends_with('.'));
        }
    }

    // ============================================================================
    // Graph walk property tests
    // ============================================================================

    proptest! {
        /// Property: every node comes after all of its parents, exactly once
        #[test]
        fn topological_order_puts_parents_first(graph in history()) {
            let order = topological_order(&graph).unwrap();
            prop_assert_eq!(order.len(), graph.len());

            let mut position = vec![usize::MAX; graph.len()];
            for (i, id) in order.iter().enumerate() {
                prop_assert_eq!(position[id.index()], usize::MAX, "node emitted twice");
                position[id.index()] = i;
            }
            for id in graph.ids() {
                for parent in graph.node(id).parents() {
                    prop_assert!(position[parent.index()] < position[id.index()]);
                }
            }
        }

        /// Property: discovery is closed over parents, and over children when asked
        #[test]
        fn discover_is_closed(
            graph in history(),
            picks in prop::collection::vec(any::<Index>(), 1..4),
            descendants in any::<bool>(),
        ) {
            let all: Vec<NodeId> = graph.ids().collect();
            let roots: Vec<NodeId> = picks.iter().map(|pick| *pick.get(&all)).collect();
            let found = discover(&graph, &roots, descendants);

            for root in &roots {
                prop_assert!(found.contains(root));
            }
            for &id in &found {
                for parent in graph.node(id).parents() {
                    prop_assert!(found.contains(parent));
                }
                if descendants {
                    for child in graph.node(id).children() {
                        prop_assert!(found.contains(child));
                    }
                }
            }
        }

        /// Property: discovery does not depend on root order or repetition
        #[test]
        fn discover_ignores_root_order(
            graph in history(),
            picks in prop::collection::vec(any::<Index>(), 1..4),
        ) {
            let all: Vec<NodeId> = graph.ids().collect();
            let roots: Vec<NodeId> = picks.iter().map(|pick| *pick.get(&all)).collect();
            let mut shuffled = roots.clone();
            shuffled.reverse();
            shuffled.extend(roots.iter().copied());
            prop_assert_eq!(discover(&graph, &roots, false), discover(&graph, &shuffled, false));
        }

        /// Property: names are unique and the same on every run
        #[test]
        fn assigned_names_are_stable(graph in history()) {
            let ids: Vec<NodeId> = graph.ids().collect();
            let first = assign_names(&graph, &ids).unwrap();
            let second = assign_names(&graph, &ids).unwrap();
            prop_assert_eq!(&first, &second);
            let distinct: BTreeSet<&String> = first.values().collect();
            prop_assert_eq!(distinct.len(), graph.len());
        }
    }
}

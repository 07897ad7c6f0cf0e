use pretty_assertions::assert_eq;
use test_log::test;

use super::*;
use crate::conversation::Role;

fn active(id: &str) -> (TextAccumulator, TurnId) {
    let turn = TurnId::from(id);
    let mut accumulator = TextAccumulator::new();
    accumulator.begin(turn.clone());

    (accumulator, turn)
}

#[test]
fn test_append_preserves_order() {
    let (mut accumulator, turn) = active("t1");

    for fragment in ["a", "b", "c"] {
        assert!(accumulator.append(&turn, fragment));
    }

    assert_eq!(accumulator.text(&turn), Some("abc"));
    assert!(accumulator.has_placeholder());
}

#[test]
fn test_inactive_turns_are_ignored() {
    let (mut accumulator, turn) = active("t1");
    let stale = TurnId::from("t0");

    assert!(!accumulator.append(&stale, "late"));
    assert!(!accumulator.replace(&stale, "late"));
    assert_eq!(accumulator.text(&stale), None);
    assert_eq!(accumulator.text(&turn), Some(""));

    accumulator.retire(&turn);
    assert!(!accumulator.append(&turn, "after"));
    assert_eq!(accumulator.text(&turn), None);
}

#[test]
fn test_replace_happens_once_and_stops_accumulation() {
    let (mut accumulator, turn) = active("t1");
    accumulator.append(&turn, "partial ");

    assert!(accumulator.replace(&turn, "Complete answer."));
    assert!(!accumulator.has_placeholder());
    assert!(!accumulator.replace(&turn, "Second answer."));
    assert!(!accumulator.append(&turn, " more"));

    assert_eq!(accumulator.text(&turn), Some("Complete answer."));
}

#[test]
fn test_commit_is_idempotent() {
    let (mut accumulator, turn) = active("t1");
    let mut conversation = Conversation::new();
    accumulator.append(&turn, "abc");

    let message = accumulator.commit(&turn, None, &mut conversation).unwrap();
    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.text(), Some("abc"));
    assert!(accumulator.is_committed(&turn));
    assert!(!accumulator.has_placeholder());

    accumulator.append(&turn, "def");
    assert_eq!(accumulator.commit(&turn, None, &mut conversation), None);
    assert_eq!(accumulator.commit(&turn, Some("override"), &mut conversation), None);
    assert_eq!(conversation.len(), 1);
}

#[test]
fn test_empty_text_is_not_committed() {
    let (mut accumulator, turn) = active("t1");
    let mut conversation = Conversation::new();

    assert_eq!(accumulator.commit(&turn, None, &mut conversation), None);

    accumulator.append(&turn, " \r\n\t ");
    assert_eq!(accumulator.commit(&turn, None, &mut conversation), None);
    assert!(!accumulator.is_committed(&turn));
    assert!(conversation.is_empty());
}

#[test]
fn test_commit_normalizes_text() {
    let (mut accumulator, turn) = active("t1");
    let mut conversation = Conversation::new();
    accumulator.append(&turn, "\r\n first line\r\nsecond\rthird \n");

    let message = accumulator.commit(&turn, None, &mut conversation).unwrap();
    assert_eq!(message.text(), Some("first line\nsecond\nthird"));
}

#[test]
fn test_override_text_wins() {
    let (mut accumulator, turn) = active("t1");
    let mut conversation = Conversation::new();
    accumulator.append(&turn, "buffered");

    let message = accumulator
        .commit(&turn, Some("  overridden "), &mut conversation)
        .unwrap();
    assert_eq!(message.text(), Some("overridden"));
    assert_eq!(conversation.replies(&turn).count(), 1);
}

#[test]
fn test_begin_resets_the_buffer() {
    let (mut accumulator, first) = active("t1");
    accumulator.append(&first, "old");
    accumulator.replace(&first, "old, complete");

    let second = TurnId::from("t2");
    accumulator.begin(second.clone());

    assert!(accumulator.append(&second, "new"));
    assert_eq!(accumulator.text(&second), Some("new"));
    assert!(!accumulator.is_replaced());
}

#[test]
fn test_only_the_active_turn_commits() {
    let (mut accumulator, first) = active("t1");
    let mut conversation = Conversation::new();
    accumulator.append(&first, "first");
    accumulator.commit(&first, None, &mut conversation).unwrap();
    accumulator.retire(&first);

    assert!(accumulator.is_committed(&first));
    assert_eq!(
        accumulator.commit(&first, Some("again"), &mut conversation),
        None
    );

    let second = TurnId::from("t2");
    accumulator.begin(second.clone());
    assert!(!accumulator.is_committed(&second));
    assert!(accumulator.is_committed(&first));

    accumulator.append(&second, "second");
    accumulator.commit(&second, None, &mut conversation).unwrap();

    // Only the latest commit is remembered.
    assert!(accumulator.is_committed(&second));
    assert!(!accumulator.is_committed(&first));
    assert_eq!(
        accumulator.commit(&first, Some("again"), &mut conversation),
        None
    );
    assert_eq!(conversation.len(), 2);
}

use vct_core::Turn;

/// Append-only transcript. Turns are handed out by shared reference only.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Session reset only; returns how many turns were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.turns.len();
        self.turns.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vct_core::Role;

    proptest! {
        #[test]
        fn append_preserves_insertion_order(contents in prop::collection::vec(".{0,24}", 0..32)) {
            let mut conversation = Conversation::new();
            for (idx, content) in contents.iter().enumerate() {
                let turn = if idx % 2 == 0 {
                    Turn::user(content.clone())
                } else {
                    Turn::assistant(content.clone())
                };
                conversation.append(turn);
            }
            prop_assert_eq!(conversation.len(), contents.len());
            for (turn, content) in conversation.all().iter().zip(&contents) {
                prop_assert_eq!(&turn.content, content);
            }
        }
    }

    #[test]
    fn reading_all_has_no_side_effects() {
        let mut conversation = Conversation::new();
        conversation.append(Turn::user("hi"));
        conversation.append(Turn::assistant("hello"));
        let first = conversation.all().to_vec();
        let second = conversation.all().to_vec();
        assert_eq!(first, second);
        assert_eq!(conversation.len(), 2);
        assert_eq!(first[0].role, Role::User);
        assert_eq!(first[1].role, Role::Assistant);
    }

    #[test]
    fn clear_reports_dropped_turns() {
        let mut conversation = Conversation::new();
        conversation.append(Turn::user("a"));
        assert_eq!(conversation.clear(), 1);
        assert!(conversation.is_empty());
    }
}

use vct_core::View;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSelector {
    current: View,
}

impl ViewSelector {
    pub fn select(&mut self, view: View) {
        self.current = view;
    }

    pub fn current(&self) -> View {
        self.current
    }

    /// Cycles to the next tab and returns it.
    pub fn next(&mut self) -> View {
        self.current = self.current.next();
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_players() {
        assert_eq!(ViewSelector::default().current(), View::Players);
    }

    #[test]
    fn select_is_idempotent() {
        let mut selector = ViewSelector::default();
        selector.select(View::Players);
        selector.select(View::Players);
        assert_eq!(selector.current(), View::Players);
        selector.select(View::Strategy);
        selector.select(View::Strategy);
        assert_eq!(selector.current(), View::Strategy);
    }

    #[test]
    fn next_cycles_through_both_tabs() {
        let mut selector = ViewSelector::default();
        assert_eq!(selector.next(), View::Strategy);
        assert_eq!(selector.next(), View::Players);
    }
}

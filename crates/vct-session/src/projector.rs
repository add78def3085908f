use std::sync::Arc;
use vct_core::TeamResult;

/// Holds the latest accepted team result. Replacement swaps the whole
/// snapshot, so a reader holding the old `Arc` keeps a consistent value.
#[derive(Debug, Clone, Default)]
pub struct ResultProjector {
    current: Option<Arc<TeamResult>>,
}

impl ResultProjector {
    pub fn current(&self) -> Option<Arc<TeamResult>> {
        self.current.clone()
    }

    pub fn get(&self) -> Option<&TeamResult> {
        self.current.as_deref()
    }

    pub fn replace(&mut self, result: TeamResult) {
        self.current = Some(Arc::new(result));
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub(crate) fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vct_testkit::{single_player_team, three_region_team};

    #[test]
    fn replace_swaps_whole_snapshot() {
        let mut projector = ResultProjector::default();
        assert!(projector.current().is_none());

        projector.replace(three_region_team());
        let held = projector.current().expect("first result");

        projector.replace(single_player_team("solo"));
        assert_eq!(*held, three_region_team());
        assert_eq!(projector.get(), Some(&single_player_team("solo")));
    }
}

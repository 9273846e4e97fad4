use crate::config::FADE_REVEAL_LINE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FadeState {
    Pending,
    Revealed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Already above the reveal line; show without waiting for the observer.
    RevealNow,
    Observe,
}

/// Tracks every `.fade-on-scroll` element by its position in document order.
/// Reveal is one-way.
#[derive(Debug, Default)]
pub struct FadeBook {
    items: Vec<FadeState>,
}

impl FadeBook {
    /// Registers an element whose bounding top is `top` and decides whether it
    /// needs an observer. Returns the element's index and its placement.
    pub fn place(&mut self, top: f64, viewport_height: f64) -> (usize, Placement) {
        let index = self.items.len();
        if top < viewport_height * FADE_REVEAL_LINE {
            self.items.push(FadeState::Revealed);
            (index, Placement::RevealNow)
        } else {
            self.items.push(FadeState::Pending);
            (index, Placement::Observe)
        }
    }

    /// Handles an observer entry. Returns `true` exactly once per element, on
    /// the first intersecting entry; the caller reveals and stops observing.
    pub fn on_intersection(&mut self, index: usize, is_intersecting: bool) -> bool {
        if !is_intersecting {
            return false;
        }
        match self.items.get_mut(index) {
            Some(state @ FadeState::Pending) => {
                *state = FadeState::Revealed;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.items
            .iter()
            .filter(|state| **state == FadeState::Pending)
            .count()
    }

    pub fn tracked(&self) -> usize {
        self.items.len()
    }
}

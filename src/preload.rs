use crate::config::{
    EASING_FACTOR, FOREGROUND_DELAY_MS, LABEL_LEFT_BOUNDS, LOADER_TRANSITION_MS,
    PENDING_PERCENT_CAP,
};

/// Shared counters between the image callbacks, the frame loop and the
/// fallback timer. Failed and successful loads count the same.
#[derive(Clone, Debug)]
pub struct LoadProgress {
    settled: Vec<bool>,
    loaded: usize,
    target_percent: u32,
    display_percent: f64,
    finished: bool,
}

/// What one animation frame should paint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub percent: u32,
    pub label_left: u32,
    pub complete: bool,
}

impl Frame {
    pub fn width_style(&self) -> String {
        format!("{}%", self.percent)
    }

    pub fn label_text(&self) -> String {
        format!("{}%", self.percent)
    }

    pub fn label_left_style(&self) -> String {
        format!("{}%", self.label_left)
    }
}

impl LoadProgress {
    pub fn new(total: usize) -> Self {
        Self {
            settled: vec![false; total],
            loaded: 0,
            target_percent: if total == 0 { 100 } else { 0 },
            display_percent: 0.0,
            finished: false,
        }
    }

    pub fn total(&self) -> usize {
        self.settled.len()
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn all_loaded(&self) -> bool {
        self.loaded == self.total()
    }

    /// Records that asset `index` finished loading or failed. Returns `false`
    /// for unknown indices, repeated events and anything after forced completion.
    pub fn settle(&mut self, index: usize) -> bool {
        if self.all_loaded() {
            return false;
        }

        match self.settled.get_mut(index) {
            Some(settled) if !*settled => *settled = true,
            _ => return false,
        }

        self.loaded += 1;
        self.target_percent = percent_of(self.loaded, self.total());
        true
    }

    /// Fallback for assets that never fire load or error.
    pub fn force_complete(&mut self) -> bool {
        let pending = !self.all_loaded();
        self.target_percent = 100;
        self.loaded = self.total();
        pending
    }

    pub fn advance_frame(&mut self) -> Frame {
        self.display_percent +=
            (f64::from(self.target_percent) - self.display_percent) * EASING_FACTOR;
        if !self.all_loaded() && self.display_percent > PENDING_PERCENT_CAP {
            self.display_percent = PENDING_PERCENT_CAP;
        }

        let percent = self.display_percent.round().clamp(0.0, 100.0) as u32;
        Frame {
            percent,
            label_left: percent.clamp(LABEL_LEFT_BOUNDS.0, LABEL_LEFT_BOUNDS.1),
            complete: self.all_loaded() && percent >= 100,
        }
    }

    /// Claims the one-time finish. Only the first caller gets `true`.
    pub fn claim_finish(&mut self) -> bool {
        !std::mem::replace(&mut self.finished, true)
    }
}

fn percent_of(loaded: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    (loaded as f64 / total as f64 * 100.0).round() as u32
}

/// One step of the page reveal that follows a finished load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealStep {
    HeroHeight,
    /// Everything after this runs on a later task.
    NextTick,
    HideLoader,
    RemoveLoader { after_ms: u32 },
    PageReady,
    BackgroundLoaded,
    ForegroundVisible { after_ms: u32 },
    InitScrollFade,
}

/// Hero height is settled before the loader starts fading, and fade targets
/// are only observed once the page is in its final state.
pub fn reveal_plan() -> [RevealStep; 8] {
    [
        RevealStep::HeroHeight,
        RevealStep::NextTick,
        RevealStep::HideLoader,
        RevealStep::RemoveLoader {
            after_ms: LOADER_TRANSITION_MS,
        },
        RevealStep::PageReady,
        RevealStep::BackgroundLoaded,
        RevealStep::ForegroundVisible {
            after_ms: FOREGROUND_DELAY_MS,
        },
        RevealStep::InitScrollFade,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until_complete(progress: &mut LoadProgress, max_frames: usize) -> Option<usize> {
        (1..=max_frames).find(|_| progress.advance_frame().complete)
    }

    #[test]
    fn target_reaches_exactly_one_hundred_after_every_asset_settles() {
        for total in 1..=7 {
            let mut progress = LoadProgress::new(total);
            for index in 0..total {
                assert!(progress.settle(index));
            }
            assert_eq!(progress.target_percent, 100);
            assert!(progress.all_loaded());
        }
    }

    #[test]
    fn target_percent_rounds_partial_progress() {
        let mut progress = LoadProgress::new(3);
        progress.settle(0);
        assert_eq!(progress.target_percent, 33);
        progress.settle(2);
        assert_eq!(progress.target_percent, 67);
    }

    #[test]
    fn repeated_or_unknown_settle_events_are_ignored() {
        let mut progress = LoadProgress::new(2);
        assert!(progress.settle(1));
        assert!(!progress.settle(1));
        assert!(!progress.settle(5));
        assert_eq!(progress.loaded(), 1);
    }

    #[test]
    fn display_percent_never_decreases_while_target_rises() {
        let mut progress = LoadProgress::new(4);
        let mut previous = progress.display_percent;

        for frame in 0..200 {
            if frame % 15 == 0 && frame / 15 < 4 {
                progress.settle(frame / 15);
            }
            progress.advance_frame();
            assert!(progress.display_percent >= previous);
            previous = progress.display_percent;
        }
    }

    #[test]
    fn pending_assets_cap_the_rendered_percent() {
        let mut progress = LoadProgress::new(4);
        for index in 0..3 {
            progress.settle(index);
        }
        for _ in 0..500 {
            let frame = progress.advance_frame();
            assert!(frame.percent <= 95);
            assert!(!frame.complete);
        }
        assert!(progress.display_percent <= 95.0);
    }

    #[test]
    fn display_stays_capped_near_completion_until_last_asset() {
        let mut progress = LoadProgress::new(1);
        // Push display past the cap through forced easing toward a later 100.
        progress.target_percent = 100;
        for _ in 0..100 {
            let frame = progress.advance_frame();
            assert!(frame.percent <= 95);
        }
        progress.settle(0);
        assert!(run_until_complete(&mut progress, 100).is_some());
    }

    #[test]
    fn all_settled_assets_complete_the_loop() {
        let mut progress = LoadProgress::new(4);
        for index in 0..4 {
            progress.settle(index);
        }
        let frames = run_until_complete(&mut progress, 200).expect("loop should complete");
        assert!(frames > 1);
    }

    #[test]
    fn forced_completion_drives_percent_to_one_hundred() {
        let mut progress = LoadProgress::new(4);
        progress.settle(0);
        for _ in 0..30 {
            progress.advance_frame();
        }

        assert!(progress.force_complete());
        assert_eq!(progress.loaded(), progress.total());
        assert_eq!(progress.target_percent, 100);
        assert!(run_until_complete(&mut progress, 200).is_some());

        assert!(!progress.settle(3));
        assert_eq!(progress.loaded(), 4);
    }

    #[test]
    fn forced_completion_after_natural_completion_changes_nothing() {
        let mut progress = LoadProgress::new(1);
        progress.settle(0);
        assert!(!progress.force_complete());
        assert_eq!(progress.loaded(), 1);
    }

    #[test]
    fn empty_asset_list_starts_at_one_hundred() {
        let mut progress = LoadProgress::new(0);
        assert_eq!(progress.target_percent, 100);
        assert!(run_until_complete(&mut progress, 200).is_some());
    }

    #[test]
    fn label_position_is_clamped_to_track() {
        let mut progress = LoadProgress::new(1);
        let first = progress.advance_frame();
        assert_eq!(first.percent, 0);
        assert_eq!(first.label_left, 2);
        assert_eq!(first.label_text(), "0%");

        progress.settle(0);
        run_until_complete(&mut progress, 200);
        let last = progress.advance_frame();
        assert_eq!(last.percent, 100);
        assert_eq!(last.label_left, 98);
        assert_eq!(last.width_style(), "100%");
        assert_eq!(last.label_left_style(), "98%");
    }

    #[test]
    fn finish_is_claimed_once() {
        let mut progress = LoadProgress::new(0);
        assert!(progress.claim_finish());
        assert!(!progress.claim_finish());
    }

    #[test]
    fn reveal_settles_hero_first_and_observes_fades_last() {
        let plan = reveal_plan();

        assert_eq!(plan.first(), Some(&RevealStep::HeroHeight));
        assert_eq!(plan[1], RevealStep::NextTick);
        assert_eq!(plan.last(), Some(&RevealStep::InitScrollFade));
        assert_eq!(
            plan,
            [
                RevealStep::HeroHeight,
                RevealStep::NextTick,
                RevealStep::HideLoader,
                RevealStep::RemoveLoader { after_ms: 550 },
                RevealStep::PageReady,
                RevealStep::BackgroundLoaded,
                RevealStep::ForegroundVisible { after_ms: 200 },
                RevealStep::InitScrollFade,
            ]
        );
    }

    #[test]
    fn loader_is_hidden_before_it_is_removed() {
        let plan = reveal_plan();
        let position = |wanted: fn(&RevealStep) -> bool| plan.iter().position(wanted);

        let hidden = position(|step| *step == RevealStep::HideLoader).expect("hide step");
        let removed = position(|step| matches!(step, RevealStep::RemoveLoader { .. }))
            .expect("remove step");
        let hero = position(|step| *step == RevealStep::HeroHeight).expect("hero step");

        assert!(hero < hidden);
        assert!(hidden < removed);
    }
}

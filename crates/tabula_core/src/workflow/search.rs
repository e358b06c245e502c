//! Bounded binary search with a pannable viewport.
//!
//! # Invariants
//! - `min <= max` at all times.
//! - Pixel searches probe the floored midpoint and exclude rejected
//!   candidates, so the bound collapses to one pixel.
//! - Scale searches probe the exact midpoint and keep rejected candidates as
//!   inclusive bounds.
//! - Viewport `left`/`top` never drop below [`VIEW_MIN`].

use super::engine::Choice;
use crate::raster::PixelRect;
use serde::{Deserialize, Serialize};

/// Edge length of the preview viewport.
pub const VIEW_SIZE: u32 = 400;
/// Lowest viewport origin; leaves a margin left of and above the image.
pub const VIEW_MIN: i64 = -50;
pub const PAN_STEP: i64 = 100;

/// Quantity being searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAxis {
    /// Pixel column.
    Horizontal,
    /// Pixel row.
    Vertical,
    /// Grid cell size.
    Scale,
}

impl SearchAxis {
    pub fn is_pixel(self) -> bool {
        !matches!(self, Self::Scale)
    }

    /// Choice ids meaning "candidate too low" and "candidate too high".
    pub fn feedback_ids(self) -> (&'static str, &'static str) {
        match self {
            Self::Horizontal | Self::Scale => ("left", "right"),
            Self::Vertical => ("above", "below"),
        }
    }
}

/// User verdict on the current candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    TooLow,
    TooHigh,
    Perfect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Parsed answer inside a search phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCommand {
    Feedback(Feedback),
    Pan(PanDirection),
    Restart,
}

impl SearchCommand {
    /// Parses a choice id for a search over `axis`.
    pub fn parse(axis: SearchAxis, choice: &str) -> Option<Self> {
        let choice = choice.trim().to_ascii_lowercase();
        let (low, high) = axis.feedback_ids();
        let command = match choice.as_str() {
            "perfect" => Self::Feedback(Feedback::Perfect),
            "pan_up" => Self::Pan(PanDirection::Up),
            "pan_down" => Self::Pan(PanDirection::Down),
            "pan_left" => Self::Pan(PanDirection::Left),
            "pan_right" => Self::Pan(PanDirection::Right),
            "restart" => Self::Restart,
            other if other == low => Self::Feedback(Feedback::TooLow),
            other if other == high => Self::Feedback(Feedback::TooHigh),
            _ => return None,
        };
        Some(command)
    }
}

/// Choice groups offered in every search phase: feedback, pan, restart.
pub fn search_choices(axis: SearchAxis) -> Vec<Vec<Choice>> {
    let (low, high) = axis.feedback_ids();
    vec![
        vec![
            Choice::new(low, capitalize(low)),
            Choice::new("perfect", "Perfect"),
            Choice::new(high, capitalize(high)),
        ],
        vec![
            Choice::new("pan_up", "Pan up"),
            Choice::new("pan_down", "Pan down"),
            Choice::new("pan_left", "Pan left"),
            Choice::new("pan_right", "Pan right"),
        ],
        vec![Choice::new("restart", "Restart")],
    ]
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Top-left corner of the preview window, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: i64,
    pub top: i64,
}

impl Viewport {
    pub const ORIGIN: Viewport = Viewport {
        left: VIEW_MIN,
        top: VIEW_MIN,
    };

    pub fn at(left: i64, top: i64) -> Self {
        Self {
            left: left.max(VIEW_MIN),
            top: top.max(VIEW_MIN),
        }
    }

    /// Viewport showing the bottom-right corner of a `width`×`height` image.
    pub fn bottom_right(width: u32, height: u32) -> Self {
        let size = i64::from(VIEW_SIZE);
        Self::at(i64::from(width) - size, i64::from(height) - size)
    }

    /// Moves one step and returns the `(dx, dy)` actually applied.
    pub fn pan(&mut self, direction: PanDirection) -> (i64, i64) {
        let before = *self;
        let (dx, dy) = match direction {
            PanDirection::Up => (0, -PAN_STEP),
            PanDirection::Down => (0, PAN_STEP),
            PanDirection::Left => (-PAN_STEP, 0),
            PanDirection::Right => (PAN_STEP, 0),
        };
        *self = Self::at(self.left + dx, self.top + dy);
        (self.left - before.left, self.top - before.top)
    }

    pub fn rect(&self) -> PixelRect {
        PixelRect::new(self.left, self.top, VIEW_SIZE, VIEW_SIZE)
    }
}

/// Closed interval being bisected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedSearch {
    pub axis: SearchAxis,
    pub min: f64,
    pub max: f64,
}

impl BoundedSearch {
    pub fn new(axis: SearchAxis, min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { axis, min, max }
    }

    pub fn candidate(&self) -> f64 {
        let middle = (self.min + self.max) / 2.0;
        if self.axis.is_pixel() {
            middle.floor()
        } else {
            middle
        }
    }

    /// Applies feedback. Returns the accepted value on `Perfect`.
    pub fn narrow(&mut self, feedback: Feedback) -> Option<f64> {
        let candidate = self.candidate();
        let step = if self.axis.is_pixel() { 1.0 } else { 0.0 };
        match feedback {
            Feedback::Perfect => return Some(candidate),
            Feedback::TooLow => self.min = (candidate + step).min(self.max),
            Feedback::TooHigh => self.max = (candidate - step).max(self.min),
        }
        None
    }

    /// Whether only one pixel candidate remains.
    pub fn is_collapsed(&self) -> bool {
        self.axis.is_pixel() && self.min >= self.max
    }

    /// Shifts a positional bound by the viewport delta along its axis.
    pub fn follow_pan(&mut self, dx: i64, dy: i64) {
        let delta = match self.axis {
            SearchAxis::Horizontal => dx,
            SearchAxis::Vertical => dy,
            SearchAxis::Scale => 0,
        };
        self.min += delta as f64;
        self.max += delta as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        search_choices, BoundedSearch, Feedback, PanDirection, SearchAxis, SearchCommand,
        Viewport, VIEW_MIN,
    };

    fn steps_to_find(target: f64, mut search: BoundedSearch) -> u32 {
        let mut steps = 0;
        loop {
            let candidate = search.candidate();
            let feedback = if candidate < target {
                Feedback::TooLow
            } else if candidate > target {
                Feedback::TooHigh
            } else {
                return steps;
            };
            assert!(search.narrow(feedback).is_none());
            steps += 1;
            assert!(steps <= 64, "search did not converge on {target}");
        }
    }

    #[test]
    fn initial_column_search_probes_130() {
        let search = BoundedSearch::new(SearchAxis::Horizontal, -50.0, 310.0);
        assert_eq!(search.candidate(), 130.0);
    }

    #[test]
    fn pixel_search_finds_every_target_within_log2_width() {
        let width = 361.0_f64;
        let limit = width.log2().ceil() as u32;
        for target in -50..=310 {
            let search = BoundedSearch::new(SearchAxis::Horizontal, -50.0, 310.0);
            let steps = steps_to_find(f64::from(target), search);
            assert!(steps <= limit, "target {target} took {steps} steps");
        }
    }

    #[test]
    fn pixel_bound_collapses_onto_the_target_within_log2_width() {
        let width = 361.0_f64;
        let limit = width.log2().ceil() as u32;
        let mut collapsed = 0;
        for target in -50..=310 {
            let target = f64::from(target);
            let mut search = BoundedSearch::new(SearchAxis::Horizontal, -50.0, 310.0);
            let mut steps = 0;
            while !search.is_collapsed() && search.candidate() != target {
                let feedback = if search.candidate() < target {
                    Feedback::TooLow
                } else {
                    Feedback::TooHigh
                };
                search.narrow(feedback);
                steps += 1;
                assert!(
                    search.min <= target && target <= search.max,
                    "target {target} fell outside [{}, {}]",
                    search.min,
                    search.max
                );
            }
            assert!(steps <= limit, "target {target} took {steps} responses");
            if search.is_collapsed() {
                assert_eq!((search.min, search.max), (target, target));
                collapsed += 1;
            }
        }
        assert!(collapsed > 0);
    }

    #[test]
    fn pixel_search_collapses_at_the_edge() {
        let mut search = BoundedSearch::new(SearchAxis::Vertical, 0.0, 3.0);
        for _ in 0..4 {
            search.narrow(Feedback::TooLow);
        }
        assert!(search.is_collapsed());
        assert_eq!(search.candidate(), 3.0);
        search.narrow(Feedback::TooLow);
        assert_eq!((search.min, search.max), (3.0, 3.0));
    }

    #[test]
    fn scale_search_keeps_inclusive_bounds() {
        let mut search = BoundedSearch::new(SearchAxis::Scale, 45.0, 55.0);
        assert_eq!(search.candidate(), 50.0);
        search.narrow(Feedback::TooHigh);
        assert_eq!((search.min, search.max), (45.0, 50.0));
        assert_eq!(search.candidate(), 47.5);
        assert_eq!(search.narrow(Feedback::Perfect), Some(47.5));
        assert!(!search.is_collapsed());
    }

    #[test]
    fn pan_shifts_only_the_matching_axis() {
        let mut view = Viewport::ORIGIN;
        let mut columns = BoundedSearch::new(SearchAxis::Horizontal, -50.0, 310.0);
        let mut rows = BoundedSearch::new(SearchAxis::Vertical, -50.0, 310.0);

        let (dx, dy) = view.pan(PanDirection::Right);
        assert_eq!((dx, dy), (100, 0));
        columns.follow_pan(dx, dy);
        rows.follow_pan(dx, dy);
        assert_eq!((columns.min, columns.max), (50.0, 410.0));
        assert_eq!((rows.min, rows.max), (-50.0, 310.0));
    }

    #[test]
    fn pan_is_clamped_and_reports_applied_delta() {
        let mut view = Viewport::at(20, VIEW_MIN);
        assert_eq!(view.pan(PanDirection::Left), (-70, 0));
        assert_eq!(view.left, VIEW_MIN);
        assert_eq!(view.pan(PanDirection::Up), (0, 0));
        assert_eq!(view, Viewport::ORIGIN);
    }

    #[test]
    fn bottom_right_clamps_small_images() {
        assert_eq!(Viewport::bottom_right(1000, 700), Viewport::at(600, 300));
        assert_eq!(Viewport::bottom_right(200, 100), Viewport::ORIGIN);
    }

    #[test]
    fn commands_follow_axis_vocabulary() {
        assert_eq!(
            SearchCommand::parse(SearchAxis::Vertical, "Above"),
            Some(SearchCommand::Feedback(Feedback::TooLow))
        );
        assert_eq!(SearchCommand::parse(SearchAxis::Vertical, "left"), None);
        assert_eq!(
            SearchCommand::parse(SearchAxis::Scale, " right "),
            Some(SearchCommand::Feedback(Feedback::TooHigh))
        );
        assert_eq!(
            SearchCommand::parse(SearchAxis::Horizontal, "pan_down"),
            Some(SearchCommand::Pan(PanDirection::Down))
        );
        assert_eq!(
            SearchCommand::parse(SearchAxis::Horizontal, "restart"),
            Some(SearchCommand::Restart)
        );
    }

    #[test]
    fn choices_are_grouped() {
        let groups = search_choices(SearchAxis::Vertical);
        assert_eq!(groups.len(), 3);
        let ids: Vec<&str> = groups[0].iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["above", "perfect", "below"]);
        assert_eq!(groups[0][0].label, "Above");
    }
}

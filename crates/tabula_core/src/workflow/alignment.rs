//! Interactive grid alignment.
//!
//! Walks a user through locating the map's printed grid: two vertical grid
//! lines give a coarse cell size and the column offset, two scale searches
//! refine the size (near the origin, then at the far corner) and a final row
//! search gives the row offset.
//!
//! # Invariants
//! - Every accepted step saves the tabula before the transition is returned.
//! - While a scale search runs, the saved tabula's `dpi` is the current
//!   candidate, so previews show the grid being tested.
//! - A user or tabula that does not resolve moves the instance to `error`.

use super::engine::{Choice, Handlers, StateName, Transition, Workflow, WorkflowMessage};
use super::search::{search_choices, BoundedSearch, SearchAxis, SearchCommand, Viewport, VIEW_SIZE};
use super::WorkflowError;
use crate::model::color::Color;
use crate::model::tabula::{Tabula, TabulaId};
use crate::model::user::{User, UserId};
use crate::raster::{draw_line, PixelPoint};
use crate::render::compositor::MIN_RENDER_DPI;
use crate::render::{background_dimensions, Compositor, GlyphResolver, RenderOptions};
use crate::repo::tabula_repo::TabulaRepository;
use crate::repo::user_repo::UserRepository;
use image::RgbaImage;
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Grid size assumed when alignment starts.
pub const DEFAULT_DPI: f64 = 50.0;
/// Width of the initial column and row search windows.
const SEARCH_SPAN: f64 = 360.0;
/// Second-line window, relative to the first line.
const SECOND_LINE_NEAR: f64 = 5.0;
const SECOND_LINE_FAR: f64 = 95.0;
const COARSE_SCALE_TOLERANCE: f64 = 0.1;
const FINE_SCALE_TOLERANCE: f64 = 0.01;
/// Bias added before truncating a line position to a whole number of cells.
const OFFSET_ROUNDING_BIAS: f64 = 0.2;

const LOST_PROGRESS: &str = "Alignment progress was lost; start the alignment again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentPhase {
    Enter,
    Confirm,
    VerticalA,
    VerticalB,
    Fine,
    FineBr,
    Top,
    Exit,
    Error,
}

impl StateName for AlignmentPhase {
    const ALL: &'static [Self] = &[
        Self::Enter,
        Self::Confirm,
        Self::VerticalA,
        Self::VerticalB,
        Self::Fine,
        Self::FineBr,
        Self::Top,
        Self::Exit,
        Self::Error,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Confirm => "confirm",
            Self::VerticalA => "vertical_a",
            Self::VerticalB => "vertical_b",
            Self::Fine => "fine",
            Self::FineBr => "fine_br",
            Self::Top => "top",
            Self::Exit => "exit",
            Self::Error => "error",
        }
    }
}

/// Opaque per-instance state of an alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentState {
    pub user_id: UserId,
    pub tabula_id: Option<TabulaId>,
    pub viewport: Viewport,
    pub search: Option<BoundedSearch>,
    /// Cell size accepted by the last completed step.
    pub saved_dpi: f64,
    /// Pixel column of the first grid line (`vertical_a` result).
    pub first_line: Option<i64>,
    /// Set when the instance reached `exit` through the row search.
    pub completed: bool,
    /// Diagnostic shown by the `error` state.
    pub failure: Option<String>,
}

impl AlignmentState {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            tabula_id: None,
            viewport: Viewport::ORIGIN,
            search: None,
            saved_dpi: 0.0,
            first_line: None,
            completed: false,
            failure: None,
        }
    }
}

/// Records resolved from an [`AlignmentState`].
#[derive(Debug, Clone)]
pub struct Hydrated {
    pub user: User,
    pub tabula: Tabula,
}

/// Resolves the user and tabula an alignment refers to.
///
/// Missing or foreign records are `WorkflowError::Hydration`; store failures
/// are `WorkflowError::Storage`.
pub fn hydrate(
    state: &AlignmentState,
    users: &dyn UserRepository,
    tabulas: &dyn TabulaRepository,
) -> Result<Hydrated, WorkflowError> {
    let user = users
        .get_user(state.user_id)
        .map_err(WorkflowError::Storage)?
        .ok_or_else(|| WorkflowError::Hydration(format!("user {} no longer exists", state.user_id)))?;
    let tabula_id = state
        .tabula_id
        .ok_or_else(|| WorkflowError::Hydration("no map was selected for alignment".to_string()))?;
    let tabula = tabulas
        .get_tabula(tabula_id)
        .map_err(WorkflowError::Storage)?
        .ok_or_else(|| WorkflowError::Hydration("the map being aligned no longer exists".to_string()))?;
    if tabula.owner != user.id {
        return Err(WorkflowError::Hydration(format!(
            "map `{}` does not belong to {}",
            tabula.name, user.handle
        )));
    }
    Ok(Hydrated { user, tabula })
}

/// Pixel offset of the grid, given one grid line position and the cell size.
pub fn grid_offset(line: f64, dpi: f64) -> i32 {
    let cells = (line / dpi + OFFSET_ROUNDING_BIAS).trunc();
    (line - cells * dpi).round() as i32
}

/// Initial search window of `phase`, or `None` for non-search phases.
pub fn initial_search(phase: AlignmentPhase, state: &AlignmentState) -> Option<BoundedSearch> {
    let left = state.viewport.left as f64;
    let top = state.viewport.top as f64;
    let dpi = state.saved_dpi;
    match phase {
        AlignmentPhase::VerticalA => Some(BoundedSearch::new(
            SearchAxis::Horizontal,
            left,
            left + SEARCH_SPAN,
        )),
        AlignmentPhase::VerticalB => state.first_line.map(|first| {
            let first = first as f64;
            BoundedSearch::new(
                SearchAxis::Horizontal,
                first + SECOND_LINE_NEAR,
                first + SECOND_LINE_FAR,
            )
        }),
        AlignmentPhase::Fine => Some(BoundedSearch::new(
            SearchAxis::Scale,
            dpi * (1.0 - COARSE_SCALE_TOLERANCE),
            dpi * (1.0 + COARSE_SCALE_TOLERANCE),
        )),
        AlignmentPhase::FineBr => Some(BoundedSearch::new(
            SearchAxis::Scale,
            dpi * (1.0 - FINE_SCALE_TOLERANCE),
            dpi * (1.0 + FINE_SCALE_TOLERANCE),
        )),
        AlignmentPhase::Top => Some(BoundedSearch::new(
            SearchAxis::Vertical,
            top,
            top + SEARCH_SPAN,
        )),
        AlignmentPhase::Enter
        | AlignmentPhase::Confirm
        | AlignmentPhase::Exit
        | AlignmentPhase::Error => None,
    }
}

fn phase_prompt(phase: AlignmentPhase) -> &'static str {
    match phase {
        AlignmentPhase::VerticalA => {
            "Find the first vertical grid line. Is the red line left or right of it?"
        }
        AlignmentPhase::VerticalB => {
            "Now the next vertical grid line to its right. Is the red line left or right of it?"
        }
        AlignmentPhase::Fine => {
            "Tuning the grid size. Is the red line left or right of the map's grid line?"
        }
        AlignmentPhase::FineBr => {
            "Checking the far corner. Is the red line left or right of the map's grid line?"
        }
        AlignmentPhase::Top => {
            "Find the first horizontal grid line. Is the red line above or below it?"
        }
        AlignmentPhase::Enter
        | AlignmentPhase::Confirm
        | AlignmentPhase::Exit
        | AlignmentPhase::Error => "",
    }
}

fn progress(search: &BoundedSearch) -> String {
    match search.axis {
        SearchAxis::Scale => format!("(testing {:.2} px per square)", search.candidate()),
        SearchAxis::Horizontal | SearchAxis::Vertical => format!(
            "(testing pixel {}, between {} and {})",
            search.candidate(),
            search.min,
            search.max
        ),
    }
}

/// Draws the red guide for `search` onto a viewport preview.
fn draw_guide(preview: &mut RgbaImage, tabula: &Tabula, view: Viewport, search: &BoundedSearch) {
    let color = Color::RED.to_rgba();
    let last = i64::from(VIEW_SIZE) - 1;
    match search.axis {
        SearchAxis::Horizontal => {
            let x = search.candidate() as i64 - view.left;
            draw_line(preview, PixelPoint::new(x, 0), PixelPoint::new(x, last), color);
        }
        SearchAxis::Vertical => {
            let y = search.candidate() as i64 - view.top;
            draw_line(preview, PixelPoint::new(0, y), PixelPoint::new(last, y), color);
        }
        SearchAxis::Scale => {
            let center = view.left + i64::from(VIEW_SIZE / 2);
            let column = ((center - i64::from(tabula.offset_x)) as f64 / tabula.dpi).round();
            let x = tabula.column_x(column) - view.left;
            draw_line(preview, PixelPoint::new(x, 0), PixelPoint::new(x, last), color);
        }
    }
}

fn fail<'a>(mut state: AlignmentState, reason: String) -> Transition<AlignmentWorkflow<'a>> {
    warn!(
        "event=workflow_hydrate module=workflow status=error workflow=align user={} reason={reason}",
        state.user_id
    );
    state.search = None;
    state.failure = Some(reason);
    Transition::to(AlignmentPhase::Error, state)
}

/// The `align` workflow, bound to its stores and glyph resolver.
pub struct AlignmentWorkflow<'a> {
    users: &'a dyn UserRepository,
    tabulas: &'a dyn TabulaRepository,
    glyphs: &'a dyn GlyphResolver,
    context: String,
    render_timeout: Option<Duration>,
}

impl<'a> AlignmentWorkflow<'a> {
    pub fn new(
        users: &'a dyn UserRepository,
        tabulas: &'a dyn TabulaRepository,
        glyphs: &'a dyn GlyphResolver,
    ) -> Self {
        Self {
            users,
            tabulas,
            glyphs,
            context: String::new(),
            render_timeout: None,
        }
    }

    /// Context whose tokens and marks appear in previews.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = Some(timeout);
        self
    }

    fn compositor(&self) -> Compositor<'a> {
        let options = self
            .render_timeout
            .map(RenderOptions::with_timeout)
            .unwrap_or_default();
        Compositor::new(self.glyphs).with_options(options)
    }

    fn hydrate(&self, state: &AlignmentState) -> Result<Hydrated, WorkflowError> {
        hydrate(state, self.users, self.tabulas)
    }

    fn save(&self, tabula: &Tabula) -> Result<(), WorkflowError> {
        self.tabulas
            .save_tabula(tabula)
            .map_err(WorkflowError::Persistence)
    }

    fn respond_enter(
        &self,
        mut state: AlignmentState,
        choice: &str,
    ) -> Result<Transition<Self>, WorkflowError> {
        let name = choice.trim();
        if name.is_empty() {
            return Err(WorkflowError::Rejected(
                "name the map you want to align".to_string(),
            ));
        }
        let user = match self
            .users
            .get_user(state.user_id)
            .map_err(WorkflowError::Storage)?
        {
            Some(user) => user,
            None => {
                let reason = format!("user {} no longer exists", state.user_id);
                return Ok(fail(state, reason));
            }
        };
        let tabula = match self
            .tabulas
            .find_tabula(user.id, name)
            .map_err(WorkflowError::Storage)?
        {
            Some(tabula) => tabula,
            None => {
                return Err(WorkflowError::Rejected(format!(
                    "{} has no map named `{name}`",
                    user.handle
                )));
            }
        };

        state.tabula_id = Some(tabula.id);
        Ok(Transition::to(AlignmentPhase::Confirm, state))
    }

    fn challenge_confirm(&self, state: &AlignmentState) -> Result<WorkflowMessage, WorkflowError> {
        let Hydrated { tabula, .. } = self.hydrate(state)?;
        let mut text = format!(
            "Aligning `{}` resets its grid and walks you through finding it again. Continue?",
            tabula.name
        );
        if tabula.is_aligned() {
            text.push_str(&format!(
                " The current grid is {:.2} px per square at offset ({}, {}).",
                tabula.dpi, tabula.offset_x, tabula.offset_y
            ));
        }
        Ok(WorkflowMessage::new(text)
            .with_choices(vec![Choice::new("yes", "Yes"), Choice::new("no", "No")]))
    }

    fn respond_confirm(
        &self,
        mut state: AlignmentState,
        choice: &str,
    ) -> Result<Transition<Self>, WorkflowError> {
        match choice.trim().to_ascii_lowercase().as_str() {
            "yes" => {}
            "no" => return Ok(Transition::to(AlignmentPhase::Exit, state)),
            _ => {
                return Err(WorkflowError::InvalidChoice {
                    state: AlignmentPhase::Confirm.name().to_string(),
                    choice: choice.to_string(),
                })
            }
        }

        let mut tabula = match self.hydrate(&state) {
            Ok(hydrated) => hydrated.tabula,
            Err(WorkflowError::Hydration(reason)) => return Ok(fail(state, reason)),
            Err(err) => return Err(err),
        };
        tabula.dpi = DEFAULT_DPI;
        tabula.offset_x = 0;
        tabula.offset_y = 0;
        self.save(&tabula)?;

        state.viewport = Viewport::ORIGIN;
        state.saved_dpi = DEFAULT_DPI;
        state.first_line = None;
        state.completed = false;
        state.search = initial_search(AlignmentPhase::VerticalA, &state);
        Ok(Transition::to(AlignmentPhase::VerticalA, state))
    }

    fn challenge_search(
        &self,
        phase: AlignmentPhase,
        state: &AlignmentState,
    ) -> Result<WorkflowMessage, WorkflowError> {
        let Hydrated { mut tabula, .. } = self.hydrate(state)?;
        let search = state
            .search
            .ok_or_else(|| WorkflowError::Hydration(LOST_PROGRESS.to_string()))?;
        if search.axis == SearchAxis::Scale {
            tabula.dpi = search.candidate();
        }

        let mut preview = self
            .compositor()
            .render(&tabula, &self.context, Some(state.viewport.rect()))?;
        draw_guide(&mut preview, &tabula, state.viewport, &search);

        let mut message = WorkflowMessage::new(format!(
            "{} {}",
            phase_prompt(phase),
            progress(&search)
        ))
        .with_image(preview);
        message.choices = search_choices(search.axis);
        Ok(message)
    }

    fn respond_search(
        &self,
        phase: AlignmentPhase,
        mut state: AlignmentState,
        choice: &str,
    ) -> Result<Transition<Self>, WorkflowError> {
        let Some(mut search) = state.search else {
            return Ok(fail(state, LOST_PROGRESS.to_string()));
        };
        let command =
            SearchCommand::parse(search.axis, choice).ok_or_else(|| WorkflowError::InvalidChoice {
                state: phase.name().to_string(),
                choice: choice.to_string(),
            })?;
        let mut tabula = match self.hydrate(&state) {
            Ok(hydrated) => hydrated.tabula,
            Err(WorkflowError::Hydration(reason)) => return Ok(fail(state, reason)),
            Err(err) => return Err(err),
        };

        match command {
            SearchCommand::Pan(direction) => {
                let (dx, dy) = state.viewport.pan(direction);
                search.follow_pan(dx, dy);
            }
            SearchCommand::Restart => {
                let Some(restarted) = initial_search(phase, &state) else {
                    return Ok(fail(state, LOST_PROGRESS.to_string()));
                };
                search = restarted;
                self.track_scale(&mut tabula, &search)?;
            }
            SearchCommand::Feedback(feedback) => {
                if let Some(value) = search.narrow(feedback) {
                    return self.advance(phase, state, tabula, value);
                }
                self.track_scale(&mut tabula, &search)?;
            }
        }

        state.search = Some(search);
        Ok(Transition::to(phase, state))
    }

    /// Keeps the stored grid size on the scale candidate.
    fn track_scale(&self, tabula: &mut Tabula, search: &BoundedSearch) -> Result<(), WorkflowError> {
        if search.axis != SearchAxis::Scale {
            return Ok(());
        }
        tabula.dpi = search.candidate();
        self.save(tabula)
    }

    /// Applies an accepted search value and moves to the next phase.
    fn advance(
        &self,
        phase: AlignmentPhase,
        mut state: AlignmentState,
        mut tabula: Tabula,
        value: f64,
    ) -> Result<Transition<Self>, WorkflowError> {
        let next = match phase {
            AlignmentPhase::VerticalA => {
                state.first_line = Some(value as i64);
                AlignmentPhase::VerticalB
            }
            AlignmentPhase::VerticalB => {
                let Some(first) = state.first_line else {
                    return Ok(fail(state, LOST_PROGRESS.to_string()));
                };
                let first = first as f64;
                let dpi = value - first;
                if dpi < MIN_RENDER_DPI {
                    return Err(WorkflowError::Rejected(
                        "the second grid line must be to the right of the first one".to_string(),
                    ));
                }
                tabula.dpi = dpi;
                tabula.offset_x = grid_offset(first, dpi);
                state.saved_dpi = dpi;
                AlignmentPhase::Fine
            }
            AlignmentPhase::Fine => {
                tabula.dpi = value;
                state.saved_dpi = value;
                let (width, height) = background_dimensions(&tabula.background)?;
                state.viewport = Viewport::bottom_right(width, height);
                AlignmentPhase::FineBr
            }
            AlignmentPhase::FineBr => {
                tabula.dpi = value;
                state.saved_dpi = value;
                state.viewport = Viewport::ORIGIN;
                AlignmentPhase::Top
            }
            AlignmentPhase::Top => {
                tabula.offset_y = grid_offset(value, tabula.dpi);
                state.completed = true;
                AlignmentPhase::Exit
            }
            AlignmentPhase::Enter
            | AlignmentPhase::Confirm
            | AlignmentPhase::Exit
            | AlignmentPhase::Error => {
                return Err(WorkflowError::NoResponse {
                    workflow: Self::KEY.to_string(),
                    state: phase.name().to_string(),
                })
            }
        };

        self.save(&tabula)?;
        state.search = initial_search(next, &state);
        Ok(Transition::to(next, state))
    }

    fn challenge_exit(&self, state: &AlignmentState) -> Result<WorkflowMessage, WorkflowError> {
        if !state.completed {
            return Ok(WorkflowMessage::new(
                "Alignment cancelled; the map was not changed.",
            ));
        }
        let Hydrated { tabula, .. } = self.hydrate(state)?;
        let image = self.compositor().render(&tabula, &self.context, None)?;
        Ok(WorkflowMessage::new(format!(
            "`{}` is aligned: {:.2} px per square, grid offset ({}, {}).",
            tabula.name, tabula.dpi, tabula.offset_x, tabula.offset_y
        ))
        .with_image(image))
    }

    fn challenge_error(&self, state: &AlignmentState) -> Result<WorkflowMessage, WorkflowError> {
        Ok(WorkflowMessage::new(
            state
                .failure
                .clone()
                .unwrap_or_else(|| "Alignment failed.".to_string()),
        ))
    }

    fn challenge_vertical_a(&self, state: &AlignmentState) -> Result<WorkflowMessage, WorkflowError> {
        self.challenge_search(AlignmentPhase::VerticalA, state)
    }

    fn challenge_vertical_b(&self, state: &AlignmentState) -> Result<WorkflowMessage, WorkflowError> {
        self.challenge_search(AlignmentPhase::VerticalB, state)
    }

    fn challenge_fine(&self, state: &AlignmentState) -> Result<WorkflowMessage, WorkflowError> {
        self.challenge_search(AlignmentPhase::Fine, state)
    }

    fn challenge_fine_br(&self, state: &AlignmentState) -> Result<WorkflowMessage, WorkflowError> {
        self.challenge_search(AlignmentPhase::FineBr, state)
    }

    fn challenge_top(&self, state: &AlignmentState) -> Result<WorkflowMessage, WorkflowError> {
        self.challenge_search(AlignmentPhase::Top, state)
    }

    fn respond_vertical_a(
        &self,
        state: AlignmentState,
        choice: &str,
    ) -> Result<Transition<Self>, WorkflowError> {
        self.respond_search(AlignmentPhase::VerticalA, state, choice)
    }

    fn respond_vertical_b(
        &self,
        state: AlignmentState,
        choice: &str,
    ) -> Result<Transition<Self>, WorkflowError> {
        self.respond_search(AlignmentPhase::VerticalB, state, choice)
    }

    fn respond_fine(
        &self,
        state: AlignmentState,
        choice: &str,
    ) -> Result<Transition<Self>, WorkflowError> {
        self.respond_search(AlignmentPhase::Fine, state, choice)
    }

    fn respond_fine_br(
        &self,
        state: AlignmentState,
        choice: &str,
    ) -> Result<Transition<Self>, WorkflowError> {
        self.respond_search(AlignmentPhase::FineBr, state, choice)
    }

    fn respond_top(
        &self,
        state: AlignmentState,
        choice: &str,
    ) -> Result<Transition<Self>, WorkflowError> {
        self.respond_search(AlignmentPhase::Top, state, choice)
    }
}

impl<'a> Workflow for AlignmentWorkflow<'a> {
    type State = AlignmentPhase;
    type Opaque = AlignmentState;

    const KEY: &'static str = "align";
    const SCHEMA_VERSION: u32 = 1;

    fn seed(&self, user: UserId) -> AlignmentState {
        AlignmentState::new(user)
    }

    fn handlers(&self, state: AlignmentPhase) -> Handlers<Self> {
        match state {
            AlignmentPhase::Enter => Handlers::response_only(Self::respond_enter),
            AlignmentPhase::Confirm => Handlers::both(Self::challenge_confirm, Self::respond_confirm),
            AlignmentPhase::VerticalA => {
                Handlers::both(Self::challenge_vertical_a, Self::respond_vertical_a)
            }
            AlignmentPhase::VerticalB => {
                Handlers::both(Self::challenge_vertical_b, Self::respond_vertical_b)
            }
            AlignmentPhase::Fine => Handlers::both(Self::challenge_fine, Self::respond_fine),
            AlignmentPhase::FineBr => Handlers::both(Self::challenge_fine_br, Self::respond_fine_br),
            AlignmentPhase::Top => Handlers::both(Self::challenge_top, Self::respond_top),
            AlignmentPhase::Exit => Handlers::challenge_only(Self::challenge_exit),
            AlignmentPhase::Error => Handlers::challenge_only(Self::challenge_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{grid_offset, initial_search, AlignmentPhase, AlignmentState};
    use crate::workflow::engine::StateName;
    use crate::workflow::search::{SearchAxis, Viewport};
    use uuid::Uuid;

    #[test]
    fn grid_offset_snaps_to_the_first_cell() {
        assert_eq!(grid_offset(130.0, 50.0), 30);
        assert_eq!(grid_offset(30.0, 50.0), 30);
        // Within a fifth of a cell of the next line.
        assert_eq!(grid_offset(45.0, 50.0), -5);
        assert_eq!(grid_offset(41.0, 50.0), -9);
        assert_eq!(grid_offset(0.0, 47.5), 0);
    }

    #[test]
    fn phase_names_parse_case_insensitively() {
        assert_eq!(AlignmentPhase::parse("FINE_BR"), Some(AlignmentPhase::FineBr));
        assert_eq!(AlignmentPhase::parse(" vertical_a "), Some(AlignmentPhase::VerticalA));
        assert_eq!(AlignmentPhase::parse("vertical"), None);
        for phase in AlignmentPhase::ALL {
            assert_eq!(AlignmentPhase::parse(phase.name()), Some(*phase));
        }
    }

    #[test]
    fn initial_windows_follow_the_viewport() {
        let mut state = AlignmentState::new(Uuid::new_v4());
        state.viewport = Viewport::at(150, 250);
        state.saved_dpi = 40.0;
        state.first_line = Some(170);

        let a = initial_search(AlignmentPhase::VerticalA, &state).expect("column search");
        assert_eq!((a.axis, a.min, a.max), (SearchAxis::Horizontal, 150.0, 510.0));

        let b = initial_search(AlignmentPhase::VerticalB, &state).expect("second line");
        assert_eq!((b.min, b.max), (175.0, 265.0));
        assert_eq!(b.candidate(), 220.0);

        let fine = initial_search(AlignmentPhase::Fine, &state).expect("scale search");
        assert!((fine.min - 36.0).abs() < 1e-9 && (fine.max - 44.0).abs() < 1e-9);

        let top = initial_search(AlignmentPhase::Top, &state).expect("row search");
        assert_eq!((top.axis, top.min, top.max), (SearchAxis::Vertical, 250.0, 610.0));

        assert!(initial_search(AlignmentPhase::Exit, &state).is_none());
    }

    #[test]
    fn second_line_window_needs_the_first_line() {
        let state = AlignmentState::new(Uuid::new_v4());
        assert!(initial_search(AlignmentPhase::VerticalB, &state).is_none());
    }
}

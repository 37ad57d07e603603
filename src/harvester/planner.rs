//! Feed planner: harvest mode to an ordered list of windows
//!
//! The window arithmetic lives in pure functions ([`full_windows`],
//! [`explicit_windows`], [`incremental_windows`]); [`plan`] wraps them with the
//! checkpoint side effects each mode needs.

use super::PlanError;
use crate::identifier::{CnnvdIdentifier, Window, MAX_MONTH, MIN_MONTH};
use crate::resume::{Checkpoint, CheckpointStore};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Harvest mode selector as typed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// `all`
    Full,
    /// `specific`
    Explicit,
    /// `increment`
    Incremental,
}

impl FromStr for ModeKind {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "full" => Ok(ModeKind::Full),
            "specific" | "explicit" => Ok(ModeKind::Explicit),
            "increment" | "incremental" => Ok(ModeKind::Incremental),
            _ => Err(PlanError::UnsupportedMode(s.to_string())),
        }
    }
}

/// Harvest mode with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestMode {
    /// Every month from 1988-01 through the current month
    Full,
    /// One month, or the whole year when `month` is the current month
    Explicit {
        /// Requested year
        year: i32,
        /// Requested month
        month: u32,
    },
    /// Months after the checkpoint, when the checkpoint is due
    Incremental,
}

impl HarvestMode {
    /// Build a mode from its command-line name and the explicit year/month
    ///
    /// Year and month are ignored by every mode but `specific`.
    pub fn from_args(kind: &str, year: i32, month: u32) -> Result<Self, PlanError> {
        Ok(match kind.parse::<ModeKind>()? {
            ModeKind::Full => HarvestMode::Full,
            ModeKind::Explicit => HarvestMode::Explicit { year, month },
            ModeKind::Incremental => HarvestMode::Incremental,
        })
    }
}

impl fmt::Display for HarvestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvestMode::Full => write!(f, "all"),
            HarvestMode::Explicit { year, month } => write!(f, "specific {year}-{month:02}"),
            HarvestMode::Incremental => write!(f, "increment"),
        }
    }
}

/// Outcome of planning: the windows to harvest and the state to extend
#[derive(Debug, Clone)]
pub struct FeedPlan {
    /// Mode the plan was made for
    pub mode: HarvestMode,
    /// Windows in ascending order
    pub windows: Vec<Window>,
    /// Checkpoint the run starts from
    pub baseline: Checkpoint,
    /// False when an incremental run is not due yet
    pub due: bool,
}

/// Every window from `floor` through `current`, inclusive
pub fn full_windows(floor: Window, current: Window) -> Vec<Window> {
    let mut windows = Vec::new();
    let mut window = floor;
    while window <= current {
        windows.push(window);
        window = window.next();
    }
    windows
}

/// Windows of an explicit request
///
/// A month other than the current calendar month selects that single window;
/// the current month selects all twelve months of `year`.
pub fn explicit_windows(year: i32, month: u32, current: Window) -> Result<Vec<Window>, PlanError> {
    let requested = Window::new(year, month)?;
    if month != current.month {
        return Ok(vec![requested]);
    }
    (MIN_MONTH..=MAX_MONTH)
        .map(|m| Window::new(year, m).map_err(PlanError::from))
        .collect()
}

/// Windows of an incremental run starting from the latest known window
///
/// Years before the current one are walked from their first pending month
/// through December. The current year stops before the current month, which
/// is picked up once it has closed. The latest known month is always
/// re-queried to catch records published after the previous run.
pub fn incremental_windows(latest: Window, current: Window) -> Vec<Window> {
    let mut windows = Vec::new();
    for year in latest.year..=current.year {
        let start = if year == latest.year {
            latest.month
        } else {
            MIN_MONTH
        };
        let end = if year == current.year {
            current.month
        } else {
            MAX_MONTH + 1
        };
        windows.extend((start..end).map(|month| Window { year, month }));
    }
    windows
}

/// Check the parameters of a mode without touching the checkpoint
///
/// Only explicit windows carry parameters that can be out of bounds.
pub fn validate(mode: HarvestMode) -> Result<(), PlanError> {
    if let HarvestMode::Explicit { year, month } = mode {
        Window::new(year, month)?;
    }
    Ok(())
}

/// Plan a harvest and apply the checkpoint side effects of the mode
///
/// - `Full` re-initializes the checkpoint and starts from zero.
/// - `Explicit` re-initializes the checkpoint, then reads it back.
/// - `Incremental` reads the checkpoint and fails with
///   [`CheckpointUnreadable`](crate::resume::CheckpointError::Unreadable)
///   if it is missing or corrupt.
///
/// Explicit windows are validated before anything is written.
pub fn plan(
    mode: HarvestMode,
    store: &CheckpointStore,
    now: DateTime<Utc>,
) -> Result<FeedPlan, PlanError> {
    let current = Window::containing(now);

    let plan = match mode {
        HarvestMode::Full => {
            let baseline = store.init(now)?;
            FeedPlan {
                mode,
                windows: full_windows(Window::floor(), current),
                baseline,
                due: true,
            }
        }
        HarvestMode::Explicit { year, month } => {
            let windows = explicit_windows(year, month, current)?;
            store.init(now)?;
            let baseline = store.read()?;
            FeedPlan {
                mode,
                windows,
                baseline,
                due: true,
            }
        }
        HarvestMode::Incremental => {
            let baseline = store.read()?;
            if baseline.is_due(now) {
                let latest = baseline.latest()?;
                FeedPlan {
                    mode,
                    windows: incremental_windows(latest.window(), current),
                    baseline,
                    due: true,
                }
            } else {
                info!(
                    next_run = %baseline.next_scheduled_run(),
                    "Incremental run not due yet"
                );
                FeedPlan {
                    mode,
                    windows: Vec::new(),
                    baseline,
                    due: false,
                }
            }
        }
    };

    info!(
        mode = %plan.mode,
        windows = plan.windows.len(),
        first = ?plan.windows.first(),
        last = ?plan.windows.last(),
        "Planned harvest"
    );
    Ok(plan)
}

impl FeedPlan {
    /// Latest identifier recorded by the baseline checkpoint
    pub fn baseline_latest(&self) -> Result<CnnvdIdentifier, PlanError> {
        Ok(self.baseline.latest()?)
    }
}

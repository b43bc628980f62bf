//! The state behind every hook: the outcome of loading the level document, and whether the player
//! is currently looking at the main level list.

use std::{
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use super::config::{self, Config, LoadError};
use crate::game::patches::{self, PatchTarget};

/// Shown for a level page whose id doesn't correspond to any custom level.
pub const BROKEN_LEVEL_NAME: &str = "Error :/";

/// The game stores star counts as `rand - seed`, with `rand` fixed at this value.
const STARS_BASE: i32 = 1000;

/// The derived id of a page that isn't a main level at all (the "coming soon" page).
const NOT_A_LEVEL: i32 = -1;

/// The parts of a game level that an override rewrites.
pub trait LevelFields {
    fn set_stars(&mut self, rand: i32, seed: i32);
    fn set_difficulty(&mut self, difficulty: i32);
    fn set_name(&mut self, name: &str) -> eyre::Result<()>;
}

/// The values a level page should show instead of the built-in ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelOverride<'a> {
    pub name: &'a str,
    pub difficulty: i32,
    pub stars_rand: i32,
    pub stars_seed: i32,
}

impl<'a> LevelOverride<'a> {
    fn new(name: &'a str, difficulty: i32, stars: i32) -> LevelOverride<'a> {
        LevelOverride {
            name,
            difficulty,
            stars_rand: STARS_BASE,
            stars_seed: STARS_BASE - stars,
        }
    }

    /// Used when the game asks about a page we have no level for.
    fn broken() -> LevelOverride<'static> {
        LevelOverride::new(BROKEN_LEVEL_NAME, 1, 1)
    }

    /// Returns the star count the game will display.
    pub fn stars(&self) -> i32 {
        self.stars_rand - self.stars_seed
    }

    /// Writes the override into `level`. The name is written last, so the numbers are in place
    /// even if the name can't be.
    pub fn write_to(&self, level: &mut dyn LevelFields) -> eyre::Result<()> {
        level.set_stars(self.stars_rand, self.stars_seed);
        level.set_difficulty(self.difficulty);
        level.set_name(self.name)
    }
}

pub struct Customizer {
    outcome: Result<Config, LoadError>,

    /// Set while the main level select is open.
    browsing: AtomicBool,
}

impl Customizer {
    pub fn new(outcome: Result<Config, LoadError>) -> Customizer {
        Customizer {
            outcome,
            browsing: AtomicBool::new(false),
        }
    }

    /// Loads the level document at `path` and, if it's valid, patches the game through `target`
    /// so that it accepts the new level list. Loading and patching always happen together.
    pub fn initialise(path: impl AsRef<Path>, target: &mut dyn PatchTarget) -> Customizer {
        let outcome = config::load(path);

        match &outcome {
            Ok(config) => patches::apply(config, target),
            Err(err) => log::warn!("Not patching the game because loading failed: {err}"),
        }

        Customizer::new(outcome)
    }

    /// Returns the loaded config, or `None` if loading failed.
    pub fn config(&self) -> Option<&Config> {
        self.outcome.as_ref().ok()
    }

    pub fn load_error(&self) -> Option<LoadError> {
        self.outcome.as_ref().err().copied()
    }

    pub fn enter_browsing(&self) {
        log::debug!("Entered main level select");
        self.browsing.store(true, Ordering::SeqCst);
    }

    pub fn exit_browsing(&self) {
        log::debug!("Left main level select");
        self.browsing.store(false, Ordering::SeqCst);
    }

    pub fn is_browsing(&self) -> bool {
        self.browsing.load(Ordering::SeqCst)
    }

    /// Returns the config only if it loaded and the main level select is open. Every query goes
    /// through this.
    fn active_config(&self) -> Option<&Config> {
        self.config().filter(|_| self.is_browsing())
    }

    /// Works out what a level page should show for the level with the given derived id (the
    /// difference between its id's rand and seed fields). Ids are 1-based. `None` means the page
    /// should be left alone.
    pub fn level_override(&self, derived_id: i32) -> Option<LevelOverride<'_>> {
        let config = self.active_config()?;

        if derived_id == NOT_A_LEVEL {
            return None;
        }

        let level = usize::try_from(derived_id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| config.levels.get(index));

        Some(match level {
            Some(level) => LevelOverride::new(&level.name, level.difficulty, level.stars),

            None => {
                log::warn!("Level page asked for unknown level {derived_id}");
                LevelOverride::broken()
            }
        })
    }

    /// Returns the song for the 0-based level `index`, or `None` if the game's own choice should
    /// stand.
    pub fn audio_track(&self, index: i32) -> Option<&str> {
        let config = self.active_config()?;

        usize::try_from(index)
            .ok()
            .and_then(|index| config.levels.get(index))
            .map(|level| level.song.as_str())
    }
}

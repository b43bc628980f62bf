//! Loads and validates the level document.
//!
//! The document is checked in a fixed order and the first problem found decides the outcome, so
//! the user is only ever told about one thing at a time. A document that fails validation never
//! yields a partially-filled table.

use std::{fmt, ops::RangeInclusive, path::Path};

use serde::Deserialize;
use serde_json::{Map, Value};
use strum::{EnumIter, IntoStaticStr};

use super::resources::CONFIG_FILE_NAME;

/// The largest number of levels the level select can hold.
pub const MAX_LEVELS: usize = 126;

const NAME_LENGTHS: RangeInclusive<usize> = 1..=100;
const DIFFICULTIES: RangeInclusive<i64> = 1..=6;
const STARS: RangeInclusive<i64> = 1..=9999;

/// The reasons a level document can be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum LoadError {
    /// The document doesn't exist or couldn't be opened.
    FileNotFound,

    /// The document isn't JSON, or is missing a field, or has a field of the wrong type.
    ParsingError,

    /// There are no levels, or more than `MAX_LEVELS`.
    LevelsCountError,

    /// A level has an empty name or one longer than 100 bytes.
    LevelNameLengthError,

    /// A level's difficulty is outside 1 to 6.
    LevelDifficultyError,

    /// A level's star count is outside 1 to 9999.
    LevelStarsCountError,
}

impl LoadError {
    /// Returns the message shown to the user on the main menu.
    pub fn message(self) -> &'static str {
        match self {
            LoadError::FileNotFound => "Can't find 'levelCustomizer.json' in ./Resources",
            LoadError::ParsingError => "Can't parse 'levelCustomizer.json'",
            LoadError::LevelsCountError => "Too many or too few levels in 'levelCustomizer.json'",
            LoadError::LevelNameLengthError => {
                "Levelname is too long or empty 'levelCustomizer.json'"
            }
            LoadError::LevelDifficultyError => {
                "Difficulty should be between 1 and 6 in 'levelCustomizer.json'"
            }
            LoadError::LevelStarsCountError => "Too many stars for level in 'levelCustomizer.json'",
        }
    }

    /// Returns the variant name, for logging.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for LoadError {}

/// A single custom main level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Level {
    pub name: String,

    /// The difficulty face, from 1 (easy) to 6 (demon).
    pub difficulty: i32,

    pub stars: i32,

    /// The audio file the level plays.
    pub song: String,
}

/// A fully validated level document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Whether the demon level gates should be removed.
    pub unlock_demons: bool,

    /// The levels in the order they appear in the document. Never empty, and never longer than
    /// `MAX_LEVELS`.
    pub levels: Vec<Level>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    unlock_demons: bool,
}

#[derive(Deserialize)]
struct RawLevel {
    name: String,
    difficulty: i64,
    stars: i64,
    song: String,
}

impl RawLevel {
    /// Deserializes a level entry. Anything other than an object with all four fields is a
    /// parsing error; extra fields are ignored.
    fn from_value(value: Value) -> Result<RawLevel, LoadError> {
        match value {
            Value::Object(map) => {
                serde_json::from_value(Value::Object(map)).map_err(|_| LoadError::ParsingError)
            }
            _ => Err(LoadError::ParsingError),
        }
    }

    fn validate(self) -> Result<Level, LoadError> {
        if !NAME_LENGTHS.contains(&self.name.len()) {
            return Err(LoadError::LevelNameLengthError);
        }

        if !DIFFICULTIES.contains(&self.difficulty) {
            return Err(LoadError::LevelDifficultyError);
        }

        if !STARS.contains(&self.stars) {
            return Err(LoadError::LevelStarsCountError);
        }

        // Both values were range checked above, so they fit.
        Ok(Level {
            name: self.name,
            difficulty: self.difficulty as i32,
            stars: self.stars as i32,
            song: self.song,
        })
    }
}

/// Removes `key` from `root` if it holds an object.
fn take_object(root: &mut Map<String, Value>, key: &str) -> Result<Map<String, Value>, LoadError> {
    match root.remove(key) {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(LoadError::ParsingError),
    }
}

/// Removes `key` from `root` if it holds an array.
fn take_array(root: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>, LoadError> {
    match root.remove(key) {
        Some(Value::Array(values)) => Ok(values),
        _ => Err(LoadError::ParsingError),
    }
}

/// Validates the contents of a level document.
pub fn parse(bytes: &[u8]) -> Result<Config, LoadError> {
    let mut root: Map<String, Value> =
        serde_json::from_slice(bytes).map_err(|_| LoadError::ParsingError)?;

    // Both top-level fields have to be the right shape before anything inside them is looked at.
    let settings = take_object(&mut root, "settings")?;
    let entries = take_array(&mut root, "levels")?;

    let settings: RawSettings =
        serde_json::from_value(Value::Object(settings)).map_err(|_| LoadError::ParsingError)?;

    if entries.is_empty() || entries.len() > MAX_LEVELS {
        return Err(LoadError::LevelsCountError);
    }

    // Each entry is fully checked before the next one is read, so an early range error wins over
    // a later type error.
    let levels = entries
        .into_iter()
        .map(|entry| RawLevel::from_value(entry)?.validate())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Config {
        unlock_demons: settings.unlock_demons,
        levels,
    })
}

/// Reads and validates the level document at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Config, LoadError> {
    let path = path.as_ref();

    log::info!("Loading levels from {}", path.display());

    let bytes = std::fs::read(path).map_err(|err| {
        log::error!("Unable to read {CONFIG_FILE_NAME}: {err}");
        LoadError::FileNotFound
    })?;

    match parse(&bytes) {
        Ok(config) => {
            log::info!(
                "Loaded {} levels (demons {}).",
                config.levels.len(),
                if config.unlock_demons {
                    "unlocked"
                } else {
                    "locked"
                }
            );

            Ok(config)
        }

        Err(err) => {
            log::error!("Rejected {CONFIG_FILE_NAME}: {} ({err})", err.name());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn level(name: &str, difficulty: i64, stars: i64) -> Value {
        json!({ "name": name, "difficulty": difficulty, "stars": stars, "song": "song.mp3" })
    }

    fn document(unlock_demons: bool, levels: Vec<Value>) -> Vec<u8> {
        json!({ "settings": { "unlockDemons": unlock_demons }, "levels": levels })
            .to_string()
            .into_bytes()
    }

    fn parse_levels(levels: Vec<Value>) -> Result<Config, LoadError> {
        parse(&document(false, levels))
    }

    #[test]
    fn keeps_document_order() {
        let config = parse(&document(
            true,
            vec![level("First", 1, 1), level("Second", 6, 9999), level("Third", 3, 42)],
        ))
        .unwrap();

        assert!(config.unlock_demons);

        let names: Vec<_> = config.levels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["First", "Second", "Third"]);

        assert_eq!(
            config.levels[1],
            Level {
                name: "Second".into(),
                difficulty: 6,
                stars: 9999,
                song: "song.mp3".into(),
            }
        );
    }

    #[test]
    fn level_count_bounds() {
        assert_eq!(parse_levels(vec![]), Err(LoadError::LevelsCountError));

        let full = vec![level("Level", 2, 5); MAX_LEVELS];
        assert_eq!(parse_levels(full).unwrap().levels.len(), MAX_LEVELS);

        let too_many = vec![level("Level", 2, 5); MAX_LEVELS + 1];
        assert_eq!(parse_levels(too_many), Err(LoadError::LevelsCountError));
    }

    #[test]
    fn count_is_checked_before_entries() {
        let mut entries = vec![json!(5); MAX_LEVELS + 1];
        entries[0] = level("", 0, 0);
        assert_eq!(parse_levels(entries), Err(LoadError::LevelsCountError));
    }

    #[test]
    fn name_length_bounds() {
        assert_eq!(parse_levels(vec![level("", 1, 1)]), Err(LoadError::LevelNameLengthError));
        assert!(parse_levels(vec![level(&"a".repeat(100), 1, 1)]).is_ok());
        assert_eq!(
            parse_levels(vec![level(&"a".repeat(101), 1, 1)]),
            Err(LoadError::LevelNameLengthError)
        );
    }

    #[test]
    fn difficulty_bounds() {
        assert_eq!(parse_levels(vec![level("L", 0, 1)]), Err(LoadError::LevelDifficultyError));
        assert_eq!(parse_levels(vec![level("L", 7, 1)]), Err(LoadError::LevelDifficultyError));
        assert!(parse_levels(vec![level("L", 1, 1), level("L", 6, 1)]).is_ok());
    }

    #[test]
    fn star_bounds() {
        assert_eq!(parse_levels(vec![level("L", 1, 0)]), Err(LoadError::LevelStarsCountError));
        assert_eq!(
            parse_levels(vec![level("L", 1, 10000)]),
            Err(LoadError::LevelStarsCountError)
        );
        assert_eq!(parse_levels(vec![level("L", 1, -5)]), Err(LoadError::LevelStarsCountError));
    }

    #[test]
    fn range_checks_run_in_order() {
        // Every value is bad, so the name check has to win.
        assert_eq!(parse_levels(vec![level("", 0, 0)]), Err(LoadError::LevelNameLengthError));
        assert_eq!(parse_levels(vec![level("L", 0, 0)]), Err(LoadError::LevelDifficultyError));
    }

    #[test]
    fn first_bad_entry_stops_validation() {
        // The second entry would be a parsing error, but the first entry is rejected first.
        let entries = vec![level("L", 9, 1), json!({ "name": 5 })];
        assert_eq!(parse_levels(entries), Err(LoadError::LevelDifficultyError));

        let entries = vec![json!({ "name": 5 }), level("L", 9, 1)];
        assert_eq!(parse_levels(entries), Err(LoadError::ParsingError));
    }

    #[test]
    fn malformed_documents() {
        let cases = [
            "",
            "{",
            "[]",
            "{}",
            r#"{ "levels": [] }"#,
            r#"{ "settings": {} , "levels": [] }"#,
            r#"{ "settings": [true], "levels": [] }"#,
            r#"{ "settings": { "unlockDemons": 1 }, "levels": [] }"#,
            r#"{ "settings": { "unlockDemons": true }, "levels": {} }"#,
        ];

        for case in cases {
            assert_eq!(parse(case.as_bytes()), Err(LoadError::ParsingError), "{case}");
        }
    }

    #[test]
    fn invalid_utf8_is_a_parsing_error() {
        let mut bytes = br#"{ "settings": { "unlockDemons": false }, "levels": [{ "name": "#.to_vec();
        bytes.extend_from_slice(b"\"\xff\xfe\"");
        bytes.extend_from_slice(br#", "difficulty": 1, "stars": 1, "song": "a.mp3" }] }"#);

        assert_eq!(parse(&bytes), Err(LoadError::ParsingError));
    }

    #[test]
    fn entries_need_every_field_with_the_right_type() {
        let bad_entries = [
            json!({ "difficulty": 1, "stars": 1, "song": "s" }),
            json!({ "name": "L", "stars": 1, "song": "s" }),
            json!({ "name": "L", "difficulty": 1, "song": "s" }),
            json!({ "name": "L", "difficulty": 1, "stars": 1 }),
            json!({ "name": "L", "difficulty": 1.5, "stars": 1, "song": "s" }),
            json!({ "name": "L", "difficulty": 1, "stars": "1", "song": "s" }),
            json!({ "name": "L", "difficulty": 1, "stars": 1, "song": 3 }),
            json!(["L", 1, 1, "s"]),
            json!("L"),
        ];

        for entry in bad_entries {
            assert_eq!(
                parse_levels(vec![entry.clone()]),
                Err(LoadError::ParsingError),
                "{entry}"
            );
        }
    }

    #[test]
    fn extra_fields_are_ignored() {
        let bytes = json!({
            "settings": { "unlockDemons": false, "theme": "dark" },
            "levels": [{ "name": "L", "difficulty": 2, "stars": 3, "song": "", "author": "me" }],
            "version": 2
        })
        .to_string();

        let config = parse(bytes.as_bytes()).unwrap();
        assert!(!config.unlock_demons);
        assert_eq!(config.levels[0].song, "");
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load(dir.path().join("levelCustomizer.json")),
            Err(LoadError::FileNotFound)
        );
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levelCustomizer.json");
        std::fs::write(&path, document(false, vec![level("Disk", 4, 12)])).unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.levels.len(), 1);
        assert_eq!(config.levels[0].stars, 12);
    }

    #[test]
    fn every_error_names_the_document() {
        for error in LoadError::iter() {
            assert!(error.message().contains("levelCustomizer.json"), "{error:?}");
            assert_eq!(error.to_string(), error.message());
        }
    }
}

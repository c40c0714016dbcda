use draftboard_core::OutlineConfig;

const DOCUMENTATION: &str = r#"# Draftboard preferences. You may edit this file, but be aware that formatting and comments will not
# be preserved, and all keys are case sensitive.

# log_level: one of "off", "error", "warn", "info", "debug", "trace", in any case.
# [outline]
# history_depth: how many steps can be undone. 0 disables undo.
# select_created: whether newly created items become the selection.

# Example:
# log_level = "debug"
# [outline]
# history_depth = 256
# select_created = true

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: log::LevelFilter,
    pub outline: OutlineConfig,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: log::LevelFilter::Debug,
            outline: OutlineConfig::default(),
        }
    }
}

/// Why the user's preferences couldn't be used.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadFailure {
    /// No preference directory on this platform.
    NoPath,
    /// There is no file yet.
    NotFound,
    /// The file exists but couldn't be read.
    Unreadable,
    /// The file was read but isn't valid preferences.
    Malformed,
}

pub struct Preferences {
    failure: Option<LoadFailure>,
    pub settings: Settings,
}
impl Preferences {
    const FILENAME: &'static str = "preferences.toml";
    /// Shared global preferences, loaded from the user's preference directory.
    /// (Or defaulted, if unavailable for some reason)
    #[must_use]
    pub fn get() -> &'static Self {
        static GLOBAL_PREFERENCES: std::sync::OnceLock<Preferences> = std::sync::OnceLock::new();

        GLOBAL_PREFERENCES.get_or_init(|| {
            let mut dir = preferences_dir();
            match dir.as_mut() {
                None => Self::no_path(),
                Some(dir) => {
                    dir.push(Self::FILENAME);
                    Self::load_or_default(dir)
                }
            }
        })
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Preferences weren't available, defaulting.");
        Self::defaulted(LoadFailure::NoPath)
    }
    fn defaulted(failure: LoadFailure) -> Self {
        Self {
            failure: Some(failure),
            settings: Settings::default(),
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let settings: Result<Settings, LoadFailure> = try_block::try_block! {
            let string = std::fs::read_to_string(path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    log::info!("no preferences at {path:?}, defaulting.");
                    LoadFailure::NotFound
                } else {
                    log::warn!("couldn't read {path:?}, defaulting: {e}");
                    LoadFailure::Unreadable
                }
            })?;
            Ok(Self::parse(&string).map_err(|e| {
                log::warn!("{path:?} is malformed and will be left alone, defaulting:\n{e}");
                LoadFailure::Malformed
            })?)
        };

        match settings {
            Ok(settings) => Self {
                failure: None,
                settings,
            },
            Err(failure) => Self::defaulted(failure),
        }
    }
    fn parse(string: &str) -> Result<Settings, toml::de::Error> {
        toml::from_str(string)
    }
    /// Return true if loading user's settings failed. This can be useful for
    /// displaying a warning.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failure.is_some()
    }
    #[must_use]
    pub fn load_failure(&self) -> Option<LoadFailure> {
        self.failure
    }
    /// Whether saving would create the file rather than overwrite one the user has written.
    #[must_use]
    pub fn should_write_defaults(&self) -> bool {
        self.failure == Some(LoadFailure::NotFound)
    }
    fn to_file_contents(&self) -> anyhow::Result<String> {
        let string = toml::ser::to_string_pretty(&self.settings)?;
        // Prefix some documentation.
        Ok(DOCUMENTATION.to_owned() + &string)
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Explicity do *not* create recursively. If not found, the user probably has a good reason.
        // Ignore errors (could already exist). Any real errors will be emitted by file access below.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        std::fs::write(preferences, self.to_file_contents()?)?;
        Ok(())
    }
}

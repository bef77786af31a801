//! Configuration and run files
//!
//! Files live under the user's home directory:
//! * `$HOME/.config/.splitkeeper`: the configuration (TOML)
//! * `$HOME/.splitkeeper/<run name>.toml`: one file per run definition
//! * `$HOME/.splitkeeper/logs.txt`
//!
//! LiveSplit splits files (`.lss`) can be imported and exported.
use crate::config::ComparisonConfig;
use crate::definition::{RunDefinition, SegmentDefinition};
use crate::time::{Accuracy, Time};
use crate::Command;
use itertools::Itertools;
use livesplit_core::run::parser::composite;
use livesplit_core::run::saver::livesplit;
use livesplit_core::{Run as LssRun, Segment as LssSegment, Time as LssTime, TimeSpan};
use log::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::{fmt, fs};
use walkdir::WalkDir;

const APP_DIR: &str = ".splitkeeper";
const RUN_FILE_EXTENSION: &str = "toml";

fn home() -> Result<PathBuf, Error> {
    // NOTE: with sudo, HOME is /root which is usually not desired
    let home = std::env::var("HOME").map_err(|e| Error::User(format!("{e}")))?;
    Ok(PathBuf::from(home))
}

/// Returns "$HOME/.config/.splitkeeper" expanded
pub fn default_config_path() -> Result<PathBuf, Error> {
    Ok(home()?.join(".config").join(APP_DIR))
}

/// Returns "$HOME/.splitkeeper" expanded
pub fn default_data_folder() -> Result<PathBuf, Error> {
    Ok(home()?.join(APP_DIR))
}

/// Returns "$HOME/.splitkeeper/logs.txt" expanded
pub fn default_log_file_path() -> Result<PathBuf, Error> {
    Ok(default_data_folder()?.join("logs.txt"))
}

#[derive(Debug, Eq, PartialEq, Hash)]
pub enum Error {
    ConfigFileOpen(String),
    ConfigFileRead(String),
    ConfigCreate(String),
    Keybinding(String),
    DataFolder(String),
    Run(String),
    Import(String),
    Export(String),
    User(String),
    /// User refused to create a missing file
    UserCancel,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg: String = match self {
            Error::ConfigFileOpen(msg) => format!("Could not open configuration file: {msg}"),
            Error::ConfigFileRead(msg) => format!("Could not read configuration file: {msg}"),
            Error::ConfigCreate(msg) => format!("Error while creating configuration: {msg}"),
            Error::Keybinding(msg) => format!("Invalid keybinding: {msg}"),
            Error::DataFolder(msg) => format!("Error while using data folder: {msg}"),
            Error::Run(msg) => format!("Error happened with run file: {msg}"),
            Error::Import(msg) => format!("Could not import splits file: {msg}"),
            Error::Export(msg) => format!("Could not export splits file: {msg}"),
            Error::User(msg) => format!("Error while configuring user files: {msg}"),
            Error::UserCancel => "User cancelled configuration creation".to_string(),
        };
        write!(f, "{msg}")
    }
}

impl std::error::Error for Error {}

/// What a key typed by the user does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Timer(Command),
    Quit,
}

/// Keys (lines typed on stdin) bound to timer commands. The split key also
/// starts the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keybinding {
    pub split: String,
    pub unsplit: String,
    pub skip: String,
    pub pause: String,
    pub resume: String,
    pub stop: String,
    pub reset: String,
    pub quit: String,
}

impl Default for Keybinding {
    fn default() -> Self {
        Self {
            split: "s".to_string(),
            unsplit: "u".to_string(),
            skip: "k".to_string(),
            pause: "p".to_string(),
            resume: "r".to_string(),
            stop: "x".to_string(),
            reset: "z".to_string(),
            quit: "q".to_string(),
        }
    }
}

impl Keybinding {
    fn bindings(&self) -> [(&str, Action); 8] {
        [
            (self.split.as_str(), Action::Timer(Command::Split)),
            (self.unsplit.as_str(), Action::Timer(Command::Unsplit)),
            (self.skip.as_str(), Action::Timer(Command::Skip)),
            (self.pause.as_str(), Action::Timer(Command::Pause)),
            (self.resume.as_str(), Action::Timer(Command::Resume)),
            (self.stop.as_str(), Action::Timer(Command::Stop)),
            (self.reset.as_str(), Action::Timer(Command::Reset)),
            (self.quit.as_str(), Action::Quit),
        ]
    }

    /// All keys need to be non-empty and bound to a different action
    pub fn validate(&self) -> Result<(), Error> {
        let keys = self.bindings().map(|(k, _)| k.trim());
        if keys.iter().any(|k| k.is_empty()) {
            return Err(Error::Keybinding("keys cannot be empty".to_string()));
        }
        if !keys.iter().all_unique() {
            return Err(Error::Keybinding(
                "All keys need to be bound to a different key".to_string(),
            ));
        }
        Ok(())
    }

    pub fn action(&self, key: &str) -> Option<Action> {
        let key = key.trim();
        self.bindings()
            .into_iter()
            .find(|(k, _)| k.trim() == key)
            .map(|(_, a)| a)
    }

    /// One line per key, for help messages
    pub fn describe(&self) -> String {
        self.bindings()
            .iter()
            .map(|(k, a)| match a {
                Action::Timer(Command::Split) => format!("{k:>3}: start/split"),
                Action::Timer(c) => format!("{k:>3}: {c}"),
                Action::Quit => format!("{k:>3}: save and quit"),
            })
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub data_folder_path: PathBuf,
    // open default run
    pub use_default_run: bool,
    pub default_run_name: Option<String>,
    #[serde(default)]
    pub accuracy: Accuracy,
    #[serde(default)]
    pub comparison: ComparisonConfig,
    #[serde(default)]
    pub keybinding: Keybinding,
}

impl Configuration {
    pub fn new(data_folder_path: PathBuf) -> Configuration {
        Configuration {
            data_folder_path,
            use_default_run: true,
            default_run_name: None,
            accuracy: Accuracy::default(),
            comparison: ComparisonConfig::default(),
            keybinding: Keybinding::default(),
        }
    }

    /// Parse configuration file at `path`
    pub fn load(path: &Path) -> Result<Configuration, Error> {
        trace!("Parsing configuration file");
        let mut file = File::open(path).map_err(|e| Error::ConfigFileOpen(e.to_string()))?;
        let mut config = String::new();
        file.read_to_string(&mut config)
            .map_err(|e| Error::ConfigFileRead(e.to_string()))?;
        let config: Configuration =
            toml::from_str(config.as_str()).map_err(|e| Error::ConfigFileRead(e.to_string()))?;
        config.keybinding.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::ConfigCreate(format!("{e}")))?;
        }
        let mut file = File::create(path).map_err(|e| Error::ConfigFileOpen(format!("{e}")))?;
        let content = toml::to_string(self).map_err(|e| Error::ConfigCreate(format!("{e}")))?;
        file.write_all(content.as_bytes())
            .map_err(|e| Error::ConfigCreate(format!("{e}")))?;
        info!("Configuration file saved");
        Ok(())
    }
}

/// Ask a yes/no `question` on stdout and read the answer from `input`
fn ask<R: BufRead>(input: &mut R, question: &str) -> Result<bool, Error> {
    print!("{question} [y/N] ");
    std::io::stdout()
        .flush()
        .map_err(|e| Error::User(format!("{e}")))?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|e| Error::User(format!("{e}")))?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Parse configuration file at default path. When missing, create it if
/// `accept_creation` is set or the user agrees.
pub fn parse_configuration(accept_creation: bool) -> Result<Configuration, Error> {
    let config_path = default_config_path()?;
    let data_folder = default_data_folder()?;
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    if !config_path.exists() {
        let create = accept_creation
            || ask(
                &mut input,
                &format!(
                    "No configuration file was found at \"{}\". Create configuration file?",
                    config_path.display()
                ),
            )?;
        if !create {
            return Err(Error::UserCancel);
        }
        let config = Configuration::new(data_folder);
        config.save(&config_path)?;
    }

    let config = Configuration::load(&config_path)?;
    if !config.data_folder_path.exists() {
        fs::create_dir_all(&config.data_folder_path)
            .map_err(|e| Error::DataFolder(format!("{e}")))?;
        info!("Created data folder {}", config.data_folder_path.display());
    }
    Ok(config)
}

/// Make run `name` the one opened by default and save the configuration
pub fn update_configuration_with_default_run(
    config: &mut Configuration,
    name: &str,
    config_path: &Path,
) -> Result<(), Error> {
    config.use_default_run = true;
    config.default_run_name = Some(name.to_string());
    config.save(config_path)
}

/// File name of run `name`, without characters that would escape the data
/// folder
pub fn run_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    format!("{}.{RUN_FILE_EXTENSION}", stem.trim_start_matches('.'))
}

/// Save `definition` in `data_folder`, returning the path written to
pub fn save_run_to_file(definition: &RunDefinition, data_folder: &Path) -> Result<PathBuf, Error> {
    let file_path = data_folder.join(run_file_name(&definition.name));
    let content = toml::to_string(definition).map_err(|e| Error::Run(format!("{e}")))?;
    let file = File::create(&file_path).map_err(|e| Error::Run(format!("{e}")))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| Error::Run(format!("{e}")))?;
    info!("Saved run \"{}\"", definition.name);
    Ok(file_path)
}

/// Parse run definition at `path`
pub fn parse_run_from_file(path: &Path) -> Result<RunDefinition, Error> {
    let mut file = File::open(path).map_err(|e| Error::Run(format!("{e}")))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::Run(format!("{e}")))?;
    toml::from_str(&content).map_err(|e| Error::Run(format!("{}: {e}", path.display())))
}

/// Search `data_folder` for the run with provided `name`
pub fn find_run_by_name(name: &str, data_folder: &Path) -> Result<RunDefinition, Error> {
    if name.is_empty() {
        return Err(Error::Run("Run name cannot be empty.".to_string()));
    }
    let wanted = run_file_name(name);
    debug!("parsing {}", data_folder.display());
    for entry in WalkDir::new(data_folder).max_depth(1) {
        let e = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping entry that could not be parsed");
                debug!("Skipped entry error: {e}");
                continue;
            }
        };
        if e.file_name().to_str() == Some(wanted.as_str()) {
            info!("Found run \"{name}\"");
            return parse_run_from_file(e.path());
        }
    }
    Err(Error::Run(format!("Did not find run with name {name}")))
}

/// Names of the runs stored in `data_folder`, sorted
pub fn list_runs(data_folder: &Path) -> Result<Vec<String>, Error> {
    let mut names = vec![];
    for entry in WalkDir::new(data_folder).max_depth(1) {
        let entry = entry.map_err(|e| Error::DataFolder(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(RUN_FILE_EXTENSION)
        {
            continue;
        }
        match parse_run_from_file(path) {
            Ok(definition) => names.push(definition.name),
            Err(e) => warn!("Skipping {}: {e}", path.display()),
        }
    }
    names.sort();
    Ok(names)
}

/// Get split names from `raw_splits` ("split1|split 2|split 3")
pub fn get_splits(raw_splits: &str) -> Vec<String> {
    raw_splits
        .split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn to_time(timespan: Option<TimeSpan>) -> Option<Time> {
    timespan.map(|t| Time::from_milliseconds(t.total_milliseconds() as i64))
}

fn to_lss_time(time: Option<Time>) -> LssTime {
    LssTime::new().with_real_time(time.map(|t| TimeSpan::from_milliseconds(t.milliseconds() as f64)))
}

/// Import a LiveSplit splits file (or any format livesplit-core detects).
///
/// Personal best split times become segment times. A segment without split
/// time has its time counted in the next one that has.
pub fn import_lss(path: &Path) -> Result<RunDefinition, Error> {
    let file = File::open(path).map_err(|e| Error::Import(format!("{e}")))?;
    let file = BufReader::new(file);

    // icons are not carried over, no need to load extra files
    let load_files = false;
    let parsed = composite::parse(file, Some(path.to_path_buf()), load_files)
        .map_err(|e| Error::Import(format!("Not a valid splits file: {e}")))?;
    info!("Splits File Format: {}", parsed.kind);

    let run = parsed.run;
    let name = format!("{} {}", run.game_name(), run.category_name())
        .trim()
        .to_string();
    let mut definition = RunDefinition::new(if name.is_empty() { "Imported run" } else { &name });
    let mut previous_split = Time::ZERO;
    for segment in run.segments() {
        let split = to_time(segment.personal_best_split_time().real_time);
        let run_time = split.map(|s| s - previous_split).filter(Time::is_positive);
        if let (Some(split), Some(_)) = (split, run_time) {
            previous_split = split;
        }
        definition.segments.push(SegmentDefinition {
            name: segment.name().to_string(),
            icon: None,
            run_time,
            best_time: to_time(segment.best_segment_time().real_time).filter(Time::is_positive),
        });
    }
    Ok(definition)
}

/// Export `definition` as a LiveSplit splits file
pub fn export_lss(definition: &RunDefinition, path: &Path) -> Result<(), Error> {
    let mut run = LssRun::new();
    run.set_game_name(definition.name.as_str());
    let mut split = Time::ZERO;
    for s in &definition.segments {
        let mut segment = LssSegment::new(s.name.as_str());
        let split_time = s.run_time.map(|t| {
            split += t;
            split
        });
        segment.set_personal_best_split_time(to_lss_time(split_time));
        segment.set_best_segment_time(to_lss_time(s.best_time));
        run.push_segment(segment);
    }
    let file = File::create(path).map_err(|e| Error::Export(format!("{e}")))?;
    let writer = BufWriter::new(file);
    livesplit::save_run(&run, writer).map_err(|e| Error::Export(format!("{e}")))?;
    info!("Exported \"{}\" to {}", definition.name, path.display());
    Ok(())
}

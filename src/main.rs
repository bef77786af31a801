use clap::{crate_authors, crate_name, crate_version, Arg, Command as ClapCommand};
use itertools::Itertools;
use log::*;
use simplelog::{Config, WriteLogger};
use splitkeeper::events::Column;
use splitkeeper::persistence::*;
use splitkeeper::run::Cell;
use splitkeeper::timer_controls::{dispatch, read_run};
use splitkeeper::{Accuracy, MonotonicClock, Run, RunDefinition, RunEvent, Time, TimeKind};
use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, RwLock};

fn main() -> ExitCode {
    let appname = env!("CARGO_PKG_NAME");
    let accept_help_msg = format!("Create configuration for {appname} without asking");
    let after_help_msg = format!(
        "Commands are typed on the standard input, one per line, and bound to \
keys in the configuration file. Files are placed under:
* $HOME/.{appname} (runs and logs)
* $HOME/.config/.{appname} (configuration)
"
    );
    let cmd = ClapCommand::new(crate_name!())
        .author(crate_authors!())
        .version(crate_version!())
        .about("Speedrun timer with split comparisons")
        .arg(
            Arg::new("run")
                .long("run")
                .help("Name of the run to load, or to create with --split-names")
                .takes_value(true)
                .value_name("NAME"),
        )
        .arg(
            Arg::new("split-names")
                .short('n')
                .long("split-names")
                .requires("run")
                .help("Create a run with these splits, separated with '|' (for instance 'split1|split 2|split 3')")
                .takes_value(true)
                .value_name("SPLITS"),
        )
        .arg(
            Arg::new("segmented")
                .long("segmented")
                .requires("split-names")
                .help("Pause the timer after each split of the created run"),
        )
        .arg(
            Arg::new("import")
                .long("import")
                .help("Import a LiveSplit splits file as a new run")
                .takes_value(true)
                .conflicts_with("split-names")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("export")
                .long("export")
                .help("Export the loaded run as a LiveSplit splits file and exit")
                .takes_value(true)
                .value_name("FILE"),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("List stored runs and exit"),
        )
        .arg(
            Arg::new("accept-automatically-configuration-creation")
                .long("accept-automatically-configuration-creation")
                .help(accept_help_msg.as_str()),
        )
        .arg(
            Arg::new("make-run-default")
                .long("make-run-default")
                .help("Open the loaded run by default next time"),
        )
        .after_help(after_help_msg.as_str());
    let m = cmd.clone().get_matches();

    // create default data directory
    let default_data_folder = match default_data_folder() {
        Ok(f) => f,
        Err(e) => {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if !default_data_folder.exists() {
        if let Err(e) = fs::create_dir_all(&default_data_folder) {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    }

    // don't log until --help is parsed
    let default_log_file_path = match default_log_file_path() {
        Ok(f) => f,
        Err(e) => {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let f = match fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(default_log_file_path)
    {
        Ok(f) => f,
        Err(e) => {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let _ = WriteLogger::init(LevelFilter::Trace, Config::default(), f);
    info!("{appname} start");
    match cmd.get_version() {
        Some(v) => info!("Version: {v}"),
        None => warn!("Unknown version of application"),
    }

    let mut config = match parse_configuration(m.is_present("accept-automatically-configuration-creation")) {
        Ok(c) => c,
        Err(Error::UserCancel) => {
            info!("{}", Error::UserCancel);
            println!("Please create a configuration file to use this application.");
            return ExitCode::SUCCESS;
        }
        Err(e) => return exit_error(appname, e),
    };
    let data_folder = config.data_folder_path.clone();

    if m.is_present("list") {
        return match list_runs(&data_folder) {
            Ok(names) => {
                println!("{}", names.join("\n"));
                ExitCode::SUCCESS
            }
            Err(e) => exit_error(appname, e),
        };
    }

    let definition = match load_definition(&config, &m) {
        Ok(d) => d,
        Err(e) => return exit_error(appname, e),
    };
    if let Err(e) = save_run_to_file(&definition, &data_folder) {
        return exit_error(appname, e);
    }

    if let Some(path) = m.value_of("export") {
        return match export_lss(&definition, Path::new(path)) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => exit_error(appname, e),
        };
    }

    if m.is_present("make-run-default") {
        let saved = default_config_path().and_then(|path| {
            update_configuration_with_default_run(&mut config, &definition.name, &path)
        });
        if let Err(e) = saved {
            return exit_error(appname, e);
        }
    }

    let mut run = match Run::from_definition(definition, Arc::new(MonotonicClock::new())) {
        Ok(r) => r,
        Err(e) => {
            error!("{e}");
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };
    run.set_comparison(config.comparison);
    run.subscribe(Box::new(|event: &RunEvent| trace!("{event:?}")));

    // Arc allows the run to be shared with input callbacks, the RwLock keeps
    // one command at a time
    let run = Arc::new(RwLock::new(run));
    println!("{}", config.keybinding.describe());
    print_table(&read_run(&run), config.accuracy);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("{e}");
                break;
            }
        };
        match config.keybinding.action(&line) {
            Some(Action::Timer(command)) => {
                if !dispatch(&run, command) {
                    println!("cannot {command} now");
                }
            }
            Some(Action::Quit) => break,
            None => {
                if !line.trim().is_empty() {
                    println!("unknown key \"{}\"", line.trim());
                }
            }
        }
        print_table(&read_run(&run), config.accuracy);
    }

    // NOTE: keeps the attempt only if it was completed
    let definition = {
        let mut run = match run.write() {
            Ok(r) => r,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        };
        run.save_live_times(false);
        run.definition()
    };
    match save_run_to_file(&definition, &data_folder) {
        Ok(_) => {
            info!("{appname} exit");
            ExitCode::SUCCESS
        }
        Err(e) => exit_error(appname, e),
    }
}

/// Run definition selected by the command line, or the default one
fn load_definition(config: &Configuration, m: &clap::ArgMatches) -> Result<RunDefinition, Error> {
    if let Some(path) = m.value_of("import") {
        return import_lss(Path::new(path));
    }
    if let Some(name) = m.value_of("run") {
        if let Some(split_names) = m.value_of("split-names") {
            let split_names = get_splits(split_names);
            if split_names.is_empty() {
                return Err(Error::User("provide at least one split".to_string()));
            }
            let mut definition = RunDefinition::with_split_names(name, &split_names);
            definition.segmented = m.is_present("segmented");
            info!("Created run \"{name}\"");
            return Ok(definition);
        }
        return find_run_by_name(name, &config.data_folder_path);
    }
    match (&config.default_run_name, config.use_default_run) {
        (Some(name), true) => {
            info!("Loading default run");
            find_run_by_name(name, &config.data_folder_path)
        }
        _ => Err(Error::User(
            "No run given. Use --run, --import, or set default_run_name in your configuration file"
                .to_string(),
        )),
    }
}

/// Prints one line per segment: saved split, saved segment, best segment and
/// the live delta against the compared split
fn print_table(run: &Run, accuracy: Accuracy) {
    let padding = run
        .segments()
        .iter()
        .map(|s| s.name().len())
        .max()
        .unwrap_or(0)
        .max("Splits".len());
    let time_cell = |row: usize, column: Column| match run.cell(row, column) {
        Some(Cell::Time(Some(t))) => t.format(false, accuracy),
        _ => "-".to_string(),
    };
    println!(
        "{}: {} [{}]",
        run.name(),
        run.state(),
        run.comparison().method
    );
    println!(
        "{:<padding$} {:>10} {:>10} {:>10} {:>10}",
        "Splits", "Time", "Segment", "Best", "Delta"
    );
    let done = run.current().unwrap_or(0);
    for (row, segment) in run.segments().iter().enumerate() {
        let delta = if row < done && segment.time(TimeKind::Live, run.comparison().method).is_some() {
            run.time(row, TimeKind::Delta, true)
                .map(|d| d.format(true, accuracy))
                .unwrap_or_default()
        } else {
            String::new()
        };
        let marker = if Some(row) == run.current() { ">" } else { " " };
        println!(
            "{:<padding$} {:>10} {:>10} {:>10} {:>10}{marker}",
            segment.name(),
            time_cell(row, Column::Time),
            time_cell(row, Column::Segment),
            time_cell(row, Column::Best),
            delta,
        );
    }
    let elapsed = run.run_elapsed().unwrap_or(Time::ZERO);
    let flags = [
        run.is_personal_best().then_some("personal best"),
        run.has_segments_best().then_some("best segments"),
    ]
    .into_iter()
    .flatten()
    .join(", ");
    println!("{:<padding$} {:>10} {flags}", "Time", elapsed.format(false, accuracy));
}

/// When something wrong happens, inform user to check logs before closing the
/// program
fn exit_error(appname: &str, e: Error) -> ExitCode {
    error!("{e}");
    println!("{e}");
    println!("Please check out the logs at `$HOME/.{appname}/logs.txt`");
    ExitCode::FAILURE
}

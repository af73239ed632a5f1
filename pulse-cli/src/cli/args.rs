//! CLI argument definitions for `pulse`.

use clap::{Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("Pulse")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Play a track with a playback-synchronized metronome")
        .arg_required_else_help(true)
        .arg(
            Arg::new("bpm")
                .long("bpm")
                .short('b')
                .value_name("BPM")
                .help("Metronome tempo in beats per minute (30-240)"),
        )
        .arg(
            Arg::new("metronome")
                .long("metronome")
                .short('m')
                .action(ArgAction::SetTrue)
                .help("Start with the metronome switched on"),
        )
        .arg(
            Arg::new("repeat")
                .long("repeat")
                .short('r')
                .action(ArgAction::SetTrue)
                .help("Restart the track when it ends"),
        )
        .arg(
            Arg::new("seek")
                .long("seek")
                .short('s')
                .value_name("TIME")
                .help("Start playback at the given time in seconds"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("PATH")
                .help("Path to a JSON engine settings file"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("No TUI; play until the track ends"),
        )
        .arg(
            Arg::new("INPUT")
                .help("The audio file to play")
                .required(false)
                .index(1),
        )
        .subcommand(
            Command::new("info")
                .about("Print the path and duration of a track")
                .arg(
                    Arg::new("INPUT")
                        .help("The audio file to inspect")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand_required(true)
                .subcommand(
                    Command::new("settings-json").about("Print the default engine settings JSON"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::build_cli;

    #[test]
    fn parses_playback_options() {
        let matches = build_cli()
            .try_get_matches_from(["pulse", "--bpm", "96", "-m", "--seek", "12.5", "song.mp3"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("bpm").unwrap(), "96");
        assert!(matches.get_flag("metronome"));
        assert!(!matches.get_flag("repeat"));
        assert_eq!(matches.get_one::<String>("seek").unwrap(), "12.5");
        assert_eq!(matches.get_one::<String>("INPUT").unwrap(), "song.mp3");
    }

    #[test]
    fn info_requires_input() {
        assert!(build_cli().try_get_matches_from(["pulse", "info"]).is_err());
    }
}

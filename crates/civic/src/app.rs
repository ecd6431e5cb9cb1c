use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("civic")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Explore civic records on a map driven by a shareable URL hash")
        .long_about("civic loads a records file and boundary geometry, applies the state encoded in a URL hash (filters, sort, viewport, selected regions) and reports what the map and list would show.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("explore")
                .about("Load records under a hash and print the resulting view")
                .arg(
                    Arg::new("records")
                        .long("records")
                        .short('r')
                        .help("JSON file holding an array of records (overrides config)")
                )
                .arg(
                    Arg::new("hash")
                        .long("hash")
                        .help("URL hash to start from, with or without '#'")
                        .default_value("")
                )
                .arg(
                    Arg::new("geometry-dir")
                        .long("geometry-dir")
                        .short('g')
                        .help("Directory that region and layer sources resolve against (overrides config)")
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("hash")
                .about("Decode a hash, apply edits and print the canonical result")
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Hash to start from")
                        .default_value("")
                )
                .arg(
                    Arg::new("set")
                        .long("set")
                        .short('s')
                        .help("Set a key (key=value); may be repeated")
                        .action(ArgAction::Append)
                )
                .arg(
                    Arg::new("unset")
                        .long("unset")
                        .short('u')
                        .help("Remove a key; may be repeated")
                        .action(ArgAction::Append)
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the decoded key/value map as JSON")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration as TOML")
        )
}

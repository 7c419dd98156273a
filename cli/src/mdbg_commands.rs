use clap::{Arg, Command};

fn subcommand_resolve() -> Command<'static> {
    Command::new("resolve")
        .version("0.1")
        .about("Resolve repeats: lift the graph into a multiplex one, increase k, emit contigs.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Debug mode"),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .value_name("DATASET")
                .takes_value(true)
                .required(true)
                .help("Input JSON dataset (graph + read paths)."),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("DIR")
                .takes_value(true)
                .required(true)
                .help("Output directory for graph dumps and contigs."),
        )
        .arg(
            Arg::new("start_k")
                .long("start_k")
                .takes_value(true)
                .default_value("501")
                .help("Vertex word length at construction."),
        )
        .arg(
            Arg::new("saturating_k")
                .long("saturating_k")
                .takes_value(true)
                .default_value("5001")
                .help("Stop increasing k at this bound even if vertices remain active."),
        )
        .arg(
            Arg::new("validate")
                .long("validate")
                .help("Check the graph invariants after every step."),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .takes_value(true)
                .default_value("1")
                .help("number of threads"),
        )
}

fn subcommand_stats() -> Command<'static> {
    Command::new("stats")
        .version("0.1")
        .about("Write summary statistics of a dataset.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Debug mode"),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .value_name("DATASET")
                .takes_value(true)
                .required(true)
                .help("Input JSON dataset."),
        )
        .arg(
            Arg::new("file")
                .long("file")
                .short('f')
                .value_name("PATH")
                .takes_value(true)
                .help("Output file. Defaults to stdout."),
        )
}

pub fn mdbg_parser() -> Command<'static> {
    Command::new("mdbg")
        .version("0.1")
        .about("Multiplex de Bruijn graph repeat resolution.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(subcommand_resolve())
        .subcommand(subcommand_stats())
}

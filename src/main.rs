#[macro_use]
extern crate log;

use clap::{value_t, App, Arg, ArgMatches};
use std::path::PathBuf;
use tlbsim::sim::pipeline;
use tlbsim::SimConfig;

fn app() -> App<'static, 'static> {
    let numeric = |name: &'static str, help: &'static str| {
        Arg::with_name(name).long(name).value_name("N").takes_value(true).help(help)
    };
    App::new("tlbsim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a memory address trace through a TLB timing model")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("TOML configuration file; command line options override it"),
        )
        .arg(numeric("entries", "Number of TLB entries, 0 for an unbounded TLB"))
        .arg(numeric("assoc", "Associativity"))
        .arg(numeric("page-size", "Page size in bytes"))
        .arg(numeric("hit-latency", "Hit latency in cycles"))
        .arg(numeric("miss-latency", "Page walk latency in cycles"))
        .arg(numeric("max-walks", "Maximum outstanding page walks, 0 for unbounded"))
        .arg(numeric("bandwidth", "Maximum requests accepted per cycle, 0 for unbounded"))
        .arg(numeric("cycle-time", "Cycle time in ns, used for power estimates"))
        .arg(Arg::with_name("perfect").long("perfect").help("Make every lookup hit"))
        .arg(
            Arg::with_name("characterization")
                .long("characterization")
                .value_name("FILE")
                .takes_value(true)
                .help("Energy/area characterization of the TLB, enables power estimates"),
        )
        .arg(
            Arg::with_name("trace")
                .required(true)
                .index(1)
                .help("Trace file, one hex address per line, or - for stdin"),
        )
}

fn configure(matches: &ArgMatches) -> tlbsim::Result<SimConfig> {
    let mut config = match matches.value_of("config") {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };

    macro_rules! override_opt {
        ($name: expr, $field: expr, $ty: ty) => {
            if matches.is_present($name) {
                $field = value_t!(matches, $name, $ty).unwrap_or_else(|err| err.exit());
            }
        };
    }
    override_opt!("entries", config.tlb.entries, usize);
    override_opt!("assoc", config.tlb.assoc, usize);
    override_opt!("page-size", config.tlb.page_size, u64);
    override_opt!("hit-latency", config.tlb.hit_latency, u64);
    override_opt!("miss-latency", config.tlb.miss_latency, u64);
    override_opt!("max-walks", config.tlb.max_walks, usize);
    override_opt!("bandwidth", config.tlb.bandwidth, usize);
    override_opt!("cycle-time", config.cycle_time, f64);
    if matches.is_present("perfect") {
        config.tlb.perfect = Some(true);
    }
    if let Some(path) = matches.value_of("characterization") {
        config.tlb.characterization = Some(PathBuf::from(path));
    }

    config.validate()?;
    Ok(config)
}

fn run(matches: &ArgMatches) -> tlbsim::Result<()> {
    let config = configure(matches)?;
    debug!("configuration: {:?}", config);

    let trace = match matches.value_of("trace") {
        Some("-") | None => {
            let stdin = std::io::stdin();
            let lock = stdin.lock();
            pipeline::parse_trace(lock)?
        }
        Some(path) => pipeline::read_trace(path)?,
    };

    let report = pipeline::run(&config, trace.iter().map(|event| event.addr))?;
    print!("{}", report);
    Ok(())
}

pub fn main() {
    pretty_env_logger::init();

    let matches = app().get_matches();
    if let Err(err) = run(&matches) {
        eprintln!("tlbsim: {}", err);
        std::process::exit(1);
    }
}

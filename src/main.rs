use std::env;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::process;

use getopts::Options;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;

use rdbsax::filter::StrictFilter;
use rdbsax::formatter;
use rdbsax::types::Type;

/// Wrapper around std::io::Read that updates a progress bar with the number
/// of bytes read
struct ReadProgressBar<R> {
    reader: R,
    progress_bar: ProgressBar,
}

impl<R: Read> Read for ReadProgressBar<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes_read = self.reader.read(buf)?;

        self.progress_bar.inc(bytes_read as u64);

        Ok(bytes_read)
    }
}

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options] dump.rdb", program);
    print!("{}", opts.usage(&brief));
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt(
        "f",
        "format",
        "Format to output. Valid: json, plain, nil, protocol",
        "FORMAT",
    );
    opts.optopt("k", "keys", "Keys to show. Can be a regular expression", "KEYS");
    opts.optmulti(
        "d",
        "databases",
        "Database to show. Can be specified multiple times",
        "DB",
    );
    opts.optmulti(
        "t",
        "type",
        "Type to show. Can be specified multiple times",
        "TYPE",
    );
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };

    if matches.opt_present("h") || matches.free.is_empty() {
        print_usage(&program, opts);
        process::exit(if matches.opt_present("h") { 0 } else { 1 });
    }

    let mut filter = StrictFilter::new();

    for db in matches.opt_strs("d") {
        match db.parse() {
            Ok(db) => filter.add_database(db),
            Err(_) => {
                eprintln!("Invalid database: {}", db);
                process::exit(1);
            }
        }
    }

    for typ in matches.opt_strs("t") {
        match Type::from_name(&typ) {
            Some(typ) => filter.add_type(typ),
            None => {
                eprintln!("Unknown type: {}", typ);
                process::exit(1);
            }
        }
    }

    if let Some(keys) = matches.opt_str("k") {
        match Regex::new(&keys) {
            Ok(re) => filter.add_keys(re),
            Err(err) => {
                eprintln!("Invalid key regex: {}", err);
                process::exit(1);
            }
        }
    }

    let path = Path::new(&matches.free[0]);
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Could not open {}: {}", path.display(), err);
            process::exit(1);
        }
    };

    let file_size = file.metadata().map(|m| m.len()).unwrap_or(0);
    let progress_bar = ProgressBar::new(file_size);
    progress_bar.set_style(
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {bytes}/{total_bytes}"),
    );

    let reader = ReadProgressBar {
        reader: BufReader::new(file),
        progress_bar: progress_bar.clone(),
    };

    let format = matches.opt_str("f").unwrap_or_else(|| String::from("json"));
    let result = match format.as_str() {
        "json" => rdbsax::parse(reader, formatter::Json::new(), filter),
        "plain" => rdbsax::parse(reader, formatter::Plain::new(), filter),
        "nil" => rdbsax::parse(reader, formatter::Nil::new(), filter),
        "protocol" => rdbsax::parse(reader, formatter::Protocol::new(), filter),
        other => {
            eprintln!("Unknown format: {}", other);
            process::exit(1);
        }
    };

    progress_bar.finish_and_clear();

    if let Err(err) = result {
        eprintln!("Parsing failed: {}", err);
        process::exit(1);
    }
}

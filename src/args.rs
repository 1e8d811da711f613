use std::path::Path;

use clap::{crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, Command};

use crate::errors::HprofGraphError;
use crate::errors::HprofGraphError::*;
use crate::options::DecodeOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub file_path: String,
    pub options: DecodeOptions,
    pub top: usize,
    pub debug: bool,
}

fn command() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!("\n"))
        .about(crate_description!())
        .arg(
            Arg::new("inputFile")
                .help("binary hprof input file")
                .long("inputFile")
                .short('i')
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new("dumpNumber")
                .help("1-based number of the heap dump to decode")
                .long("dumpNumber")
                .short('n')
                .num_args(1)
                .value_parser(clap::value_parser!(u32))
                .default_value("1"),
        )
        .arg(
            Arg::new("noStackTraces")
                .help("do not decode stack frames and stack traces")
                .long("noStackTraces")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("top")
                .help("the top results to display")
                .long("top")
                .short('t')
                .num_args(1)
                .value_parser(clap::value_parser!(usize))
                .default_value("20"),
        )
        .arg(
            Arg::new("debug")
                .help("debug info")
                .long("debug")
                .short('d')
                .action(ArgAction::SetTrue),
        )
}

pub fn get_args() -> Result<Args, HprofGraphError> {
    parse_args(std::env::args_os())
}

pub fn parse_args<I, T>(raw_args: I) -> Result<Args, HprofGraphError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command().try_get_matches_from(raw_args)?;

    let file_path = matches
        .get_one::<String>("inputFile")
        .cloned()
        .ok_or_else(|| InputFileNotFound {
            name: String::new(),
        })?;
    if !Path::new(&file_path).is_file() {
        return Err(InputFileNotFound { name: file_path });
    }

    let dump_number = matches.get_one::<u32>("dumpNumber").copied().unwrap_or(1);
    if dump_number == 0 {
        return Err(InvalidDumpNumber);
    }

    let top = matches.get_one::<usize>("top").copied().unwrap_or(20);
    if top == 0 {
        return Err(InvalidTopPositiveInt);
    }

    let options = DecodeOptions::default()
        .with_dumps_to_skip(dump_number - 1)
        .with_stack_traces(!matches.get_flag("noStackTraces"));

    Ok(Args {
        file_path,
        options,
        top,
        debug: matches.get_flag("debug"),
    })
}

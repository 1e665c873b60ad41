use classtrace::*;

use clap::{crate_name, crate_version, Arg, ArgAction, ArgMatches, Command};
use std::fs;
use std::io;
use std::path::PathBuf;

fn main() -> Result<(), jvm::Error> {
    env_logger::init();

    let matches = Command::new(crate_name!())
        .version(crate_version!())
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Decode, instrument, and re-encode JVM class files")
        .subcommand_required(true)
        .subcommand(
            Command::new("print")
                .about("Prints an outline of the class")
                .arg(class_file_arg()),
        )
        .subcommand(
            Command::new("instrument")
                .about("Logs entry into every method of the target classes")
                .arg(
                    Arg::new("target")
                        .long("target")
                        .value_name("CLASS_NAME")
                        .help("Class to instrument (eg. `me.alec.Sample` or `me/alec/Sample`)")
                        .required(true)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("PATH")
                        .help("Where to write the result (defaults to `<CLASS_FILE>.instrumented.class`)"),
                )
                .arg(class_file_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("print", sub_matches)) => run_print(sub_matches),
        Some(("instrument", sub_matches)) => run_instrument(sub_matches),
        _ => Ok(()),
    }
}

fn class_file_arg() -> Arg {
    Arg::new("CLASS_FILE")
        .help("Sets the input class file to use")
        .required(true)
        .index(1)
}

fn read_class_file(matches: &ArgMatches) -> Result<(PathBuf, Vec<u8>), jvm::Error> {
    let path = matches
        .get_one::<String>("CLASS_FILE")
        .map(PathBuf::from)
        .unwrap_or_default();
    log::info!("Reading '{}'", path.display());
    let bytes = fs::read(&path).map_err(jvm::Error::IoError)?;
    Ok((path, bytes))
}

fn run_print(matches: &ArgMatches) -> Result<(), jvm::Error> {
    let (_, bytes) = read_class_file(matches)?;
    let reader = jvm::ClassReader::new(&bytes)?;
    let stdout = io::stdout();
    let mut printer = jvm::ClassPrinter::new(stdout.lock());
    reader.accept(&mut printer)?;
    Ok(())
}

fn run_instrument(matches: &ArgMatches) -> Result<(), jvm::Error> {
    let (path, bytes) = read_class_file(matches)?;
    let targets = matches
        .get_many::<String>("target")
        .into_iter()
        .flatten();
    let settings = instrument::Settings::new(targets);

    let output = match matches.get_one::<String>("output") {
        Some(output) => PathBuf::from(output),
        None => {
            let mut output = path.into_os_string();
            output.push(".instrumented.class");
            PathBuf::from(output)
        }
    };

    let transformed = instrument::transform_class(&bytes, &settings)?;
    log::info!("Writing '{}'", output.display());
    fs::write(&output, transformed).map_err(jvm::Error::IoError)?;
    Ok(())
}

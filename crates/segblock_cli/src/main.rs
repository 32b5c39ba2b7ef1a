//! `segblock` command-line front end.

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "segblock", version, about = "Inspect and re-encode declarative binary records")]
struct Cli {
	/// Raise log verbosity (`-v` debug, `-vv` trace). `RUST_LOG` wins when set.
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Print registered types with their sizes and field offsets.
	Layout(cmd::layout::Args),
	/// Decode records of one type from a file.
	Decode(cmd::decode::Args),
	/// Decode records and check that re-encoding reproduces the input bytes.
	Roundtrip(cmd::roundtrip::Args),
	/// Pack a file behind a 1172/1173 DEFLATE header.
	Compress(cmd::compress::CompressArgs),
	/// Unpack a 1172/1173 framed file.
	Decompress(cmd::compress::DecompressArgs),
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match run(cli.command) {
		Ok(code) => code,
		Err(err) => {
			eprintln!("error: {err}");
			ExitCode::FAILURE
		}
	}
}

fn run(command: Command) -> segblock::codec::Result<ExitCode> {
	match command {
		Command::Layout(args) => cmd::layout::run(args).map(|()| ExitCode::SUCCESS),
		Command::Decode(args) => cmd::decode::run(args).map(|()| ExitCode::SUCCESS),
		Command::Roundtrip(args) => cmd::roundtrip::run(args),
		Command::Compress(args) => cmd::compress::run_compress(args).map(|()| ExitCode::SUCCESS),
		Command::Decompress(args) => cmd::compress::run_decompress(args).map(|()| ExitCode::SUCCESS),
	}
}

fn init_logging(verbose: u8) {
	let default = match verbose {
		0 => "warn",
		1 => "debug",
		_ => "trace",
	};
	let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
		.format_timestamp_millis()
		.try_init();
}

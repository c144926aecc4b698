//! NRM client: one-shot command sender or interactive shell with a
//! persistent command history file (`history.nrm`).

use anyhow::{Context, Result};
use clap::Parser;
use onra_cli::{init_tracing, load_params_or_exit, EXIT_USAGE};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::process::exit;
use tracing::{info, Level};

const HISTORY_FILE: &str = "history.nrm";

#[derive(Parser, Debug)]
#[command(name = "onra-client", about = "Network resource manager client")]
struct Cli {
    /// Command to send; interactive mode when absent
    #[arg(
        value_name = "command",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,

    /// Top directory (config/ resolves here)
    #[arg(long, default_value = ".")]
    top_dir: PathBuf,

    /// Logging level
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

fn connect(host: &str, port: u16) -> Result<TcpStream> {
    let stream = TcpStream::connect((host, port))
        .with_context(|| format!("connecting to NRM server at {host}:{port}"))?;
    info!("NRM client connected to server");
    Ok(stream)
}

/// Send one line and print the reply (terminated by an empty line).
fn roundtrip(stream: &mut TcpStream, line: &str) -> Result<()> {
    stream.write_all(format!("{line}\n").as_bytes())?;
    stream.flush()?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut reply = String::new();
    loop {
        let mut buf = String::new();
        let n = reader.read_line(&mut buf)?;
        if n == 0 {
            anyhow::bail!("the server closed the connection and is probably down");
        }
        if buf.trim_end_matches(['\r', '\n']).is_empty() {
            break;
        }
        reply.push_str(&buf);
    }
    print!("{reply}");
    Ok(())
}

fn append_history(line: &str) {
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(HISTORY_FILE)
    {
        let _ = writeln!(file, "{line}");
    }
}

fn interactive(stream: &mut TcpStream) -> Result<()> {
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        append_history(line);
        roundtrip(stream, line)?;
    }
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            exit(EXIT_USAGE);
        }
    };
    let params = load_params_or_exit(&cli.top_dir);
    init_tracing(cli.log_level, params.logger == "enable");

    let mut stream = match connect(&params.nrm_host, params.nrm_port) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("{e:#}");
            exit(EXIT_USAGE);
        }
    };

    let result = if cli.command.is_empty() {
        interactive(&mut stream)
    } else {
        roundtrip(&mut stream, &cli.command.join(" "))
    };
    if let Err(e) = result {
        eprintln!("{e:#}");
        exit(EXIT_USAGE);
    }
    println!("close");
}

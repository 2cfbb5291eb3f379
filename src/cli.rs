use std::path::PathBuf;

use clap::Parser;
use gdbmi_config::{validated, Config, ConfigError, LogLevel, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "gdbmi")]
#[command(version)]
#[command(after_help = "Examples:\n\n\
    Debug a program, typing MI or console commands on stdin:\n\
    $ gdbmi ./a.out\n\n\
    Pass arguments to the program and print records as JSON:\n\
    $ gdbmi --json ./a.out -- --verbose input.txt")]
#[command(
    about = "Drive a debugger over the GDB/MI protocol, one command per line.",
    long_about = None
)]
pub struct Cli {
    /// Directory holding the global config.toml
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Debugger executable, overriding `debugger.program`
    #[arg(long, value_name = "PATH")]
    pub gdb: Option<String>,

    /// Print records as JSON objects instead of wire text
    #[arg(long)]
    pub json: bool,

    /// Log verbosity (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Program to debug
    pub program: Option<PathBuf>,

    /// Arguments passed to the program
    #[arg(last = true)]
    pub program_args: Vec<String>,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(gdb) = &self.gdb {
            config.debugger.program = gdb.clone();
        }
        if self.json {
            config.output.format = OutputFormat::Json;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
    }

    /// Apply the overrides and validate the result again.
    pub fn configure(&self, mut config: Config) -> Result<Config, ConfigError> {
        self.apply(&mut config);
        validated(config)
    }

    /// Debugger arguments that load the program, if one was given.
    pub fn target_args(&self) -> Vec<String> {
        let Some(program) = &self.program else {
            return Vec::new();
        };
        let mut args = Vec::with_capacity(self.program_args.len() + 2);
        if !self.program_args.is_empty() {
            args.push("--args".to_string());
        }
        args.push(program.display().to_string());
        args.extend(self.program_args.iter().cloned());
        args
    }
}

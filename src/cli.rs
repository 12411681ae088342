//! The `roiset` command line tool.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use crate::codec::server::{ImageRef, SelectionMode, TransferRoi};
use crate::config::EngineConfig;
use crate::error::RoiError;
use crate::io::RoiIo;

#[derive(Parser, Debug)]
#[command(name = "roiset", version, about = "ROI geometry interchange tool")]
pub struct Args {
    /// Config JSON file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarise the ROIs of a document
    Inspect {
        /// Input document or '-' for stdin
        input: PathBuf,
    },
    /// Read a document and write it back in canonical form
    Normalize {
        input: PathBuf,
        /// Output file; stdout if omitted
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Convert a document to server transfer JSON
    Export {
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        /// Acting user id
        #[arg(short = 'u', long = "user")]
        user: i64,
        /// Which ROIs to send
        #[arg(short = 'm', long = "mode", value_enum, default_value = "all")]
        mode: ModeArg,
        /// Image the ROIs belong to
        #[arg(long = "image", default_value_t = 0)]
        image: i64,
    },
    /// Convert server transfer JSON to a document
    Import {
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        /// Acting user id
        #[arg(short = 'u', long = "user")]
        user: i64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ModeArg {
    Annotatable,
    Editable,
    Deletable,
    DeletableOwned,
    DeletableByOthers,
    All,
}

impl From<ModeArg> for SelectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Annotatable => SelectionMode::Annotatable,
            ModeArg::Editable => SelectionMode::Editable,
            ModeArg::Deletable => SelectionMode::Deletable,
            ModeArg::DeletableOwned => SelectionMode::DeletableOwned,
            ModeArg::DeletableByOthers => SelectionMode::DeletableByOthers,
            ModeArg::All => SelectionMode::All,
        }
    }
}

pub fn run() -> Result<(), RoiError> {
    let args = Args::parse();
    let config = match args.config.as_deref() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    init_logging(&config);

    let mut engine = RoiIo::with_config(&config);
    match args.command {
        Command::Inspect { input } => {
            engine.read_from_reader(read_input(&input)?.as_bytes())?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for roi in engine.registry().rois() {
                let kinds: Vec<&str> = roi.shapes().map(|shape| shape.figure().kind()).collect();
                writeln!(
                    out,
                    "roi {} owner {} shapes {} [{}]",
                    roi.id(),
                    roi.owner_id,
                    roi.shape_count(),
                    kinds.join(", ")
                )?;
            }
            writeln!(
                out,
                "{} ROIs, {} shapes on {} planes",
                engine.registry().len(),
                engine.registry().shape_count(),
                engine.registry().plane_count()
            )?;
        }
        Command::Normalize { input, output } => {
            engine.read_from_reader(read_input(&input)?.as_bytes())?;
            match output {
                Some(path) => engine.write_to_file(&path)?,
                None => engine.write_to_writer(io::stdout().lock())?,
            }
        }
        Command::Export {
            input,
            output,
            user,
            mode,
            image,
        } => {
            engine.read_from_reader(read_input(&input)?.as_bytes())?;
            let rois = engine.write_to_server(ImageRef::new(image), mode.into(), user)?;
            write_output(&serde_json::to_string_pretty(&rois)?, output.as_deref())?;
        }
        Command::Import {
            input,
            output,
            user,
        } => {
            let rois: Vec<TransferRoi> = serde_json::from_str(&read_input(&input)?)?;
            engine.read_from_server(&rois, user)?;
            match output {
                Some(path) => engine.write_to_file(&path)?,
                None => engine.write_to_writer(io::stdout().lock())?,
            }
        }
    }

    Ok(())
}

/// Configured level, unless `RUST_LOG` says otherwise.
fn init_logging(config: &EngineConfig) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.log_level.to_level_filter());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

fn read_input(path: &Path) -> Result<String, RoiError> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read_to_string(path)?)
}

fn write_output(text: &str, path: Option<&Path>) -> Result<(), RoiError> {
    match path {
        Some(path) => std::fs::write(path, text)?,
        None => {
            let mut out = io::stdout().lock();
            out.write_all(text.as_bytes())?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export_args() {
        let args = Args::try_parse_from([
            "roiset", "export", "in.xml", "--user", "7", "--mode", "deletable-owned",
        ])
        .unwrap();
        match args.command {
            Command::Export { user, mode, image, .. } => {
                assert_eq!(user, 7);
                assert_eq!(image, 0);
                assert_eq!(SelectionMode::from(mode), SelectionMode::DeletableOwned);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_config_flag_is_global() {
        let args = Args::try_parse_from(["roiset", "inspect", "-", "--config", "c.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("c.json")));
    }
}

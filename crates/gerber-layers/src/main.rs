use clap::Parser;
use gerber_layers::types::{BoardFileType, BoardLayer, BoardSide};
use gerber_layers::{archive, classify};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gerber-layers",
    about = "Classify board fabrication files by side and layer"
)]
struct Cli {
    /// Input files: a .zip fabrication archive or loose Gerber/drill files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output JSON file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportEntry {
    file_name: String,
    side: BoardSide,
    layer: BoardLayer,
    file_type: BoardFileType,
}

fn classify_one(file_name: &str, content: &str) -> ReportEntry {
    let (side, layer, file_type) = classify::resolve(file_name, content);
    ReportEntry {
        file_name: file_name.to_string(),
        side,
        layer,
        file_type,
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut report = Vec::new();
    for path in &cli.inputs {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                std::process::exit(1);
            }
        };
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
        if is_zip {
            match archive::expand_zip(&bytes) {
                Ok(files) => {
                    for file in files {
                        report.push(classify_one(&file.file_name, &file.content));
                    }
                }
                Err(e) => {
                    eprintln!("Error unpacking {}: {e}", path.display());
                    std::process::exit(1);
                }
            }
        } else {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let content = String::from_utf8_lossy(&bytes).into_owned();
            report.push(classify_one(&name, &content));
        }
    }

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .expect("JSON serialization failed");

    if let Some(output_path) = cli.output {
        std::fs::write(&output_path, &json).expect("Failed to write output file");
        eprintln!("Written to {}", output_path.display());
    } else {
        println!("{json}");
    }
}

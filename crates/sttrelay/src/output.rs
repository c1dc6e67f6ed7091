use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sttrelay_frame::Info;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DescribeOutput<'a> {
    endpoint: &'a str,
    #[serde(flatten)]
    info: &'a Info,
}

#[derive(Serialize)]
struct TranscriptOutput<'a> {
    endpoint: &'a str,
    file: &'a str,
    language: Option<&'a str>,
    audio_ms: u64,
    elapsed_ms: u64,
    text: &'a str,
}

/// Details of a finished `transcribe` run.
pub struct TranscriptReport<'a> {
    pub endpoint: &'a str,
    pub file: &'a str,
    pub language: Option<&'a str>,
    pub audio: std::time::Duration,
    pub elapsed: std::time::Duration,
    pub text: &'a str,
}

pub fn print_info(endpoint: &str, info: &Info, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DescribeOutput { endpoint, info };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PROGRAM", "MODEL", "NAME", "LANGUAGES"]);
            for program in &info.asr {
                for model in &program.models {
                    table.add_row(vec![
                        program.name.clone(),
                        model.id.clone(),
                        model.name.clone(),
                        model.languages.join(", "),
                    ]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Server: {endpoint}");
            for program in &info.asr {
                println!("  Program:     {}", program.name);
                if let Some(attribution) = &program.attribution {
                    println!("  Attribution: {} <{}>", attribution.name, attribution.url);
                }
                for model in &program.models {
                    println!(
                        "  Model:       {} ({}) [{}]",
                        model.id,
                        model.name,
                        model.languages.join(", ")
                    );
                }
            }
        }
        OutputFormat::Raw => {
            for program in &info.asr {
                for model in &program.models {
                    println!("{}", model.id);
                }
            }
        }
    }
}

pub fn print_transcript(report: &TranscriptReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = TranscriptOutput {
                endpoint: report.endpoint,
                file: report.file,
                language: report.language,
                audio_ms: report.audio.as_millis() as u64,
                elapsed_ms: report.elapsed.as_millis() as u64,
                text: report.text,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FILE", "LANGUAGE", "AUDIO", "ELAPSED", "TEXT"])
                .add_row(vec![
                    report.file.to_string(),
                    report.language.unwrap_or("(server default)").to_string(),
                    format!("{:.2}s", report.audio.as_secs_f64()),
                    format!("{:.2}s", report.elapsed.as_secs_f64()),
                    report.text.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} ({:.2}s audio, {:.2}s round trip): {}",
                report.file,
                report.audio.as_secs_f64(),
                report.elapsed.as_secs_f64(),
                report.text
            );
        }
        OutputFormat::Raw => {
            print_raw(report.text.as_bytes());
            print_raw(b"\n");
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

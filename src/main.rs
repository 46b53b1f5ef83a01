use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use serde_json::Value;
use tracing::info;

mod config;
mod llm;
mod media;
mod metadata;
mod utils;

use config::CONFIG;
use llm::OpenAiClient;
use media::analyze_image;
use metadata::{
    is_valid_metadata, schema_description_pretty, MetadataError, MetadataOrchestrator,
    RequestContext,
};
use utils::logging::init_logging;
use utils::timing::{complete_run_timer, start_run_timer};

#[derive(Debug, Clone, PartialEq, Eq)]
struct GenerateArgs {
    image: PathBuf,
    category: Option<String>,
    platform: Option<String>,
    style: Option<String>,
    output: Option<PathBuf>,
    offline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    Generate(GenerateArgs),
    Validate { file: PathBuf },
    Schema,
    Help,
}

fn usage() -> &'static str {
    "Usage:\n  \
listing-metadata generate --image <path> [--category <text>] [--platform <text>] [--style <text>] [--output <file>] [--offline]\n  \
listing-metadata validate --file <path>\n  \
listing-metadata schema"
}

fn take_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *index += 1;
    args.get(*index)
        .map(|value| value.as_str())
        .ok_or_else(|| anyhow!("Missing value for {flag}"))
}

fn parse_generate_args(args: &[String]) -> anyhow::Result<GenerateArgs> {
    let mut image: Option<PathBuf> = None;
    let mut category = None;
    let mut platform = None;
    let mut style = None;
    let mut output = None;
    let mut offline = false;

    let mut index = 2;
    while index < args.len() {
        match args[index].as_str() {
            "--image" => image = Some(PathBuf::from(take_value(args, &mut index, "--image")?)),
            "--category" => {
                category = Some(take_value(args, &mut index, "--category")?.to_string())
            }
            "--platform" => {
                platform = Some(take_value(args, &mut index, "--platform")?.to_string())
            }
            "--style" | "--tone" => {
                style = Some(take_value(args, &mut index, "--style")?.to_string())
            }
            "--output" => output = Some(PathBuf::from(take_value(args, &mut index, "--output")?)),
            "--offline" => offline = true,
            other => {
                return Err(anyhow!(
                    "Unknown generate argument: {other}\n{}",
                    usage()
                ));
            }
        }
        index += 1;
    }

    let image = image.ok_or_else(|| anyhow!("--image is required\n{}", usage()))?;
    Ok(GenerateArgs {
        image,
        category,
        platform,
        style,
        output,
        offline,
    })
}

fn parse_command(args: &[String]) -> anyhow::Result<CliCommand> {
    match args.get(1).map(|value| value.as_str()) {
        None | Some("--help") | Some("-h") | Some("help") => Ok(CliCommand::Help),
        Some("generate") => Ok(CliCommand::Generate(parse_generate_args(args)?)),
        Some("validate") => {
            let mut file = None;
            let mut index = 2;
            while index < args.len() {
                match args[index].as_str() {
                    "--file" => file = Some(PathBuf::from(take_value(args, &mut index, "--file")?)),
                    other => {
                        return Err(anyhow!(
                            "Unknown validate argument: {other}\n{}",
                            usage()
                        ))
                    }
                }
                index += 1;
            }
            let file = file.ok_or_else(|| anyhow!("--file is required\n{}", usage()))?;
            Ok(CliCommand::Validate { file })
        }
        Some("schema") => Ok(CliCommand::Schema),
        Some(other) => Err(anyhow!("Unknown command: {other}\n{}", usage())),
    }
}

fn build_orchestrator(offline: bool) -> MetadataOrchestrator {
    let orchestrator = MetadataOrchestrator::new(CONFIG.llm_timeout());
    if offline {
        info!("Offline mode: remote generation disabled");
        return orchestrator;
    }
    if !CONFIG.has_openai_credentials() {
        info!("OPENAI_API_KEY not set; listings will use the template generator");
        return orchestrator;
    }

    let client = Arc::new(OpenAiClient::from_config(&CONFIG));
    orchestrator
        .with_generator(client.clone())
        .with_repairer(client)
}

async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let subject = args.image.display().to_string();
    let mut timer = start_run_timer("generate", Some(&subject));

    let image_path = args.image.clone();
    let analyzed = tokio::task::spawn_blocking(move || analyze_image(&image_path))
        .await
        .context("image analysis task panicked")?;
    let info = match analyzed {
        Ok(info) => info,
        Err(err) => {
            complete_run_timer(&mut timer, "rejected", Some(err.to_string()));
            return Err(MetadataError::from(err).into());
        }
    };

    let platform = args
        .platform
        .as_deref()
        .unwrap_or(CONFIG.default_platform.as_str());
    let context = RequestContext::new(args.category, platform, args.style);

    let mut result = match build_orchestrator(args.offline)
        .produce_metadata(&info, &context)
        .await
    {
        Ok(result) => result,
        Err(err) => {
            complete_run_timer(&mut timer, "rejected", Some(err.to_string()));
            return Err(err.into());
        }
    };
    let path = result.path();
    info!(
        "Listing ready: title={} ai_used={}",
        result.get("title").and_then(|v| v.as_str()).unwrap_or_default(),
        result.ai_used()
    );
    result.insert("image_path", Value::String(subject));

    let rendered = serde_json::to_string_pretty(&result.into_value())?;
    match &args.output {
        Some(output) => {
            tokio::fs::write(output, format!("{rendered}\n"))
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote listing metadata to {}", output.display());
        }
        None => println!("{rendered}"),
    }

    complete_run_timer(&mut timer, "success", Some(format!("path={}", path.as_str())));
    Ok(())
}

async fn run_validate(file: PathBuf) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => return Err(anyhow!("invalid: not valid JSON: {err}")),
    };
    match is_valid_metadata(&value) {
        (true, _) => {
            println!("valid");
            Ok(())
        }
        (false, error) => Err(anyhow!("invalid: {}", error.unwrap_or_default())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_command(&args)?;

    match command {
        CliCommand::Help => {
            println!("{}", usage());
            Ok(())
        }
        CliCommand::Schema => {
            println!("{}", schema_description_pretty());
            Ok(())
        }
        CliCommand::Validate { file } => run_validate(file).await,
        CliCommand::Generate(generate_args) => {
            let _guards = init_logging();
            run_generate(generate_args).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        std::iter::once("listing-metadata")
            .chain(values.iter().copied())
            .map(|value| value.to_string())
            .collect()
    }

    #[test]
    fn parses_generate_with_all_flags() {
        let command = parse_command(&args(&[
            "generate",
            "--image",
            "mug.jpg",
            "--category",
            "Handmade Mug",
            "--platform",
            "etsy",
            "--tone",
            "cozy",
            "--output",
            "out.json",
            "--offline",
        ]))
        .unwrap();

        assert_eq!(
            command,
            CliCommand::Generate(GenerateArgs {
                image: PathBuf::from("mug.jpg"),
                category: Some("Handmade Mug".to_string()),
                platform: Some("etsy".to_string()),
                style: Some("cozy".to_string()),
                output: Some(PathBuf::from("out.json")),
                offline: true,
            })
        );
    }

    #[test]
    fn generate_requires_an_image() {
        let err = parse_command(&args(&["generate", "--category", "Mug"])).unwrap_err();
        assert!(err.to_string().contains("--image is required"));

        let err = parse_command(&args(&["generate", "--image"])).unwrap_err();
        assert!(err.to_string().contains("Missing value for --image"));
    }

    #[test]
    fn parses_other_commands() {
        assert_eq!(parse_command(&args(&[])).unwrap(), CliCommand::Help);
        assert_eq!(parse_command(&args(&["schema"])).unwrap(), CliCommand::Schema);
        assert_eq!(
            parse_command(&args(&["validate", "--file", "listing.json"])).unwrap(),
            CliCommand::Validate {
                file: PathBuf::from("listing.json")
            }
        );
        assert!(parse_command(&args(&["serve"])).is_err());
        assert!(parse_command(&args(&["validate", "--strict"])).is_err());
    }

    #[tokio::test]
    async fn validate_reports_schema_violations() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"title":"t","bullets":["b"],"description":"d"}"#).unwrap();
        assert!(run_validate(good).await.is_ok());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"title":"No bullets"}"#).unwrap();
        let err = run_validate(bad).await.unwrap_err();
        assert!(err.to_string().contains("bullets"));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "not json").unwrap();
        let err = run_validate(broken).await.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }
}

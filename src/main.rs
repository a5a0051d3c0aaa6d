use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    catalog: Option<String>,
    ids: Option<String>,
    id: Option<String>,
    base_url: Option<String>,
    no_audio: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    let request = songdeck::playlist::request_from_params(args.ids.as_deref(), args.id.as_deref());
    let catalog_path = PathBuf::from(
        args.catalog
            .unwrap_or_else(|| String::from("catalog.json")),
    );
    let base_url = args
        .base_url
        .unwrap_or_else(|| String::from(songdeck::share::DEFAULT_BASE_URL));

    songdeck::app::run(songdeck::app::AppOptions {
        catalog_path,
        request,
        base_url,
        no_audio: args.no_audio,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--catalog" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--catalog requires a path");
                };
                out.catalog = Some(value.clone());
            }
            "--ids" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--ids requires a comma separated list");
                };
                out.ids = Some(value.clone());
            }
            "--id" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--id requires a song identifier");
                };
                out.id = Some(value.clone());
            }
            "--base-url" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--base-url requires a URL");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--base-url cannot be empty");
                }
                out.base_url = Some(value.trim().to_string());
            }
            "--no-audio" => out.no_audio = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("songdeck");
    println!("  --catalog path    Catalog JSON file (default catalog.json)");
    println!("  --ids a,b,c       Play the listed songs in order");
    println!("  --id x            Play a single song");
    println!("  --base-url url    Base URL used for share links");
    println!("  --no-audio        Run without an audio device");
}

mod cli;

use filescraper::{
    checksum::Algorithm,
    config::{self, Config},
    FileScraper, ScrapeResult,
};
use filescraper_common::Params;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "filescraper=trace,filescraper_tools=trace,filescraper_common=trace".to_string()
        } else {
            "filescraper=info,filescraper_tools=info,filescraper_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scrape {
            file,
            no_wellformed,
            mimetype,
            format_version,
            params,
            json,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let params = build_params(&params, mimetype, format_version)?;
            let check_wellformed = config.scrape.check_wellformed && !no_wellformed;
            scrape_file(&file, &config, params, check_wellformed, json)
        }
        Commands::IsText { file } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            is_text(&file, &config)
        }
        Commands::Checksum { file, algorithm } => checksum(&file, &algorithm),
        Commands::CheckTools => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Validate { config } => validate_config(config.as_deref()),
        Commands::Version => {
            println!("filescraper {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn build_params(
    pairs: &[String],
    mimetype: Option<String>,
    version: Option<String>,
) -> Result<Params> {
    let mut params = Params::new();
    for pair in pairs {
        let (key, value) = Params::parse_pair(pair)?;
        params.insert(key, value);
    }
    if let Some(mimetype) = mimetype {
        params.insert(filescraper_common::params::MIMETYPE, mimetype);
    }
    if let Some(version) = version {
        params.insert(filescraper_common::params::VERSION, version);
    }
    Ok(params)
}

fn scraper_for(file: &Path, config: &Config) -> FileScraper {
    FileScraper::new(file).with_tools(Arc::new(config.tools_config()))
}

fn scrape_file(
    file: &Path,
    config: &Config,
    params: Params,
    check_wellformed: bool,
    json: bool,
) -> Result<()> {
    let result = scraper_for(file, config)
        .with_params(params)
        .scrape(check_wellformed)
        .with_context(|| format!("Failed to scrape {:?}", file))?;

    if json {
        let json_str = serde_json::to_string_pretty(&result)?;
        println!("{}", json_str);
    } else {
        print_result(file, &result);
    }

    Ok(())
}

fn print_result(file: &Path, result: &ScrapeResult) {
    println!("File: {}", file.display());
    println!("MIME type: {}", result.mimetype);
    println!("Version: {}", result.version);
    match result.well_formed {
        Some(true) => println!("Well-formed: yes"),
        Some(false) => println!("Well-formed: no"),
        None => println!("Well-formed: not checked"),
    }

    println!("\nStreams: {}", result.streams.len());
    for (index, stream) in &result.streams {
        println!("  [{}]", index);
        for (name, value) in stream.iter() {
            println!("      {}: {}", name, value);
        }
    }

    println!("\nInfo:");
    for (index, info) in &result.info {
        println!("  [{}] {}", index, info.class);
        for message in &info.messages {
            println!("      message: {}", message);
        }
        for error in &info.errors {
            println!("      error: {}", error);
        }
    }

    if !result.conflicts.is_empty() {
        println!("\nConflicts:");
        for conflict in &result.conflicts {
            println!("  {}", conflict);
        }
    }
}

fn is_text(file: &Path, config: &Config) -> Result<()> {
    match scraper_for(file, config).is_textfile()? {
        Some(true) => println!("{}: text", file.display()),
        Some(false) => println!("{}: not text", file.display()),
        None => println!("{}: unknown", file.display()),
    }
    Ok(())
}

fn checksum(file: &Path, algorithm: &str) -> Result<()> {
    let algorithm: Algorithm = algorithm.parse()?;
    let digest = FileScraper::new(file)
        .checksum(algorithm)
        .with_context(|| format!("Failed to hash {:?}", file))?;
    println!("{}  {}", digest, file.display());
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = filescraper_tools::check_tools(&config.tools_config());
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All tools are available!");
    } else {
        println!("Some tools are missing. Files of the types they handle cannot be checked.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Check well-formedness: {}", config.scrape.check_wellformed);
            let tools = config.tools_config();
            for (name, _) in filescraper_tools::tools::KNOWN_TOOLS {
                if let Some(path) = tools.path_for(name) {
                    println!("  {}: {}", name, path.display());
                }
            }
            if let Some(ref dir) = tools.schematron_xsl_dir {
                println!("  Schematron XSL: {}", dir.display());
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Check well-formedness: {}", config.scrape.check_wellformed);
        }
    }

    Ok(())
}

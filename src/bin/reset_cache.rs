use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tracing::error;

use volley_ingest::config::{self, LoaderConfig};
use volley_ingest::domain::Domain;
use volley_ingest::loader::Loader;
use volley_ingest::logging;

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();

    let domains = parse_domain_arg()?;
    let mut config = LoaderConfig::from_env();
    if let Some(root) = parse_data_dir_arg() {
        config = config.with_data_root(root);
    }
    let loader = Loader::from_config(config);

    let mut failed = 0usize;
    for domain in domains {
        match loader.invalidate(domain) {
            Ok(true) => println!("{}: cache cleared", domain.label()),
            Ok(false) => println!("{}: no cache to clear", domain.label()),
            Err(err) => {
                error!(%domain, error = %format!("{err:#}"), "failed to clear cache");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(anyhow!("{failed} cache(s) could not be cleared"));
    }
    Ok(())
}

fn parse_domain_arg() -> Result<Vec<Domain>> {
    let Some(raw) = flag_value("--domain") else {
        return Ok(Domain::ALL.to_vec());
    };
    if raw.eq_ignore_ascii_case("all") {
        return Ok(Domain::ALL.to_vec());
    }
    let domains = raw
        .split(',')
        .map(str::parse::<Domain>)
        .collect::<Result<Vec<_>>>()?;
    if domains.is_empty() {
        return Err(anyhow!("no domains given"));
    }
    Ok(domains)
}

fn parse_data_dir_arg() -> Option<PathBuf> {
    flag_value("--data-dir").map(PathBuf::from)
}

fn flag_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
        {
            let trimmed = next.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

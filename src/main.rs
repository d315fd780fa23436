use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::error;

use volley_ingest::cache::ParquetCache;
use volley_ingest::config::{self, LoaderConfig};
use volley_ingest::domain::Domain;
use volley_ingest::export::export_table;
use volley_ingest::loader::Loader;
use volley_ingest::logging;
use volley_ingest::summary::{RowFilter, summarize};

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let domains = parse_domains(&args)?;
    let force_rebuild = args.iter().any(|a| a == "--rebuild");

    let mut config = LoaderConfig::from_env();
    if let Some(root) = arg_value(&args, "--data-dir") {
        config = config.with_data_root(PathBuf::from(root));
    }
    let loader = Loader::from_config(config);
    let filter = parse_filter(&args);
    let export_path = arg_value(&args, "--export").map(PathBuf::from);
    if export_path.is_some() && domains.len() != 1 {
        return Err(anyhow!("--export needs exactly one --domain"));
    }

    let failed = run_each(&domains, |domain| {
        report_domain(&loader, domain, force_rebuild, &filter, export_path.as_deref())
    });
    if !failed.is_empty() {
        let keys = failed.iter().map(|d| d.key()).collect::<Vec<_>>();
        return Err(anyhow!(
            "{} of {} domains failed: {}",
            failed.len(),
            domains.len(),
            keys.join(", ")
        ));
    }
    Ok(())
}

fn run_each(domains: &[Domain], mut step: impl FnMut(Domain) -> Result<()>) -> Vec<Domain> {
    let mut failed = Vec::new();
    for &domain in domains {
        if let Err(err) = step(domain) {
            error!(%domain, error = %format!("{err:#}"), "domain failed");
            failed.push(domain);
        }
    }
    failed
}

fn report_domain(
    loader: &Loader<ParquetCache>,
    domain: Domain,
    force_rebuild: bool,
    filter: &RowFilter,
    export_path: Option<&Path>,
) -> Result<()> {
    let table = loader.load(domain, force_rebuild)?;
    let table = filter.apply(&table);
    let summary = summarize(&table);

    println!("{}", domain.label());
    if table.is_empty() {
        println!("  no data found or processed");
        return Ok(());
    }
    println!("  records: {}", summary.total_records);
    println!("  historical records: {}", summary.historical_records);
    println!("  recent records: {}", summary.recent_records);
    println!("  columns: {}", summary.columns);
    println!("  seasons: {}", summary.seasons.join(", "));
    if let Some(latest) = summary.latest_date {
        println!("  current as of: {latest}");
    }

    if let Some(path) = export_path {
        let report = export_table(&table, path, domain.label())?;
        println!(
            "  exported {} rows x {} columns to {}",
            report.rows,
            report.columns,
            path.display()
        );
    }
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    arg_values(args, flag).into_iter().next()
}

fn arg_values(args: &[String], flag: &str) -> Vec<String> {
    let prefix = format!("{flag}=");
    let mut out = Vec::new();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
            continue;
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            out.push(next.trim().to_string());
        }
    }
    out
}

fn parse_domains(args: &[String]) -> Result<Vec<Domain>> {
    let raw = arg_values(args, "--domain");
    if raw.is_empty() || raw.iter().any(|r| r.eq_ignore_ascii_case("all")) {
        return Ok(Domain::ALL.to_vec());
    }
    let mut out = Vec::new();
    for value in raw {
        for part in value.split(',') {
            let domain = part.parse::<Domain>()?;
            if !out.contains(&domain) {
                out.push(domain);
            }
        }
    }
    Ok(out)
}

fn parse_filter(args: &[String]) -> RowFilter {
    RowFilter {
        seasons: arg_values(args, "--season"),
        teams: arg_values(args, "--team"),
        homes: arg_values(args, "--home"),
        aways: arg_values(args, "--away"),
        search: arg_value(args, "--search"),
        exclude_unknown: args.iter().any(|a| a == "--known-only"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_domain_does_not_stop_the_rest() {
        let mut visited = Vec::new();
        let failed = run_each(&Domain::ALL, |domain| {
            visited.push(domain);
            if domain == Domain::Match {
                Err(anyhow!("match exports unreadable"))
            } else {
                Ok(())
            }
        });
        assert_eq!(visited, Domain::ALL.to_vec());
        assert_eq!(failed, vec![Domain::Match]);
    }

    #[test]
    fn flag_values_accept_both_forms() {
        let args = ["--team=A", "--team", "B", "--rebuild"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        assert_eq!(arg_values(&args, "--team"), vec!["A", "B"]);
        assert_eq!(arg_value(&args, "--season"), None);
    }

    #[test]
    fn domain_list_dedups_and_defaults_to_all() {
        let args = ["--domain", "overall,Overall", "--domain=match"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            parse_domains(&args).unwrap(),
            vec![Domain::Overall, Domain::Match]
        );
        assert_eq!(parse_domains(&[]).unwrap(), Domain::ALL.to_vec());
    }
}

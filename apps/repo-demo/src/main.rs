//! repo-demo: walks through a mapped repository over an in-memory link store.
//!
//! Every run seeds `DEMO_SEED_COUNT` links through the mapped repository and
//! then executes one command against it. Data is not persisted across runs.
//!
//! Run:
//! ```bash
//! cargo run -p repo-demo -- list 1
//! LOG_FORMAT=json RUST_LOG=mapped_repo=trace cargo run -p repo-demo -- search https://docs
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;
mod links;

use std::env;
use std::process;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use mapped_repo::adapters::InMemoryRepository;
use mapped_repo::{
    Base62Ids, CrudRepository, Example, ExampleMatcher, ExampleRepository, MappedRepository,
    Order, Pageable, PagingAndSortingRepository, Repository, RepositoryError, Sort, StringMatcher,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use links::{LinkMapper, LinkRecord, ShortLink, NON_KEY_FIELDS};

type LinkStore = InMemoryRepository<LinkRecord, Base62Ids>;
type Links = MappedRepository<LinkStore, LinkMapper>;

const HOSTS: [&str; 3] = ["https://docs.example.com", "https://blog.example.com", "https://example.org"];
const OWNERS: [&str; 2] = ["ada@example.com", "linus@example.com"];

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  repo-demo list [page]\n  repo-demo search <url-prefix>\n  repo-demo get <slug>\n  repo-demo stats\n\nNotes:\n  - Links are seeded into an in-memory store on every run; nothing is persisted.",
        mapped_repo::about()
    );
}

fn seed(links: &Links, count: usize) -> Result<(), String> {
    let start = SystemTime::now();
    let batch: Vec<ShortLink> = (0..count)
        .map(|n| {
            let mut link = ShortLink::new(
                format!("{}/page/{}", HOSTS[n % HOSTS.len()], n),
                OWNERS[n % OWNERS.len()],
                start - Duration::from_secs(60 * n as u64),
            );
            link.clicks = (n as u64 * 7) % 50;
            link.active = n % 5 != 0;
            link
        })
        .collect();
    let saved = links
        .save_all_and_flush(batch)
        .map_err(|e| format!("seeding failed: {}", describe(&e)))?;
    info!(count = saved.len(), "seeded links");
    Ok(())
}

/// The error with its cause, for one-line CLI output.
fn describe(err: &RepositoryError) -> String {
    format!("{}: {}", err, err.cause())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| format!("encode failed: {}", e))?;
    println!("{}", out);
    Ok(())
}

#[derive(Serialize)]
struct Stats {
    total: u64,
    active: u64,
    by_owner: Vec<(String, u64)>,
}

fn stats(links: &Links) -> Result<Stats, String> {
    let total = links.count().map_err(|e| describe(&e))?;

    let ignore_all_but_active = ["slug", "target_url", "created_at_secs", "created_by", "click_count"];
    let active_probe = Example::with_matcher(
        ShortLink::probe_url(""),
        ExampleMatcher::matching().with_ignore_paths(ignore_all_but_active),
    );
    let active = links
        .count_by_example(active_probe)
        .map_err(|e| describe(&e))?;

    let mut by_owner = Vec::new();
    for owner in OWNERS {
        let mut probe = ShortLink::probe_url("");
        probe.created_by = owner.to_string();
        let example = Example::with_matcher(
            probe,
            ExampleMatcher::matching().with_ignore_paths(["target_url", "created_at_secs", "click_count", "active"]),
        );
        let n = links.count_by_example(example).map_err(|e| describe(&e))?;
        by_owner.push((owner.to_string(), n));
    }

    Ok(Stats {
        total,
        active,
        by_owner,
    })
}

fn run(cfg: &config::Config) -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    let store = Arc::new(LinkStore::new(Base62Ids::new(cfg.id_width)));
    let links = MappedRepository::new(store, LinkMapper);
    seed(&links, cfg.seed_count)?;

    match cmd.as_str() {
        "list" => {
            let page_index = match args.next() {
                Some(raw) => raw
                    .parse::<usize>()
                    .map_err(|_| format!("invalid page number: {}", raw))?,
                None => 0,
            };
            let newest_first = Sort::by_orders([Order::desc("created_at_secs")]);
            let pageable = Pageable::of_sorted(page_index, cfg.page_size, newest_first)
                .map_err(|e| e.to_string())?;
            let page = links
                .find_all_paged(&pageable)
                .map_err(|e| format!("list failed: {}", describe(&e)))?;
            print_json(&page)
        }
        "search" => {
            let Some(prefix) = args.next() else {
                return Err("missing <url-prefix> for search".into());
            };
            let matcher = ExampleMatcher::matching()
                .with_ignore_paths(NON_KEY_FIELDS)
                .with_string_matcher(StringMatcher::Starting)
                .with_ignore_case();
            let found = links
                .find_all_by_example_sorted(
                    Example::with_matcher(ShortLink::probe_url(prefix), matcher),
                    &Sort::by(["target_url"]),
                )
                .map_err(|e| format!("search failed: {}", describe(&e)))?;
            print_json(&found)
        }
        "get" => {
            let Some(slug) = args.next() else {
                return Err("missing <slug> for get".into());
            };
            if !links.exists_by_id(&slug).map_err(|e| describe(&e))? {
                return Err("not found".into());
            }
            let link = links
                .get_by_id(&slug)
                .map_err(|e| format!("get failed: {}", describe(&e)))?;
            print_json(&link)
        }
        "stats" => print_json(&stats(&links)?),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // logs go to stderr so stdout stays valid JSON
    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    init_tracing(&cfg);

    if let Err(msg) = run(&cfg) {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}

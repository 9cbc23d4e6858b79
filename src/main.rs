use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use collection_store::{
    Action, CollectionType, Entity, EntityPatch, Filters, InMemoryTransport, InMemoryTransportConfig,
    MutationOutcome, NewEntity, SortConfig, SortDirection, SortField, Store, StoreConfig,
    settle_all,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "collection-store")]
#[command(about = "Drives an optimistic collection store against a simulated server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create collections, rename a few, delete some and print the view.
    Demo {
        #[arg(long, default_value_t = 8)]
        count: usize,
        #[arg(long, default_value_t = 20)]
        latency_ms: u64,
        /// Make every n-th transport call fail.
        #[arg(long)]
        fail_every: Option<u64>,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,
        #[arg(long)]
        desc: bool,
    },
    /// Print the configuration resolved from the environment.
    Config,
}

/// Logs go to stderr; stdout carries the table.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("collection_store=warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to install tracing subscriber")
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Type,
    Items,
    Created,
    Updated,
}

impl From<SortArg> for SortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortField::Name,
            SortArg::Type => SortField::Kind,
            SortArg::Items => SortField::ItemCount,
            SortArg::Created => SortField::CreatedAt,
            SortArg::Updated => SortField::UpdatedAt,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    match cli.command {
        Command::Demo {
            count,
            latency_ms,
            fail_every,
            search,
            sort,
            desc,
        } => {
            let direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            run_demo(
                count,
                latency_ms,
                fail_every,
                &search,
                SortConfig::new(sort.into(), direction),
            )
            .await
        }
        Command::Config => {
            let config = StoreConfig::from_env().context("reading store configuration")?;
            println!("owner_id:            {}", config.owner_id);
            println!("page_size:           {}", config.page_size);
            println!("duplicate_suffix:    {:?}", config.duplicate_suffix);
            println!("max_retained_errors: {}", config.max_retained_errors);
            Ok(())
        }
    }
}

async fn run_demo(
    count: usize,
    latency_ms: u64,
    fail_every: Option<u64>,
    search: &str,
    sort: SortConfig,
) -> Result<()> {
    let config = StoreConfig::from_env().context("reading store configuration")?;
    let mut transport_config = InMemoryTransportConfig::default()
        .latency(Duration::from_millis(latency_ms))
        .owner_id(&config.owner_id);
    if let Some(n) = fail_every {
        transport_config = transport_config.fail_every(n);
    }
    let transport = Arc::new(InMemoryTransport::new(transport_config));
    let store = Store::new(transport.clone(), config).context("creating store")?;

    let kinds = [CollectionType::Personal, CollectionType::Shared, CollectionType::Public];
    let creates: Vec<_> = (0..count)
        .flat_map(|i| {
            let data = NewEntity::new(format!("Collection {i}"), kinds[i % kinds.len()])
                .description(format!("Demo collection number {i}"))
                .tag(if i % 2 == 0 { "even" } else { "odd" });
            store.dispatch(Action::CreateEntity(data))
        })
        .collect();
    println!("{} creates issued, {} visible before any reply", creates.len(), store.sorted().len());
    report("create", settle_all(creates).await);

    let confirmed: Vec<Entity> = store.sorted().iter().cloned().collect();
    let renames: Vec<_> = confirmed
        .iter()
        .step_by(3)
        .flat_map(|entity| {
            store.dispatch(Action::UpdateEntity {
                id: entity.id.clone(),
                patch: EntityPatch::new().name(format!("{} (renamed)", entity.name)),
            })
        })
        .collect();
    report("update", settle_all(renames).await);

    let doomed: Vec<_> = confirmed.iter().skip(1).step_by(4).map(|e| e.id.clone()).collect();
    report("delete", settle_all(store.dispatch(Action::BulkDelete(doomed))).await);

    store.dispatch(Action::SetSearch(search.to_string()));
    store.dispatch(Action::SetFilters(Filters::new()));
    store.dispatch(Action::SetSort(sort));

    let derived = store.derived();
    println!();
    println!("{:<12} {:<32} {:<10} {}", "ID", "NAME", "TYPE", "TAGS");
    for entity in derived.page.iter() {
        let tags: Vec<&str> = entity.tags.iter().map(String::as_str).collect();
        println!(
            "{:<12} {:<32} {:<10} {}",
            entity.id.as_str(),
            entity.name,
            entity.kind.label(),
            tags.join(",")
        );
    }
    println!();
    println!(
        "{} matching, page 1 of {}, {} server records, {} transport calls",
        derived.filtered.len(),
        derived.page_count.max(1),
        transport.records().await.len(),
        transport.call_count()
    );
    for error in store.errors() {
        println!("error: {error}");
    }
    Ok(())
}

fn report(label: &str, outcomes: Vec<MutationOutcome>) {
    let applied = outcomes.iter().filter(|o| o.is_applied()).count();
    let failed = outcomes.iter().filter(|o| o.error().is_some()).count();
    println!("{label}: {applied} applied, {failed} rolled back, {} other", outcomes.len() - applied - failed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_subscriber_is_installed_once() {
        assert!(init_tracing().is_ok());
        assert!(tracing::dispatcher::has_been_set());
        assert!(init_tracing().is_err());
    }

    #[test]
    fn test_demo_arguments_parse() {
        let cli = Cli::try_parse_from(["collection-store", "demo", "--sort", "items", "--desc"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Demo { sort: SortArg::Items, desc: true, .. }
        ));
    }
}

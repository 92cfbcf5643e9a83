use shared::RequestState;
use shared::query::{Filter, ListQuery, SortField, SortSpec};
use vacation_client::{ClientConfig, ResilientRecordStore, allowed_events, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = ClientConfig::from_env();
    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!("Vacation client starting...");

    let store = ResilientRecordStore::from_config(&config).await?;
    store.initialize().await?;

    let page = store
        .list(ListQuery::all().order_by(SortSpec::asc(SortField::StartDate)))
        .await?;

    println!(
        "{} request(s), showing {} (mode: {:?})",
        page.total_count,
        page.len(),
        store.current_mode()
    );
    for request in &page.items {
        let events: Vec<&str> = allowed_events(request.state).iter().map(|e| e.as_str()).collect();
        println!(
            "#{:<4} {:<10} {} -> {} ({}d) {} [{}]",
            request.id,
            request.state,
            request.start_date,
            request.end_date,
            request.total_days,
            request.requester.display_name,
            events.join(", ")
        );
    }

    let stats = store.stats(None).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    let pending = store.stats(Some(Filter::by_state(RequestState::Pending))).await?;
    tracing::info!(pending = pending.pending, "Done");

    if let Some(reason) = store.connection_error() {
        tracing::warn!(reason = %reason, "Served from local mirror");
    }

    Ok(())
}

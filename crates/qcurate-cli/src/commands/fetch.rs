use crate::cli::FetchArgs;
use crate::config::builder::build_fetch_config;
use crate::error::Result;
use crate::portal::client::PortalClient;
use crate::portal::retrieve::retrieve_collection;
use crate::utils::progress::CliProgressHandler;
use qcurate::core::io::cache::save_collection;
use qcurate::engine::progress::ProgressReporter;
use tracing::info;

pub async fn run(args: FetchArgs) -> Result<()> {
    let config = build_fetch_config(&args)?;
    info!(
        "Fetching {} dataset(s) of kind '{}' from {} (specification '{}').",
        config.datasets.len(),
        config.kind,
        config.address,
        config.spec_name
    );

    let client = PortalClient::new(&config.address)?;
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Retrieving {} from {}...", config.datasets.join(", "), config.address);
    let collection = retrieve_collection(
        &client,
        config.kind,
        &config.datasets,
        &config.spec_name,
        &reporter,
    )
    .await?;

    info!("Writing collection cache to {:?}", &config.output_path);
    save_collection(&collection, &config.output_path)?;
    println!(
        "✓ {} results for {} molecules written to: {}",
        collection.n_results(),
        collection.n_molecules(),
        config.output_path.display()
    );
    Ok(())
}

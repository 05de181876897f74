//! Command execution

use anyhow::{Context, Result};
use filesearch_common::types::{
    ChunkingConfig, DocumentName, FileName, ModelName, Operation, OperationName, StoreName,
};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{ChunkingArgs, Cli, Commands, DocumentCommand, StoreCommand};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::import::ImportOptions;
use crate::orchestrator::IngestionOrchestrator;
use crate::progress::{create_spinner, format_bytes};
use crate::search::{SearchClient, SearchRequest};
use crate::stores::StoreClient;
use crate::upload::{guess_mime_type, UploadRequest};

/// Run `cli.command` until it finishes or `cancel` fires.
pub async fn execute(cli: &Cli, cancel: &CancellationToken) -> Result<()> {
    let config = ClientConfig::from_env_with(cli.api_key.clone(), cli.base_url.clone())
        .context("Failed to load client configuration")?;
    let api = ApiClient::from_config(&config)?;

    match &cli.command {
        Commands::Upload {
            path,
            store,
            display_name,
            mime_type,
            chunking,
            wait,
            timeout_secs,
        } => {
            let orchestrator = IngestionOrchestrator::new(api, &config);
            let store = StoreName::parse(store)?;
            let request = upload_request(path, display_name.as_deref(), mime_type.as_deref()).await?;

            let spinner = create_spinner(&format!(
                "Uploading {} ({})",
                path.display(),
                format_bytes(request.content_length)
            ));
            let op = orchestrator
                .ingest(&store, request, &import_options(chunking), cancel)
                .await;
            spinner.finish_and_clear();
            let op = op?;

            finish(&orchestrator, op, *wait, *timeout_secs, cancel).await
        }

        Commands::Import {
            file_name,
            store,
            chunking,
            wait,
            timeout_secs,
        } => {
            let orchestrator = IngestionOrchestrator::new(api, &config);
            let store = StoreName::parse(store)?;
            let file_name = FileName::parse(file_name)?;
            let options = import_options(chunking);

            let op = tokio::select! {
                _ = cancel.cancelled() => anyhow::bail!("cancelled"),
                op = orchestrator.importer().import_file_name(&store, &file_name, &options) => op?,
            };
            finish(&orchestrator, op, *wait, *timeout_secs, cancel).await
        }

        Commands::Wait {
            operation,
            timeout_secs,
        } => {
            let orchestrator = IngestionOrchestrator::new(api, &config);
            let name = OperationName::parse(operation)?;
            let op = wait_with_spinner(&orchestrator, &name, *timeout_secs, cancel).await?;
            print_json(&op)
        }

        Commands::Operation { name } => {
            let stores = StoreClient::new(api);
            let op = stores.get_operation(&OperationName::parse(name)?).await?;
            print_json(&op)
        }

        Commands::Search {
            query,
            stores,
            model,
            metadata_filter,
        } => {
            let stores = stores
                .iter()
                .map(|s| StoreName::parse(s))
                .collect::<Result<Vec<_>, _>>()?;
            let mut request =
                SearchRequest::new(query.as_str(), stores)?.with_model(ModelName::parse(model)?);
            if let Some(filter) = metadata_filter {
                request = request.with_metadata_filter(filter.as_str());
            }

            let search = SearchClient::new(api);
            let spinner = create_spinner("Searching");
            let answer = tokio::select! {
                _ = cancel.cancelled() => {
                    spinner.finish_and_clear();
                    anyhow::bail!("cancelled")
                }
                answer = search.search(&request) => answer,
            };
            spinner.finish_and_clear();
            print_json(&answer?)
        }

        Commands::Models => print_json(&SearchClient::new(api).list_models().await?),

        Commands::Stores { command } => stores_command(StoreClient::new(api), command).await,

        Commands::Documents { command } => {
            documents_command(StoreClient::new(api), command).await
        }
    }
}

async fn stores_command(stores: StoreClient, command: &StoreCommand) -> Result<()> {
    match command {
        StoreCommand::List {
            page_size,
            page_token,
        } => print_json(&stores.list_stores(*page_size, page_token.as_deref()).await?),
        StoreCommand::Create { display_name } => {
            print_json(&stores.create_store(display_name.as_deref()).await?)
        }
        StoreCommand::Get { store } => print_json(&stores.get_store(&StoreName::parse(store)?).await?),
        StoreCommand::Delete { store, force } => {
            let store = StoreName::parse(store)?;
            stores.delete_store(&store, *force).await?;
            print_json(&serde_json::json!({ "deleted": store }))
        }
    }
}

async fn documents_command(stores: StoreClient, command: &DocumentCommand) -> Result<()> {
    match command {
        DocumentCommand::List {
            store,
            page_size,
            page_token,
        } => {
            let store = StoreName::parse(store)?;
            print_json(&stores.list_documents(&store, *page_size, page_token.as_deref()).await?)
        }
        DocumentCommand::Get { store, document } => {
            let name = StoreName::parse(store)?.document(document)?;
            print_json(&stores.get_document(&name).await?)
        }
        DocumentCommand::Delete {
            store,
            document,
            force,
        } => {
            let name: DocumentName = StoreName::parse(store)?.document(document)?;
            stores.delete_document(&name, *force).await?;
            print_json(&serde_json::json!({ "deleted": name }))
        }
    }
}

async fn upload_request(
    path: &Path,
    display_name: Option<&str>,
    mime_type: Option<&str>,
) -> Result<UploadRequest> {
    let mime_type = match mime_type {
        Some(mime) => mime.to_string(),
        None => guess_mime_type(path)
            .with_context(|| format!("Cannot infer MIME type of {}; pass --mime-type", path.display()))?
            .to_string(),
    };
    let display_name = display_name
        .map(str::to_string)
        .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()));

    let mut request = UploadRequest::from_file(path, mime_type)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    request.display_name = display_name;
    Ok(request)
}

fn import_options(chunking: &ChunkingArgs) -> ImportOptions {
    ImportOptions::with_chunking(ChunkingConfig::new(
        chunking.max_tokens_per_chunk,
        chunking.max_overlap_tokens,
    ))
}

async fn finish(
    orchestrator: &IngestionOrchestrator,
    op: Operation,
    wait: bool,
    timeout_secs: Option<u64>,
    cancel: &CancellationToken,
) -> Result<()> {
    info!(operation = %op.name, "Import accepted");
    if !wait || op.done {
        return print_json(&op);
    }
    let name = OperationName::parse(&op.name)?;
    let done = wait_with_spinner(orchestrator, &name, timeout_secs, cancel).await?;
    print_json(&done)
}

async fn wait_with_spinner(
    orchestrator: &IngestionOrchestrator,
    name: &OperationName,
    timeout_secs: Option<u64>,
    cancel: &CancellationToken,
) -> Result<Operation> {
    let spinner = create_spinner(&format!("Waiting for {name}"));
    let waited = orchestrator
        .wait(name, timeout_secs.map(Duration::from_secs), cancel)
        .await;
    spinner.finish_and_clear();

    match waited {
        Ok(op) => Ok(op),
        Err(e) if e.is_still_running() => {
            eprintln!("Still indexing; run `filesearch wait {name}` to keep waiting.");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

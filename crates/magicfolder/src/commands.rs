//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use magicfolder_api::{AppState, create_router};
use magicfolder_config::ApplicationConfig;
use magicfolder_indexing::{Worker, WorkerPool};
use magicfolder_meta_data::{BasicFileMetadata, PROCESS_FILE_TASK, TaskEnqueue};
use magicfolder_watcher::FileWatcherService;

use crate::bootstrap::App;

/// Run the daemon until Ctrl-C
pub fn serve(config: &ApplicationConfig) -> anyhow::Result<()> {
    let app = App::bootstrap(config)?;

    let mut worker_pool = WorkerPool::new(config.num_workers, Arc::clone(&app.services))?;
    worker_pool.start()?;

    let mut watcher = if config.file_watcher_enabled {
        std::fs::create_dir_all(&config.watch_directory)
            .with_context(|| format!("failed to create '{}'", config.watch_directory))?;
        let mut service = FileWatcherService::new(
            app.watch_config(config),
            Arc::clone(&app.queue),
            Arc::clone(&app.store),
        );
        service.start()?;
        service.initial_scan();
        Some(service)
    } else {
        None
    };

    let state = AppState::new(
        Arc::clone(&app.store),
        Arc::clone(&app.queue),
        Arc::clone(&app.search),
        Arc::clone(&app.embedder),
    );
    let router = create_router(state);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    let bind_addr = config.api_base_url.clone();
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind '{bind_addr}'"))?;
        info!(addr = %bind_addr, "HTTP API listening");
        println!("Magic Folder API listening on http://{bind_addr}");
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await
            .context("HTTP server failed")
    })?;

    // Reverse of startup: stop producing, then stop consuming, then close.
    if let Some(service) = watcher.as_mut() {
        service.stop();
    }
    worker_pool.stop();
    app.pool.shutdown();
    println!("Shut down cleanly.");
    Ok(())
}

/// Queue one file and drain the queue synchronously
pub fn process(config: &ApplicationConfig, file_path: &Path) -> anyhow::Result<()> {
    let app = App::bootstrap(config)?;
    let path_str = file_path.display().to_string();

    let stub = BasicFileMetadata::from_fs(file_path)
        .with_context(|| format!("cannot read file '{path_str}'"))?;
    app.store.upsert_file_stub(&stub)?;
    match app.queue.create_task(PROCESS_FILE_TASK, &path_str, 10)? {
        TaskEnqueue::Created(task_id) => info!(task_id, "task created"),
        TaskEnqueue::AlreadyQueued => println!("A task for this file was already outstanding."),
    }

    let worker = Worker::new(0, Arc::clone(&app.services));
    while worker.run_one_task()? {}

    let row = app
        .store
        .get_file_metadata(&path_str)?
        .context("file row missing after processing")?;
    println!("{path_str}: {}", row.processing_status);
    Ok(())
}

/// Search and print both granularities
pub fn search(config: &ApplicationConfig, query: &str, top_k: usize) -> anyhow::Result<()> {
    let app = App::bootstrap(config)?;
    let results = app.search.search(query, top_k)?;

    if results.file_results.is_empty() {
        println!("No matches.");
        return Ok(());
    }

    println!("Files:");
    for hit in &results.file_results {
        println!("  {:>8.4}  {}", hit.distance, hit.file.path);
    }
    if !results.chunk_results.is_empty() {
        println!("Passages:");
        for chunk in &results.chunk_results {
            let preview: String = chunk.content.chars().take(120).collect();
            println!(
                "  {:>8.4}  [file {} chunk {}] {}",
                chunk.distance, chunk.file_id, chunk.chunk_index, preview
            );
        }
    }
    Ok(())
}

/// Print every indexed file
pub fn list(config: &ApplicationConfig) -> anyhow::Result<()> {
    let app = App::bootstrap(config)?;
    let files = app.store.list_all_files()?;
    if files.is_empty() {
        println!("No files indexed.");
        return Ok(());
    }
    for file in files {
        println!(
            "{:>6}  {:<10}  {:<9}  {:>10}  {}",
            file.id,
            file.processing_status.to_string(),
            file.file_type.to_string(),
            file.file_size,
            file.path
        );
    }
    Ok(())
}

/// Delete one file's metadata (chunks cascade)
pub fn delete(config: &ApplicationConfig, path: &str) -> anyhow::Result<()> {
    let app = App::bootstrap(config)?;
    app.store.delete_file_metadata(path)?;
    println!("Deleted '{path}'.");
    Ok(())
}

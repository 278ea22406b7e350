//! arxiv-rec CLI
//!
//! Semantic arXiv paper recommendations backed by an exact vector index.
//!
//! # Usage
//!
//! ```bash
//! # Build artifacts from a metadata snapshot
//! arxiv-rec build --data data/arxiv-metadata-oai-snapshot.json --artifacts artifacts
//!
//! # Start the server
//! arxiv-rec serve --artifacts artifacts --port 8080
//!
//! # Query a running server
//! arxiv-rec search --query "graph neural networks for molecules" -k 5
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use arxiv_rec::corpus::{load_corpus, prepare_corpus, save_corpus};
use arxiv_rec::embed::{Embedder, HttpEmbedder, DEFAULT_BATCH_SIZE, DEFAULT_MODEL};
use arxiv_rec::index::VectorIndex;
use arxiv_rec::server::{serve, AppState, ResultsResponse};

const INDEX_FILE: &str = "index.vec";
const PAPERS_FILE: &str = "papers.jsonl";

#[derive(Parser)]
#[command(name = "arxiv-rec")]
#[command(about = "Semantic arXiv paper recommender")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build index + metadata artifacts from a metadata snapshot
    Build {
        /// Path to the JSON-lines metadata snapshot
        #[arg(short, long)]
        data: PathBuf,

        /// Directory for the produced artifacts
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Optional row limit for quick runs
        #[arg(long)]
        limit: Option<usize>,

        /// Texts per embedding request
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Base URL of the embedding service
        #[arg(long, default_value = "http://localhost:8090")]
        embed_url: String,

        /// Embedding model name
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
    },

    /// Start the HTTP server over previously built artifacts
    Serve {
        /// Directory holding index.vec and papers.jsonl
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Base URL of the embedding service
        #[arg(long, default_value = "http://localhost:8090")]
        embed_url: String,

        /// Embedding model name (must match the build)
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
    },

    /// Display statistics about a .vec index file
    Stats {
        /// Path to the .vec file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Search a running server
    Search {
        /// Server URL
        #[arg(long, default_value = "http://localhost:8080")]
        server: String,

        /// Free-text query
        #[arg(short, long)]
        query: String,

        /// Number of results
        #[arg(short = 'k', long, default_value = "5")]
        k: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            data,
            artifacts,
            limit,
            batch_size,
            embed_url,
            model,
        } => {
            tracing::info!("loading metadata snapshot from {:?}", data);
            let mut records = load_corpus(&data)?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }

            let papers = prepare_corpus(records);
            anyhow::ensure!(!papers.is_empty(), "no usable rows in {:?}", data);
            tracing::info!("prepared corpus: {} papers", papers.len());

            let embedder = HttpEmbedder::new(&embed_url, &model).with_batch_size(batch_size);

            let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(papers.len());
            let texts: Vec<String> = papers.iter().map(|p| p.combined_text()).collect();
            for (i, chunk) in texts.chunks(batch_size).enumerate() {
                let vectors = embedder
                    .embed_batch(chunk)
                    .await
                    .with_context(|| format!("embedding batch {}", i))?;
                embeddings.extend(vectors);

                let done = (i + 1) * batch_size;
                tracing::info!(
                    "embedding corpus: {}/{}",
                    done.min(texts.len()),
                    texts.len()
                );
            }

            let papers_path = artifacts.join(PAPERS_FILE);
            save_corpus(&papers_path, &papers)?;
            tracing::info!("saved metadata to {:?}", papers_path);

            let index = VectorIndex::from_embeddings(&embeddings)?;
            let index_path = artifacts.join(INDEX_FILE);
            index.save(&index_path)?;
            tracing::info!(
                "saved index with {} vectors of dimension {} to {:?}",
                index.len(),
                index.dimension(),
                index_path
            );
        }

        Commands::Serve {
            artifacts,
            port,
            host,
            embed_url,
            model,
        } => {
            let index_path = artifacts.join(INDEX_FILE);
            let papers_path = artifacts.join(PAPERS_FILE);

            tracing::info!("loading index from {:?}", index_path);
            let index = VectorIndex::load(&index_path)
                .with_context(|| format!("loading {:?} (run `build` first)", index_path))?;
            tracing::info!(
                "loaded {} vectors of dimension {}",
                index.len(),
                index.dimension()
            );

            let papers = load_corpus(&papers_path)?;
            let embedder = Arc::new(HttpEmbedder::new(&embed_url, &model));
            let state = Arc::new(AppState::new(index, papers, embedder)?);

            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            serve(state, addr).await?;
        }

        Commands::Stats { file } => {
            let index = VectorIndex::load(&file)?;
            let bytes = std::fs::metadata(&file)?.len();
            println!("Index File: {:?}", file);
            println!("  Vectors: {}", index.len());
            println!("  Dimension: {}", index.dimension());
            println!("  File Size: {:.2} MB", bytes as f64 / (1024.0 * 1024.0));
        }

        Commands::Search { server, query, k } => {
            let client = reqwest::Client::new();
            let url = format!("{}/search", server.trim_end_matches('/'));

            let k = k.to_string();
            let response = client
                .get(&url)
                .query(&[("q", query.as_str()), ("k", k.as_str())])
                .send()
                .await?;

            if !response.status().is_success() {
                let error: serde_json::Value = response.json().await?;
                eprintln!("Error: {}", error);
                std::process::exit(1);
            }

            let result: ResultsResponse = response.json().await?;
            println!("Results:");
            for hit in result.results {
                println!("  {:.4}  {}  [{}]", hit.score, hit.title, hit.id);
                println!("         {}", hit.categories);
            }
        }
    }

    Ok(())
}

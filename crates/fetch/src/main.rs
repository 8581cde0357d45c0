//! DocForge Fetch CLI
//!
//! Walks a MinIO (S3-compatible) bucket prefix and posts every object
//! to a running ingestion service. Intended for bulk backfills of an
//! existing document store.

use anyhow::{bail, Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use clap::Parser;
use serde_json::json;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "fetch", about = "Bulk-ingest documents from MinIO into DocForge")]
struct Args {
    /// MinIO endpoint URL, e.g. http://localhost:9000
    #[arg(long, env = "MINIO_ENDPOINT")]
    endpoint: Option<String>,

    /// MinIO access key
    #[arg(long, env = "MINIO_ACCESS_KEY")]
    access_key: Option<String>,

    /// MinIO secret key
    #[arg(long, env = "MINIO_SECRET_KEY")]
    secret_key: Option<String>,

    /// Bucket to read from
    #[arg(long, env = "MINIO_BUCKET", default_value = "kb-documents")]
    bucket: String,

    /// Key prefix to walk
    #[arg(long, env = "MINIO_PREFIX", default_value = "data/")]
    prefix: String,

    /// Ingestion endpoint, e.g. http://localhost:8001/ingest
    #[arg(long)]
    ingest_url: String,

    /// List matching objects without downloading or ingesting
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many objects
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fetch run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let Some(endpoint) = args.endpoint.clone() else {
        bail!("MinIO endpoint not set (use --endpoint or MINIO_ENDPOINT)");
    };
    let (Some(access_key), Some(secret_key)) = (args.access_key.clone(), args.secret_key.clone())
    else {
        bail!("MinIO credentials not set (use --access-key/--secret-key or MINIO_ACCESS_KEY/MINIO_SECRET_KEY)");
    };

    let client = s3_client(&endpoint, &access_key, &secret_key).await;
    let keys = list_object_keys(&client, &args.bucket, &args.prefix, args.limit).await?;
    info!(
        bucket = %args.bucket,
        prefix = %args.prefix,
        count = keys.len(),
        "Found objects to ingest"
    );

    if args.dry_run {
        for key in &keys {
            info!(key = %key, "Would ingest");
        }
        return Ok(());
    }

    let http = reqwest::Client::new();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for key in &keys {
        match ingest_object(&client, &http, &args, key).await {
            Ok(chunks) => {
                successful += 1;
                info!(key = %key, chunks = chunks, "Ingested");
            }
            Err(e) => {
                failed += 1;
                warn!(key = %key, error = %e, "Failed to ingest");
            }
        }
    }

    info!(successful, failed, "Fetch run complete");
    if failed > 0 {
        bail!("{failed} object(s) failed to ingest");
    }
    Ok(())
}

/// Build an S3 client pointed at a MinIO endpoint. Path-style
/// addressing is required because MinIO does not serve virtual-host
/// bucket URLs by default.
async fn s3_client(endpoint: &str, access_key: &str, secret_key: &str) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(access_key, secret_key, None, None, "docforge-fetch");
    let shared = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .credentials_provider(credentials)
        .region(Region::new("us-east-1"))
        .load()
        .await;
    let config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(config)
}

/// List object keys under the prefix, skipping directory placeholders.
async fn list_object_keys(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut pages = client
        .list_objects_v2()
        .bucket(bucket)
        .prefix(prefix)
        .into_paginator()
        .send();

    'outer: while let Some(page) = pages.next().await {
        let page = page.context("listing bucket objects")?;
        for object in page.contents() {
            let Some(key) = object.key() else { continue };
            if !is_document_key(key) {
                continue;
            }
            keys.push(key.to_string());
            if let Some(limit) = limit {
                if keys.len() >= limit {
                    break 'outer;
                }
            }
        }
    }
    Ok(keys)
}

/// Download one object and post it to the ingestion service.
async fn ingest_object(
    client: &aws_sdk_s3::Client,
    http: &reqwest::Client,
    args: &Args,
    key: &str,
) -> Result<usize> {
    let object = client
        .get_object()
        .bucket(&args.bucket)
        .key(key)
        .send()
        .await
        .context("downloading object")?;
    let bytes = object
        .body
        .collect()
        .await
        .context("reading object body")?
        .into_bytes();

    let metadata = object_metadata(&args.bucket, key);
    let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(object_filename(key));
    let form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("metadata", metadata.to_string());

    let response = http
        .post(&args.ingest_url)
        .multipart(form)
        .send()
        .await
        .context("posting to ingestion service")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("ingestion service returned {status}: {body}");
    }

    let body: serde_json::Value = response.json().await.context("parsing ingest response")?;
    Ok(body["chunks_created"].as_u64().unwrap_or(0) as usize)
}

/// Directory placeholders end with a slash and carry no content.
fn is_document_key(key: &str) -> bool {
    !key.ends_with('/')
}

fn object_filename(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

fn object_metadata(bucket: &str, key: &str) -> serde_json::Value {
    json!({
        "source": "minio",
        "bucket": bucket,
        "original_path": key,
    })
}

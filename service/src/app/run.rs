//! Main application run loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::deploy::engine::DeployEngine;
use crate::errors::DeployError;
use crate::pages::http::HttpPageService;
use crate::pages::PageService;
use crate::providers::cloudfront::CloudFrontCdn;
use crate::providers::route53::Route53Dns;
use crate::providers::s3::S3ObjectStore;
use crate::providers::{CdnService, DnsService, ObjectStore};
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::store::deployments::DeploymentStore;
use crate::store::settings::AwsSettings;

/// Run the deploy service
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeployError> {
    info!("Initializing Pagepilot deploy service...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager =
        ShutdownManager::new(shutdown_tx.clone(), options.max_shutdown_delay);

    // Initialize the engine and the server
    if let Err(e) = init(&options, shutdown_tx.clone(), &mut shutdown_manager).await {
        error!("Failed to start service: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    tokio::select! {
        _ = shutdown_signal => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    // Shutdown
    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), DeployError> {
    let engine = init_engine(options).await?;
    init_socket_server(options, engine, shutdown_manager, shutdown_tx.subscribe()).await?;
    Ok(())
}

async fn init_engine(options: &AppOptions) -> Result<Arc<DeployEngine>, DeployError> {
    options.layout.setup().await?;

    let settings = &options.settings;
    let (s3, cloudfront, route53) = init_aws_clients(&settings.aws).await;

    let object_store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::new(s3, settings.aws.region.clone()));
    let cdn: Arc<dyn CdnService> = Arc::new(CloudFrontCdn::new(cloudfront));
    let dns: Arc<dyn DnsService> = Arc::new(Route53Dns::new(route53));
    let pages: Arc<dyn PageService> = Arc::new(HttpPageService::new(
        &settings.backend.base_url,
        options.api_token.clone(),
    )?);

    let store = DeploymentStore::new(options.layout.deployments_dir());

    Ok(Arc::new(DeployEngine::new(
        settings,
        store,
        object_store,
        cdn,
        dns,
        pages,
    )))
}

async fn init_aws_clients(
    aws: &AwsSettings,
) -> (
    aws_sdk_s3::Client,
    aws_sdk_cloudfront::Client,
    aws_sdk_route53::Client,
) {
    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(aws.region.clone()))
        .load()
        .await;

    match &aws.endpoint_url {
        Some(endpoint) => {
            info!("Using AWS endpoint override: {}", endpoint);

            // Localstack only routes bucket operations with path-style addressing
            let s3_config = aws_sdk_s3::config::Builder::from(&shared)
                .endpoint_url(endpoint)
                .force_path_style(true)
                .build();
            let cloudfront_config = aws_sdk_cloudfront::config::Builder::from(&shared)
                .endpoint_url(endpoint)
                .build();
            let route53_config = aws_sdk_route53::config::Builder::from(&shared)
                .endpoint_url(endpoint)
                .build();

            (
                aws_sdk_s3::Client::from_conf(s3_config),
                aws_sdk_cloudfront::Client::from_conf(cloudfront_config),
                aws_sdk_route53::Client::from_conf(route53_config),
            )
        }
        None => (
            aws_sdk_s3::Client::new(&shared),
            aws_sdk_cloudfront::Client::new(&shared),
            aws_sdk_route53::Client::new(&shared),
        ),
    }
}

async fn init_socket_server(
    options: &AppOptions,
    engine: Arc<DeployEngine>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DeployError> {
    info!("Initializing local HTTP server...");

    let server_state = ServerState::new(engine);

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_socket_server_handle(server_handle.task)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    max_shutdown_delay: Duration,
    socket_server_handle: Option<JoinHandle<Result<(), DeployError>>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, max_shutdown_delay: Duration) -> Self {
        Self {
            shutdown_tx,
            max_shutdown_delay,
            socket_server_handle: None,
        }
    }

    pub fn with_socket_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), DeployError>>,
    ) -> Result<(), DeployError> {
        if self.socket_server_handle.is_some() {
            return Err(DeployError::ShutdownError(
                "server_handle already set".to_string(),
            ));
        }
        self.socket_server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), DeployError> {
        // Signal all subscribers to shut down
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(self.max_shutdown_delay, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), DeployError> {
        info!("Shutting down deploy service...");

        if let Some(handle) = self.socket_server_handle.take() {
            handle
                .await
                .map_err(|e| DeployError::ShutdownError(e.to_string()))??;
        }

        info!("Shutdown complete");
        Ok(())
    }
}

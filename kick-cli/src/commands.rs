use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use kick_api::api::{ChatMessage, EventSubscription};
use kick_api::auth::DEFAULT_CALLBACK_PATH;
use kick_api::webhooks::{self, EventDispatcher, event_types};
use kick_api::{BoxError, KickClient, WebhookEvent, WebhookHandler, WebhookHeaders};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::config::{AppConfig, CredentialFile};

/// Runs subcommands against one loaded configuration.
pub struct CommandExecutor {
    config: AppConfig,
    config_path: PathBuf,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// A client carrying the stored credential, persisting refreshes back to the config file.
    async fn client(&self) -> anyhow::Result<KickClient> {
        let Some(credential) = self.config.credential.clone() else {
            bail!(
                "No credential in {}; run `kick authorize` first",
                self.config_path.display()
            );
        };
        let client = KickClient::builder(self.config.kick.clone())
            .credential(credential)
            .credential_sink(Arc::new(CredentialFile::new(&self.config_path)))
            .build()
            .await
            .context("Failed to create Kick client")?;
        Ok(client)
    }

    pub async fn authorize(
        mut self,
        port: Option<u16>,
        path: Option<String>,
        scopes: Vec<String>,
        save: bool,
    ) -> anyhow::Result<()> {
        if self.config.kick.client_id.is_empty() {
            bail!(
                "A client id is required; set it in the config file, KICK_CLIENT_ID or --client-id"
            );
        }
        if !scopes.is_empty() {
            self.config.kick.scopes = scopes;
        }

        let (port, path) = callback_endpoint(&mut self.config.kick.redirect_uri, port, path)?;

        let mut builder = KickClient::builder(self.config.kick.clone());
        let store = Arc::new(CredentialFile::new(&self.config_path));
        if save {
            builder = builder.credential_sink(store.clone());
        }
        let client = builder.build().await.context("Failed to create Kick client")?;

        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind callback port {port}"))?;

        println!("Open this URL in a browser to authorize:\n\n{}\n", client.authorization_url());
        info!(redirect_uri = %self.config.kick.redirect_uri, "Waiting for authorization");

        let cancel = CancellationToken::new();
        let server = tokio::spawn(webhooks::serve(
            listener,
            client.callback_router(&path),
            cancel.clone(),
        ));

        let interrupted = tokio::select! {
            _ = client.wait_for_authorization() => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        cancel.cancel();
        server.await.context("Callback server panicked")??;
        if interrupted {
            bail!("Authorization interrupted");
        }

        let credential = client
            .credentials()
            .current()
            .context("Authorization finished without a credential")?;
        if save {
            println!("Credential saved to {}", store.path().display());
        } else {
            let table =
                toml::to_string_pretty(&credential).context("Failed to serialize credential")?;
            println!("[credential]\n{table}");
        }
        Ok(())
    }

    pub async fn serve(
        mut self,
        bind: Option<String>,
        port: Option<u16>,
        path: Option<String>,
    ) -> anyhow::Result<()> {
        let webhook = &mut self.config.kick.webhook;
        if let Some(bind) = bind {
            webhook.bind_address = bind;
        }
        if let Some(port) = port {
            webhook.port = port;
        }
        if let Some(path) = path {
            webhook.path = path;
        }

        let client = KickClient::builder(self.config.kick.clone())
            .build()
            .await
            .context("Failed to create Kick client")?;
        let verifier = client
            .webhook_verifier()
            .context("Invalid webhook public key")?;

        let logger: Arc<dyn WebhookHandler> = Arc::new(EventLogger);
        let mut dispatcher = EventDispatcher::builder().verifier(Arc::new(verifier));
        for event_type in event_types::ALL {
            dispatcher = dispatcher.on(*event_type, logger.clone());
        }
        let dispatcher = Arc::new(dispatcher.build()?);

        let webhook = &self.config.kick.webhook;
        let listener = TcpListener::bind(webhook.socket_addr())
            .await
            .with_context(|| format!("Failed to bind {}", webhook.socket_addr()))?;

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        webhooks::serve(
            listener,
            webhooks::webhook_router(dispatcher, &webhook.path),
            cancel,
        )
        .await?;
        Ok(())
    }

    pub async fn subscribe(
        self,
        events: Vec<String>,
        broadcaster_user_id: Option<u64>,
    ) -> anyhow::Result<()> {
        let events = events
            .iter()
            .map(|e| e.parse::<EventSubscription>())
            .collect::<Result<Vec<_>, _>>()?;

        let client = self.client().await?;
        let results = client.events().subscribe(&events, broadcaster_user_id).await?;

        let mut failed = 0;
        for result in results.data {
            match (result.subscription_id, result.error) {
                (_, Some(error)) => {
                    failed += 1;
                    println!("{} v{}: failed ({error})", result.name, result.version);
                }
                (Some(id), None) => println!("{} v{}: {id}", result.name, result.version),
                (None, None) => println!("{} v{}: subscribed", result.name, result.version),
            }
        }
        if failed > 0 {
            bail!("{failed} subscription(s) failed");
        }
        Ok(())
    }

    pub async fn chat(
        self,
        message: String,
        broadcaster_user_id: Option<u64>,
        reply_to: Option<String>,
    ) -> anyhow::Result<()> {
        let mut message = match broadcaster_user_id {
            Some(id) => ChatMessage::user(message, id),
            None => ChatMessage::bot(message),
        };
        if let Some(reply_to) = reply_to {
            message = message.reply_to(reply_to);
        }

        let client = self.client().await?;
        let sent = client.chat().send(&message).await?.data;
        if !sent.is_sent {
            bail!("Kick did not accept the message");
        }
        println!("Sent message {}", sent.message_id);
        Ok(())
    }

    pub async fn whoami(self) -> anyhow::Result<()> {
        let client = self.client().await?;
        let Some(user) = client.users().me().await? else {
            bail!("Kick returned no user for this token");
        };
        println!("{} (id {})", user.name, user.user_id);
        if let Some(email) = user.email {
            println!("email: {email}");
        }
        if let Some(credential) = client.credentials().current() {
            let scopes = credential.scopes();
            if !scopes.is_empty() {
                println!("scopes: {}", scopes.join(" "));
            }
            if let Some(expires_at) = credential.expires_at {
                println!("token expires: {expires_at}");
            }
        }
        Ok(())
    }
}

/// Work out where to listen for the OAuth redirect.
///
/// An explicit port or path rewrites `redirect_uri` to point at the local
/// listener, which must then match a redirect URI registered for the app.
fn callback_endpoint(
    redirect_uri: &mut String,
    port: Option<u16>,
    path: Option<String>,
) -> anyhow::Result<(u16, String)> {
    let mut url = Url::parse(redirect_uri)
        .with_context(|| format!("Invalid redirect URI '{redirect_uri}'"))?;
    if let Some(port) = port {
        url.set_port(Some(port))
            .map_err(|_| anyhow::anyhow!("Redirect URI '{redirect_uri}' cannot carry a port"))?;
    }
    if let Some(path) = path {
        url.set_path(&path);
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(DEFAULT_CALLBACK_PATH);
    }
    let Some(port) = url.port_or_known_default() else {
        bail!("Redirect URI '{redirect_uri}' has no port");
    };
    if !matches!(url.host_str(), Some("localhost" | "127.0.0.1")) {
        warn!(
            redirect_uri = %url,
            "Redirect URI is not local; the browser may not reach this listener"
        );
    }

    let path = url.path().to_string();
    *redirect_uri = url.to_string();
    Ok((port, path))
}

/// Logs every delivered event.
struct EventLogger;

#[async_trait]
impl WebhookHandler for EventLogger {
    async fn handle(&self, event: &WebhookEvent, headers: &WebhookHeaders) -> Result<(), BoxError> {
        let broadcaster = event
            .broadcaster()
            .and_then(|b| b.username.as_deref())
            .unwrap_or("-");
        match event {
            WebhookEvent::ChatMessageSent(chat) => info!(
                message_id = %headers.message_id,
                broadcaster,
                sender = chat.sender.username.as_deref().unwrap_or("-"),
                "{}",
                chat.content
            ),
            _ => info!(
                message_id = %headers.message_id,
                event_type = event.event_type(),
                broadcaster,
                "Received event"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_endpoint_from_redirect_uri() {
        let mut uri = "http://localhost:3000/callback".to_string();
        let (port, path) = callback_endpoint(&mut uri, None, None).unwrap();
        assert_eq!((port, path.as_str()), (3000, "/callback"));
        assert_eq!(uri, "http://localhost:3000/callback");
    }

    #[test]
    fn test_callback_endpoint_overrides_rewrite_redirect_uri() {
        let mut uri = "http://localhost:3000/callback".to_string();
        let (port, path) =
            callback_endpoint(&mut uri, Some(8080), Some("/oauth".to_string())).unwrap();
        assert_eq!((port, path.as_str()), (8080, "/oauth"));
        assert_eq!(uri, "http://localhost:8080/oauth");
    }

    #[test]
    fn test_callback_endpoint_defaults_path() {
        let mut uri = "http://127.0.0.1:9000".to_string();
        let (_, path) = callback_endpoint(&mut uri, None, None).unwrap();
        assert_eq!(path, DEFAULT_CALLBACK_PATH);
        assert_eq!(uri, "http://127.0.0.1:9000/callback");
    }

    #[test]
    fn test_callback_endpoint_rejects_garbage() {
        let mut uri = "not a url".to_string();
        assert!(callback_endpoint(&mut uri, None, None).is_err());
    }
}

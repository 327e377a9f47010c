//! `--register-webhook`: point the processor's callbacks at this server.

use payflow_sdk::client::{ClientError, ProcessorClient};
use payflow_sdk::objects::Webhook;
use url::Url;

/// Event families the registration subscribes to.
pub const SUBSCRIPTIONS: &[&str] = &["invoice"];

/// Register `url` unless a webhook with the same URL already exists.
pub async fn register_webhook(client: &ProcessorClient, url: &Url) -> Result<Webhook, ClientError> {
    let existing = client.list_webhooks().await?;
    if let Some(webhook) = find_registration(existing, url) {
        tracing::info!(id = %webhook.id, url = %webhook.url, "Webhook already registered");
        return Ok(webhook);
    }

    let subscriptions = SUBSCRIPTIONS.iter().map(|s| s.to_string()).collect();
    let webhook = client.create_webhook(url.as_str(), subscriptions).await?;
    tracing::info!(id = %webhook.id, url = %webhook.url, "Webhook registered");
    Ok(webhook)
}

/// Find a registration for `url`, comparing normalized URLs so a trailing
/// slash or host casing does not cause a duplicate.
fn find_registration(webhooks: Vec<Webhook>, url: &Url) -> Option<Webhook> {
    webhooks.into_iter().find(|webhook| {
        Url::parse(&webhook.url).map_or(webhook.url == url.as_str(), |parsed| &parsed == url)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(id: &str, url: &str) -> Webhook {
        Webhook {
            id: id.to_string(),
            url: url.to_string(),
            subscriptions: vec!["invoice".to_string()],
        }
    }

    #[test]
    fn test_find_registration() {
        let hooks = vec![
            webhook("1", "https://other.example.com/webhook"),
            webhook("2", "https://PAY.example.com/webhook"),
        ];
        let url = Url::parse("https://pay.example.com/webhook").unwrap();
        assert_eq!(find_registration(hooks.clone(), &url).map(|w| w.id), Some("2".to_string()));

        let url = Url::parse("https://pay.example.com/callbacks").unwrap();
        assert!(find_registration(hooks, &url).is_none());
    }

    #[test]
    fn test_find_registration_root_path() {
        let hooks = vec![webhook("7", "https://pay.example.com")];
        let url = Url::parse("https://pay.example.com/").unwrap();
        assert_eq!(find_registration(hooks, &url).map(|w| w.id), Some("7".to_string()));
    }
}

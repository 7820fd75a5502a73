use anyhow::anyhow;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use task_local_extensions::Extensions;

/// Logs every request and response.
///
/// Client errors are passed through, the portal API answers those with a
/// JSON body (`{ success: false, message }`) that callers decode. Server
/// errors are turned into request errors.
pub(crate) struct LogAndHandleErrorMiddleware;

#[async_trait::async_trait]
impl Middleware for LogAndHandleErrorMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        tracing::info!(
            url = %redacted_url(&req),
            method = %req.method(),
            "Running request"
        );
        match next.run(req, extensions).await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_server_error() {
                    let body = resp.text().await?;
                    tracing::error!(?status, %body, "Server error on response");
                    Err(anyhow!("Server error (status code {status}): {body}").into())
                } else if status.is_client_error() {
                    tracing::warn!(?status, "Client error on response");
                    Ok(resp)
                } else {
                    let content_length = resp.content_length();
                    tracing::info!(?status, ?content_length, "Got response");
                    Ok(resp)
                }
            }
            Err(e) => {
                tracing::error!(%e, "Request failed");
                Err(e)
            }
        }
    }
}

/// The request URL without its query, which carries email addresses.
fn redacted_url(req: &Request) -> String {
    let mut url = req.url().clone();
    url.set_query(None);
    url.to_string()
}

use serde::Serialize;
use tracing::info;

/// Transactional email delivery.
#[derive(Clone)]
pub enum Mailer {
    /// Posts to an HTTP email provider.
    Http(HttpMailer),
    /// No provider configured: emails are only logged.
    Log,
}

#[derive(Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            api_url,
            api_key,
            from,
        })
    }
}

impl Mailer {
    pub async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
        match self {
            Mailer::Http(mailer) => {
                mailer
                    .http
                    .post(&mailer.api_url)
                    .bearer_auth(&mailer.api_key)
                    .json(&OutgoingEmail {
                        from: &mailer.from,
                        to,
                        subject,
                        text,
                    })
                    .send()
                    .await?
                    .error_for_status()?;
                info!("Sent '{}' email to {}", subject, to);
            }
            Mailer::Log => {
                info!("Email (not sent, no provider) to {}: {}", to, subject);
            }
        }
        Ok(())
    }
}

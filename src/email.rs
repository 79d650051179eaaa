//! Email delivery.
//!
//! [`Mailer`] wraps a lettre transport chosen by configuration: real SMTP in
//! production, file-backed in development and tests. The only message the
//! system currently sends is the registration verification email.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, EmailTransportConfig};
use crate::errors::Error;

// The file transport is not Clone upstream, so it rides in an Arc.
#[derive(Clone)]
enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(Arc<AsyncFileTransport<Tokio1Executor>>),
}

#[derive(Clone)]
pub struct Mailer {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    reply_to: Option<String>,
}

impl Mailer {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let transport = match &config.email.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                let mut builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(|e| {
                        Error::Internal {
                            operation: format!("build SMTP transport: {e}"),
                        }
                    })?
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                };
                builder = builder.port(*port);
                if let (Some(username), Some(password)) = (username, password) {
                    builder =
                        builder.credentials(Credentials::new(username.clone(), password.clone()));
                }
                EmailTransport::Smtp(builder.build())
            }
            EmailTransportConfig::File { path } => {
                EmailTransport::File(Arc::new(AsyncFileTransport::new(std::path::PathBuf::from(
                    path,
                ))))
            }
        };

        Ok(Self {
            transport,
            from_email: config.email.from_email.clone(),
            from_name: config.email.from_name.clone(),
            reply_to: config.email.reply_to.clone(),
        })
    }

    fn transport_name(&self) -> &'static str {
        match self.transport {
            EmailTransport::Smtp(_) => "smtp",
            EmailTransport::File(_) => "file",
        }
    }

    /// Send the registration verification email.
    pub async fn send_verification_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        verification_link: &str,
        link_ttl: Duration,
    ) -> Result<(), Error> {
        let body = create_verification_body(
            to_name.unwrap_or("there"),
            verification_link,
            link_ttl.as_secs() / 60,
        );
        self.send_email(to_email, to_name, "Verify your email address", &body)
            .await
    }

    async fn send_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        subject: &str,
        html_body: &str,
    ) -> Result<(), Error> {
        let from: Mailbox = format!("{} <{}>", self.from_name, self.from_email)
            .parse()
            .map_err(|e| Error::Internal {
                operation: format!("parse from address: {e}"),
            })?;
        let to: Mailbox = match to_name {
            Some(name) => format!("{name} <{to_email}>"),
            None => to_email.to_string(),
        }
        .parse()
        .map_err(|e| Error::Internal {
            operation: format!("parse recipient address: {e}"),
        })?;

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        if let Some(reply_to) = &self.reply_to {
            let reply_to: Mailbox = reply_to.parse().map_err(|e| Error::Internal {
                operation: format!("parse reply-to address: {e}"),
            })?;
            builder = builder.reply_to(reply_to);
        }
        let message = builder
            .body(html_body.to_string())
            .map_err(|e| Error::Internal {
                operation: format!("build email message: {e}"),
            })?;

        let delivery = |reason: anyhow::Error| Error::Delivery {
            email: to_email.to_string(),
            transport: self.transport_name(),
            reason,
        };

        match &self.transport {
            EmailTransport::Smtp(transport) => {
                transport.send(message).await.map_err(|e| delivery(e.into()))?;
            }
            EmailTransport::File(transport) => {
                transport.send(message).await.map_err(|e| delivery(e.into()))?;
            }
        }
        Ok(())
    }
}

fn create_verification_body(name: &str, link: &str, ttl_minutes: u64) -> String {
    format!(
        r#"<html>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Verify your email address</h2>
  <p>Hi {name},</p>
  <p>Thanks for signing up. Click the button below to verify your email
  address and activate your account:</p>
  <p style="text-align: center; margin: 32px 0;">
    <a href="{link}"
       style="background: #2563eb; color: #ffffff; padding: 12px 24px;
              text-decoration: none; border-radius: 6px;">Verify email</a>
  </p>
  <p>Or paste this link into your browser:</p>
  <p><a href="{link}">{link}</a></p>
  <p>This link expires in {ttl_minutes} minutes. If it does, you can request
  a fresh one from the sign-up page.</p>
  <p>If you did not sign up, you can ignore this email; no account has been
  created.</p>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_body_contains_link_and_expiry() {
        let body = create_verification_body(
            "Ada",
            "https://tools.example.com/register/verify?payload=abc",
            60,
        );
        assert!(body.contains("Hi Ada,"));
        assert!(body.contains("https://tools.example.com/register/verify?payload=abc"));
        assert!(body.contains("expires in 60 minutes"));
        assert!(body.contains("no account has been created"));
    }

    #[tokio::test]
    async fn test_file_transport_writes_email() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.email.transport = EmailTransportConfig::File {
            path: dir.path().to_string_lossy().into_owned(),
        };

        let mailer = Mailer::new(&config).unwrap();
        mailer
            .send_verification_email(
                "ada@example.com",
                Some("Ada"),
                "https://tools.example.com/register/verify?payload=abc",
                Duration::from_secs(3600),
            )
            .await
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}

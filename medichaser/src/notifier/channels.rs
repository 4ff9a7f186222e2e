use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio_xmpp::starttls::StartTlsAsyncClient as XmppClient;
use tokio_xmpp::Event as XmppEvent;
use xmpp_parsers::jid::{self, BareJid, Jid};
use xmpp_parsers::message::{Body, Message};

use super::env::EnvSource;

const PUSHBULLET_API: &str = "https://api.pushbullet.com";
const PUSHOVER_API: &str = "https://api.pushover.net";
const TELEGRAM_API: &str = "https://api.telegram.org";

const GOTIFY_DEFAULT_PRIORITY: i64 = 5;
const GOTIFY_DEFAULT_TITLE: &str = "medihunter";

/// Supported delivery channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Pushbullet,
    Pushover,
    Telegram,
    Xmpp,
    Gotify,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Pushbullet,
        Channel::Pushover,
        Channel::Telegram,
        Channel::Xmpp,
        Channel::Gotify,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pushbullet => "pushbullet",
            Self::Pushover => "pushover",
            Self::Telegram => "telegram",
            Self::Xmpp => "xmpp",
            Self::Gotify => "gotify",
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "unknown notification channel '{0}': expected one of pushbullet, pushover, telegram, xmpp, gotify"
)]
pub struct ChannelParseError(String);

impl FromStr for Channel {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Channel::ALL
            .into_iter()
            .find(|channel| channel.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ChannelParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{channel} notifications require {vars} to be exported")]
    MissingEnv { channel: Channel, vars: String },

    #[error("{channel} notification failed: {source}")]
    Http {
        channel: Channel,
        #[source]
        source: reqwest::Error,
    },

    #[error("{channel} notification failed: ({status}) {body}")]
    Rejected {
        channel: Channel,
        status: u16,
        body: String,
    },

    #[error("{channel} notification failed: {reason}")]
    Delivery { channel: Channel, reason: String },

    #[error("{channel} notifications need a valid {var}: {reason}")]
    InvalidEnv {
        channel: Channel,
        var: &'static str,
        reason: String,
    },
}

/// A single delivery mechanism
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(&self, message: &str, title: Option<&str>) -> Result<(), NotifyError>;
}

/// Build the sender for `channel` from its environment variables
pub fn sender_for(
    channel: Channel,
    env: &dyn EnvSource,
    client: &Client,
) -> Result<Box<dyn NotificationSender>, NotifyError> {
    Ok(match channel {
        Channel::Pushbullet => Box::new(PushbulletSender::from_env(env, client.clone())?),
        Channel::Pushover => Box::new(PushoverSender::from_env(env, client.clone())?),
        Channel::Telegram => Box::new(TelegramSender::from_env(env, client.clone())?),
        Channel::Xmpp => Box::new(XmppSender::from_env(env)?),
        Channel::Gotify => Box::new(GotifySender::from_env(env, client.clone())?),
    })
}

fn require<const N: usize>(
    env: &dyn EnvSource,
    channel: Channel,
    keys: [&'static str; N],
) -> Result<[String; N], NotifyError> {
    let missing = || NotifyError::MissingEnv {
        channel,
        vars: keys.join(", "),
    };

    let values = keys
        .iter()
        .map(|key| env.var(key))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(missing)?;

    values.try_into().map_err(|_| missing())
}

async fn check_response(channel: Channel, response: Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Rejected {
        channel,
        status: status.as_u16(),
        body,
    })
}

// Pushbullet

#[derive(Debug, Clone)]
pub struct PushbulletSender {
    client: Client,
    token: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct PushbulletNote<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    body: &'a str,
}

impl PushbulletSender {
    pub fn from_env(env: &dyn EnvSource, client: Client) -> Result<Self, NotifyError> {
        let [token] = require(env, Channel::Pushbullet, ["NOTIFIERS_PUSHBULLET_TOKEN"])?;
        Ok(Self {
            client,
            token,
            base_url: PUSHBULLET_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl NotificationSender for PushbulletSender {
    fn channel(&self) -> Channel {
        Channel::Pushbullet
    }

    async fn send(&self, message: &str, title: Option<&str>) -> Result<(), NotifyError> {
        let note = PushbulletNote {
            kind: "note",
            title,
            body: message,
        };

        let response = self
            .client
            .post(format!("{}/v2/pushes", self.base_url))
            .header("Access-Token", &self.token)
            .json(&note)
            .send()
            .await
            .map_err(|source| NotifyError::Http {
                channel: self.channel(),
                source,
            })?;

        check_response(self.channel(), response).await
    }
}

// Pushover

#[derive(Debug, Clone)]
pub struct PushoverSender {
    client: Client,
    token: String,
    user: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct PushoverMessage<'a> {
    token: &'a str,
    user: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

impl PushoverSender {
    pub fn from_env(env: &dyn EnvSource, client: Client) -> Result<Self, NotifyError> {
        let [token, user] = require(
            env,
            Channel::Pushover,
            ["NOTIFIERS_PUSHOVER_TOKEN", "NOTIFIERS_PUSHOVER_USER"],
        )?;
        Ok(Self {
            client,
            token,
            user,
            base_url: PUSHOVER_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl NotificationSender for PushoverSender {
    fn channel(&self) -> Channel {
        Channel::Pushover
    }

    async fn send(&self, message: &str, title: Option<&str>) -> Result<(), NotifyError> {
        let form = PushoverMessage {
            token: &self.token,
            user: &self.user,
            message,
            title,
        };

        let response = self
            .client
            .post(format!("{}/1/messages.json", self.base_url))
            .form(&form)
            .send()
            .await
            .map_err(|source| NotifyError::Http {
                channel: self.channel(),
                source,
            })?;

        check_response(self.channel(), response).await
    }
}

// Telegram

#[derive(Debug, Clone)]
pub struct TelegramSender {
    client: Client,
    token: String,
    chat_id: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Telegram has no title field; a title becomes a bold first line
pub fn telegram_text(message: &str, title: Option<&str>) -> String {
    match title {
        Some(title) if !title.is_empty() => format!("<b>{}</b>\n{}", title, message),
        _ => message.to_string(),
    }
}

impl TelegramSender {
    pub fn from_env(env: &dyn EnvSource, client: Client) -> Result<Self, NotifyError> {
        let [token, chat_id] = require(
            env,
            Channel::Telegram,
            ["NOTIFIERS_TELEGRAM_TOKEN", "NOTIFIERS_TELEGRAM_CHAT_ID"],
        )?;
        Ok(Self {
            client,
            token,
            chat_id,
            base_url: TELEGRAM_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl NotificationSender for TelegramSender {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    async fn send(&self, message: &str, title: Option<&str>) -> Result<(), NotifyError> {
        let text = telegram_text(message, title);
        let payload = TelegramMessage {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "html",
        };

        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.base_url, self.token))
            .json(&payload)
            .send()
            .await
            .map_err(|source| NotifyError::Http {
                channel: self.channel(),
                source,
            })?;

        check_response(self.channel(), response).await
    }
}

// Gotify

#[derive(Debug, Clone)]
pub struct GotifySender {
    client: Client,
    host: String,
    token: String,
    priority: i64,
}

#[derive(Debug, Serialize)]
struct GotifyMessage<'a> {
    message: &'a str,
    priority: i64,
    title: &'a str,
}

impl GotifySender {
    /// `GOTIFY_PRIORITY` falls back to 5 when unset or not a number
    pub fn from_env(env: &dyn EnvSource, client: Client) -> Result<Self, NotifyError> {
        let [host, token] = require(env, Channel::Gotify, ["GOTIFY_HOST", "GOTIFY_TOKEN"])?;
        let priority = env
            .var("GOTIFY_PRIORITY")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(GOTIFY_DEFAULT_PRIORITY);

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            token,
            priority,
        })
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }
}

#[async_trait]
impl NotificationSender for GotifySender {
    fn channel(&self) -> Channel {
        Channel::Gotify
    }

    async fn send(&self, message: &str, title: Option<&str>) -> Result<(), NotifyError> {
        let payload = GotifyMessage {
            message,
            priority: self.priority,
            title: title.unwrap_or(GOTIFY_DEFAULT_TITLE),
        };

        let response = self
            .client
            .post(format!("{}/message", self.host))
            .query(&[("token", &self.token)])
            .json(&payload)
            .send()
            .await
            .map_err(|source| NotifyError::Http {
                channel: self.channel(),
                source,
            })?;

        check_response(self.channel(), response).await
    }
}

// XMPP

const XMPP_TIMEOUT: Duration = Duration::from_secs(30);

/// Logs in as `NOTIFIERS_XMPP_JID` and sends one chat message per
/// notification. XMPP messages carry no title, so it is dropped.
#[derive(Debug, Clone)]
pub struct XmppSender {
    jid: BareJid,
    password: SecretString,
    receiver: Jid,
    timeout: Duration,
}

fn parse_jid<T>(
    var: &'static str,
    value: &str,
    parse: impl FnOnce(&str) -> Result<T, jid::Error>,
) -> Result<T, NotifyError> {
    parse(value).map_err(|e| NotifyError::InvalidEnv {
        channel: Channel::Xmpp,
        var,
        reason: e.to_string(),
    })
}

impl XmppSender {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, NotifyError> {
        let [jid, password, receiver] = require(
            env,
            Channel::Xmpp,
            [
                "NOTIFIERS_XMPP_JID",
                "NOTIFIERS_XMPP_PASSWORD",
                "NOTIFIERS_XMPP_RECEIVER",
            ],
        )?;

        Ok(Self {
            jid: parse_jid("NOTIFIERS_XMPP_JID", &jid, BareJid::new)?,
            password: SecretString::from(password),
            receiver: parse_jid("NOTIFIERS_XMPP_RECEIVER", &receiver, Jid::new)?,
            timeout: XMPP_TIMEOUT,
        })
    }

    /// Upper bound for connect, login and send together
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn deliver(&self, text: &str) -> Result<(), String> {
        let mut client = XmppClient::new(self.jid.clone(), self.password.expose_secret());
        client.set_reconnect(false);

        while let Some(event) = client.next().await {
            match event {
                XmppEvent::Online { .. } => {
                    let mut message = Message::new(Some(self.receiver.clone()));
                    message.bodies.insert(String::new(), Body(text.to_string()));

                    client
                        .send_stanza(message.into())
                        .await
                        .map_err(|e| format!("send failed: {}", e))?;
                    if let Err(e) = client.send_end().await {
                        tracing::debug!("XMPP stream did not close cleanly: {}", e);
                    }
                    return Ok(());
                }
                XmppEvent::Disconnected(e) => return Err(format!("disconnected: {}", e)),
                _ => {}
            }
        }

        Err("connection closed before login completed".to_string())
    }
}

#[async_trait]
impl NotificationSender for XmppSender {
    fn channel(&self) -> Channel {
        Channel::Xmpp
    }

    async fn send(&self, message: &str, _title: Option<&str>) -> Result<(), NotifyError> {
        let reason = match tokio::time::timeout(self.timeout, self.deliver(message)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(reason)) => reason,
            Err(_) => format!("no answer from the server within {:?}", self.timeout),
        };

        Err(NotifyError::Delivery {
            channel: self.channel(),
            reason,
        })
    }
}

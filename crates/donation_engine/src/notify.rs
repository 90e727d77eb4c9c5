use donation_core::{Amount, DonationRecord};

/// What the notification target reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyReceipt {
    pub comment_id: String,
    /// False when pinning was refused or failed; the reply itself exists.
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("could not find discussion thread {title:?} by {author:?}")]
    ThreadNotFound { title: String, author: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
}

/// Delivers one donation announcement. Called at most once per claimed record.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, record: &DonationRecord) -> Result<NotifyReceipt, NotifyError>;
}

#[async_trait::async_trait]
impl<N: Notifier + ?Sized> Notifier for &N {
    async fn notify(&self, record: &DonationRecord) -> Result<NotifyReceipt, NotifyError> {
        (**self).notify(record).await
    }
}

/// Markdown body for the announcement comment, donor message block-quoted.
pub fn format_donation_message(
    record: &DonationRecord,
    source_url: &str,
    minimum: Amount,
) -> String {
    let quoted = record
        .message
        .split('\n')
        .map(|line| format!(">{line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{name} from {location} donated ${amount} to the charity drive and said:\n\n\
         {quoted}\n\n\
         To claim this spot, donate at least ${floor} to the AMF at {source_url}",
        name = record.donor_name,
        location = record.location,
        amount = record.amount,
        floor = minimum.smallest_whole_dollar_above().whole_dollars(),
    )
}

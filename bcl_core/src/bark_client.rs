//! This client sends push notifications through the Bark service.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::profile::CollectionTypeBitmask;

static URL: &str = "https://api.day.app";
static TITLE: &str = "Bins";
static GROUP: &str = "Bin Collection Reminders";
static LEVEL: &str = "timeSensitive";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Notification<'a> {
    title: &'a str,
    body: &'a str,
    sound: &'a str,
    url: &'a str,
    level: &'a str,
    group: &'a str,
    automatically_copy: &'a str,
}

/// Compose the reminder message for the given collection types.
///
/// Returns `None` when no known type is present, which cannot happen for a
/// summary that passed the relevance filter.
pub fn compose_message(collection_types: CollectionTypeBitmask) -> Option<String> {
    let labels = collection_types.labels();
    match labels.as_slice() {
        [] => None,
        [only] => Some(format!(
            "Next bin collection: {only}. Remember to put the bin out by 7am."
        )),
        labels => Some(format!(
            "Next bin collections: {}. Remember to put the bins out by 7am.",
            labels.join(" and ")
        )),
    }
}

/// Send a push notification for the given collection types.
///
/// Anything but HTTP 200 is an error; the caller decides how to report it.
pub async fn send(api_key: &str, collection_types: CollectionTypeBitmask) -> Result<()> {
    let Some(message) = compose_message(collection_types) else {
        bail!("no known collection type to notify about");
    };
    let notification = Notification {
        title: TITLE,
        body: &message,
        sound: "",
        url: "",
        level: LEVEL,
        group: GROUP,
        automatically_copy: "1",
    };
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{URL}/{api_key}"))
        .json(&notification)
        .send()
        .await?;
    if response.status() != reqwest::StatusCode::OK {
        bail!("push notification rejected with status {}", response.status());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::bark_client::{compose_message, Notification};
    use crate::profile::CollectionTypeBitmask;

    #[test]
    fn test_compose_message_single_type() {
        assert_eq!(
            compose_message(CollectionTypeBitmask::Recycling).unwrap(),
            "Next bin collection: Recycling. Remember to put the bin out by 7am."
        );
        assert_eq!(
            compose_message(CollectionTypeBitmask::Rubbish).unwrap(),
            "Next bin collection: Rubbish. Remember to put the bin out by 7am."
        );
    }

    #[test]
    fn test_compose_message_both_types() {
        assert_eq!(
            compose_message(CollectionTypeBitmask::Recycling | CollectionTypeBitmask::Rubbish)
                .unwrap(),
            "Next bin collections: Recycling and Rubbish. Remember to put the bins out by 7am."
        );
    }

    #[test]
    fn test_compose_message_unknown_type() {
        assert_eq!(compose_message(CollectionTypeBitmask::none()), None);
    }

    /// The Bark API expects these exact field names.
    #[test]
    fn test_notification_field_names() {
        let notification = Notification {
            title: "Bins",
            body: "message",
            sound: "",
            url: "",
            level: "timeSensitive",
            group: "Bin Collection Reminders",
            automatically_copy: "1",
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["title"], "Bins");
        assert_eq!(json["level"], "timeSensitive");
        assert_eq!(json["automaticallyCopy"], "1");
        assert_eq!(json["group"], "Bin Collection Reminders");
    }
}

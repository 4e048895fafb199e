use std::collections::BTreeMap;
use std::path::Path;

use crate::config::save_topics;
use crate::errors::AppResult;
use crate::uploader::telegram_client::{TelegramClient, Update};

/// Collect forum topic names and their thread ids from topic-creation
/// replies. A later update wins when a name shows up twice.
pub fn extract_topics(updates: &[Update]) -> BTreeMap<String, i64> {
    let mut topics = BTreeMap::new();

    for update in updates {
        let Some(message) = &update.message else {
            continue;
        };
        let Some(thread_id) = message.message_thread_id else {
            continue;
        };
        let Some(created) = message
            .reply_to_message
            .as_ref()
            .and_then(|reply| reply.forum_topic_created.as_ref())
        else {
            continue;
        };

        if topics.get(&created.name) != Some(&thread_id) {
            log::info!("Found topic '{}' with thread id {}", created.name, thread_id);
            topics.insert(created.name.clone(), thread_id);
        }
    }

    topics
}

/// Look up topics in the bot's update feed and merge them into the config
/// file at `config_path`. The file is left alone when nothing is found.
pub async fn discover_topics(
    client: &TelegramClient,
    config_path: &Path,
) -> AppResult<BTreeMap<String, i64>> {
    let updates = client.get_updates().await?;
    log::debug!("Fetched {} updates", updates.len());

    let topics = extract_topics(&updates);
    if topics.is_empty() {
        log::info!("There are no topics to save in the config.");
        return Ok(topics);
    }

    save_topics(config_path, &topics)?;
    Ok(topics)
}
